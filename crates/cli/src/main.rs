use anyhow::Context;
use bookshelf_client::{
    routes::{Page, Route},
    views::{Columns, View},
    Author, Book, Entity, EntityId, EntityStore, QueryParams,
};
use bookshelf_kernel::settings::{Settings, TelemetrySettings};
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bookshelf", version, about = "Browse and edit books and authors")]
struct Cli {
    /// Server base URL; defaults to `client.base_url` from the settings
    #[arg(long, global = true)]
    server: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage books
    Books {
        #[command(subcommand)]
        action: Action<BookFields>,
    },
    /// Manage authors
    Author {
        #[command(subcommand)]
        action: Action<AuthorFields>,
    },
    /// Render a client route such as `/books/3/edit`
    View {
        route: String,
        #[command(flatten)]
        list: ListArgs,
    },
}

#[derive(Subcommand, Debug)]
enum Action<F: Args> {
    List(ListArgs),
    Get {
        id: EntityId,
    },
    Create(F),
    /// Replace every field
    Update {
        id: EntityId,
        #[command(flatten)]
        fields: F,
    },
    /// Send only the given fields
    Patch {
        id: EntityId,
        #[command(flatten)]
        fields: F,
    },
    Delete {
        id: EntityId,
    },
}

#[derive(Args, Debug, Default)]
struct ListArgs {
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    size: Option<u32>,
    /// `field[,asc|desc]`; paging is ignored without it
    #[arg(long)]
    sort: Option<String>,
}

impl From<ListArgs> for QueryParams {
    fn from(args: ListArgs) -> Self {
        Self {
            page: args.page,
            size: args.size,
            sort: args.sort,
        }
    }
}

#[derive(Args, Debug)]
struct BookFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    author_id: Option<EntityId>,
}

#[derive(Args, Debug)]
struct AuthorFields {
    #[arg(long)]
    name: Option<String>,
}

/// Command-line fields that build an entity.
trait EntityFields: Args {
    type Entity: Columns;

    fn into_entity(self, id: Option<EntityId>) -> Self::Entity;
}

impl EntityFields for BookFields {
    type Entity = Book;

    fn into_entity(self, id: Option<EntityId>) -> Book {
        let book = Book {
            id,
            title: self.title,
            price: self.price,
            author: None,
        };
        match self.author_id {
            Some(author_id) => book.with_author(author_id),
            None => book,
        }
    }
}

impl EntityFields for AuthorFields {
    type Entity = Author;

    fn into_entity(self, id: Option<EntityId>) -> Author {
        Author {
            id,
            name: self.name,
            books: None,
        }
    }
}

/// Run one entity action and render the page that shows its outcome.
async fn run<F: EntityFields>(
    client: reqwest::Client,
    server: &str,
    action: Action<F>,
) -> anyhow::Result<String> {
    let store = EntityStore::<F::Entity>::connect(client, server)?;
    let view = View::new(store);

    let (state, page) = match action {
        Action::List(args) => (view.mount(Page::List, args.into()).await, Page::List),
        Action::Get { id } => {
            let page = Page::Detail(id);
            (view.mount(page, QueryParams::default()).await, page)
        }
        Action::Create(fields) => {
            let state = view.save(fields.into_entity(None)).await;
            let page = state.entity.id().map_or(Page::New, Page::Detail);
            (state, page)
        }
        Action::Update { id, fields } => {
            (view.save(fields.into_entity(Some(id))).await, Page::Detail(id))
        }
        Action::Patch { id, fields } => (
            view.store().partial_update(fields.into_entity(Some(id))).await,
            Page::Detail(id),
        ),
        Action::Delete { id } => (view.confirm_delete(id).await, Page::List),
    };

    let rendered = view.render(page);
    match state.error_message {
        Some(message) => Err(anyhow::anyhow!("{message}")).context(rendered),
        None => Ok(rendered),
    }
}

async fn render_route(
    client: reqwest::Client,
    server: &str,
    route: &Route,
    params: QueryParams,
) -> anyhow::Result<String> {
    async fn mount<E: Columns>(
        client: reqwest::Client,
        server: &str,
        page: Page,
        params: QueryParams,
    ) -> anyhow::Result<String> {
        let view = View::new(EntityStore::<E>::connect(client, server)?);
        view.mount(page, params).await;
        Ok(view.render(page))
    }

    match route.resource.as_str() {
        r if r == Book::RESOURCE => mount::<Book>(client, server, route.page, params).await,
        r if r == Author::RESOURCE => mount::<Author>(client, server, route.page, params).await,
        other => anyhow::bail!("unknown resource '{other}'"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    let telemetry = TelemetrySettings {
        filter: if cli.verbose { "debug" } else { "warn" }.to_string(),
        ..settings.telemetry.clone()
    };
    bookshelf_telemetry::init(&telemetry)?;

    let server = cli.server.unwrap_or(settings.client.base_url);
    tracing::debug!(%server, "using bookshelf server");
    let client = reqwest::Client::new();

    let output = match cli.command {
        Command::Books { action } => run(client, &server, action).await?,
        Command::Author { action } => run(client, &server, action).await?,
        Command::View { route, list } => {
            let route: Route = route.parse()?;
            render_route(client, &server, &route, list.into()).await?
        }
    };

    print!("{output}");
    Ok(())
}
