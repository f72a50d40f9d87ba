use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use async_trait::async_trait;
use axum::Router;
use bookshelf_events::{EventBus, PUBLISH_BOOK};
use bookshelf_http::{AppError, AppResult};
use bookshelf_kernel::{InitCtx, Module};
use bookshelf_model::{Author, Book, Entity, EntityId};
use serde_json::json;

use crate::modules::resource::{
    filter::{self, RangeFilter, StringFilter, RANGE_OPERATORS, STRING_OPERATORS},
    openapi::resource_fragment,
    routes, Comparator, Criteria, References, ResourceService, ServerEntity,
};

/// Filters accepted by `GET /api/books`, e.g. `price.lessThan=10`.
///
/// Rows never repeat, so `distinct` needs no handling.
#[derive(Debug, Default)]
pub struct BooksCriteria {
    pub id: RangeFilter<EntityId>,
    pub title: StringFilter,
    pub price: RangeFilter<f64>,
    pub author_id: RangeFilter<EntityId>,
}

impl Criteria<Book> for BooksCriteria {
    fn from_params(params: &HashMap<String, String>) -> AppResult<Self> {
        filter::reject_unknown(
            params,
            Book::RESOURCE,
            &[
                ("id", RANGE_OPERATORS),
                ("title", STRING_OPERATORS),
                ("price", RANGE_OPERATORS),
                ("authorId", RANGE_OPERATORS),
            ],
        )?;
        Ok(Self {
            id: RangeFilter::parse(params, Book::RESOURCE, "id")?,
            title: StringFilter::parse(params, Book::RESOURCE, "title")?,
            price: RangeFilter::parse(params, Book::RESOURCE, "price")?,
            author_id: RangeFilter::parse(params, Book::RESOURCE, "authorId")?,
        })
    }

    fn matches(&self, book: &Book) -> bool {
        self.id.matches(book.id)
            && self.title.matches(book.title.as_deref())
            && self.price.matches(book.price)
            && self.author_id.matches(book.author_id())
    }
}

impl ServerEntity for Book {
    type Criteria = BooksCriteria;

    fn merge(&mut self, patch: Self) {
        if patch.title.is_some() {
            self.title = patch.title;
        }
        if patch.price.is_some() {
            self.price = patch.price;
        }
        if let Some(author) = patch.author {
            self.author = Some(author);
        }
    }

    fn comparator(field: &str) -> Option<Comparator<Self>> {
        let compare: Comparator<Self> = match field {
            "id" => |a, b| a.id.cmp(&b.id),
            "title" => |a, b| a.title.cmp(&b.title),
            "price" => |a, b| a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal),
            _ => return None,
        };
        Some(compare)
    }
}

/// Keeps only the author id on a stored book and serves the author resource's
/// current row on read.
pub struct BookAuthor {
    authors: Arc<ResourceService<Author>>,
}

impl References<Book> for BookAuthor {
    fn on_save(&self, mut book: Book) -> AppResult<Book> {
        let Some(author) = book.author.take() else {
            return Ok(book);
        };
        let Some(author_id) = author.id else {
            return Err(AppError::bad_request(
                Book::RESOURCE,
                "invalidauthor",
                "Author reference has no id",
            ));
        };
        if !self.authors.exists(author_id) {
            return Err(AppError::bad_request(
                Book::RESOURCE,
                "authornotfound",
                format!("author {author_id} not found"),
            ));
        }
        Ok(book.with_author(author_id))
    }

    /// A deleted author stays a bare id reference.
    fn on_read(&self, mut book: Book) -> Book {
        if let Some(author_id) = book.author_id() {
            if let Ok(mut author) = self.authors.find_one(author_id) {
                author.books = None;
                book.author = Some(author);
            }
        }
        book
    }
}

/// Serves the `books` resource and announces new books on the event bus
pub struct BooksModule {
    service: Arc<ResourceService<Book>>,
}

impl BooksModule {
    pub fn new(events: EventBus, authors: Arc<ResourceService<Author>>) -> Self {
        let service = ResourceService::new()
            .with_events(events, PUBLISH_BOOK)
            .with_references(Arc::new(BookAuthor { authors }));
        Self {
            service: Arc::new(service),
        }
    }

    pub fn service(&self) -> &Arc<ResourceService<Book>> {
        &self.service
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        Book::RESOURCE
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(resource_fragment(
            "Books",
            "Book",
            json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "integer",
                        "format": "int64",
                        "description": "Assigned by the server on create"
                    },
                    "title": { "type": "string" },
                    "price": { "type": "number" },
                    "author": {
                        "$ref": "#/components/schemas/Author",
                        "description": "Author reference; only the id is required"
                    }
                }
            }),
        ))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use bookshelf_db::{Pageable, Sort};
    use tower::ServiceExt;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn authors() -> Arc<ResourceService<Author>> {
        let authors = Arc::new(ResourceService::new());
        authors.create(Author::new("Frank Herbert")).unwrap();
        authors.create(Author::new("Jane Austen")).unwrap();
        authors
    }

    fn seeded() -> BooksModule {
        let module = BooksModule::new(EventBus::default(), authors());
        let service = module.service();
        service.create(Book::new("Dune", 9.99).with_author(1)).unwrap();
        service.create(Book::new("Emma", 4.5).with_author(2)).unwrap();
        service.create(Book::new("Children of Dune", 12.0).with_author(1)).unwrap();
        module
    }

    fn bad_request_code(err: AppError) -> String {
        match err {
            AppError::BadRequest { code, .. } => code,
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn create_rejects_existing_id() {
        let module = seeded();
        let book = Book {
            id: Some(1),
            ..Book::new("Again", 1.0)
        };
        let err = module.service().create(book).unwrap_err();
        assert_eq!(bad_request_code(err), "idexists");
    }

    #[tokio::test]
    async fn create_publishes_saved_book() {
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let module = BooksModule::new(bus, authors());

        let saved = module.service().create(Book::new("Dune", 9.99)).unwrap();

        let message = events.recv().await.unwrap();
        assert_eq!(message.topic, PUBLISH_BOOK);
        let published: Book = serde_json::from_str(&message.payload).unwrap();
        assert_eq!(published, saved);
    }

    #[test]
    fn author_reference_is_resolved_from_the_author_resource() {
        let module = seeded();
        let book = Book {
            author: Some(Author {
                id: Some(1),
                name: Some("Impostor".to_string()),
                books: None,
            }),
            ..Book::new("Dune Messiah", 8.0)
        };

        let saved = module.service().create(book).unwrap();
        let fetched = module.service().find_one(saved.id.unwrap()).unwrap();
        let author = fetched.author.unwrap();
        assert_eq!(author.id, Some(1));
        assert_eq!(author.name.as_deref(), Some("Frank Herbert"));
        assert_eq!(saved.author.and_then(|a| a.name).as_deref(), Some("Frank Herbert"));
    }

    #[test]
    fn unknown_author_is_rejected() {
        let module = seeded();
        let service = module.service();

        let err = service
            .create(Book::new("Orphan", 1.0).with_author(999))
            .unwrap_err();
        assert_eq!(bad_request_code(err), "authornotfound");

        let patch = Book {
            id: Some(1),
            ..Book::default().with_author(999)
        };
        let err = service.partial_update(1, patch).unwrap_err();
        assert_eq!(bad_request_code(err), "authornotfound");
        assert_eq!(service.find_one(1).unwrap().author_id(), Some(1));

        let nameless = Book {
            author: Some(Author::new("No id")),
            ..Book::new("Orphan", 1.0)
        };
        let err = service.create(nameless).unwrap_err();
        assert_eq!(bad_request_code(err), "invalidauthor");
    }

    #[test]
    fn extended_filter_operators() {
        let module = seeded();
        let service = module.service();
        let count = |pairs: &[(&str, &str)]| {
            service.count_by_criteria(&BooksCriteria::from_params(&params(pairs)).unwrap())
        };

        assert_eq!(count(&[("authorId.specified", "true")]), 3);
        assert_eq!(count(&[("authorId.specified", "false")]), 0);
        assert_eq!(count(&[("title.notEquals", "Dune")]), 2);
        assert_eq!(count(&[("price.in", "4.5,12")]), 2);
        assert_eq!(count(&[("authorId.notIn", "2")]), 2);
        assert_eq!(count(&[("title.doesNotContain", "un")]), 1);
    }

    #[test]
    fn unsupported_filter_is_rejected() {
        let err = BooksCriteria::from_params(&params(&[("title.startsWith", "D")])).unwrap_err();
        assert_eq!(bad_request_code(err), "invalidfilter");

        let err = BooksCriteria::from_params(&params(&[("isbn.equals", "1")])).unwrap_err();
        assert_eq!(bad_request_code(err), "invalidfilter");
    }

    #[test]
    fn update_checks_identifiers() {
        let module = seeded();
        let service = module.service();

        let err = service.update(1, Book::new("No id", 1.0)).unwrap_err();
        assert_eq!(bad_request_code(err), "idnull");

        let mismatched = Book {
            id: Some(2),
            ..Book::new("Mismatch", 1.0)
        };
        let err = service.update(1, mismatched).unwrap_err();
        assert_eq!(bad_request_code(err), "idinvalid");

        let unknown = Book {
            id: Some(999),
            ..Book::new("Ghost", 1.0)
        };
        let err = service.update(999, unknown).unwrap_err();
        assert_eq!(bad_request_code(err), "idnotfound");
    }

    #[test]
    fn partial_update_merges_set_fields() {
        let module = seeded();
        let patch = Book {
            id: Some(1),
            price: Some(12.5),
            ..Book::default()
        };

        let merged = module.service().partial_update(1, patch).unwrap();
        assert_eq!(merged.title.as_deref(), Some("Dune"));
        assert_eq!(merged.price, Some(12.5));
        assert_eq!(merged.author_id(), Some(1));
    }

    #[test]
    fn criteria_filter_and_count() {
        let module = seeded();
        let service = module.service();

        let criteria =
            BooksCriteria::from_params(&params(&[("title.contains", "dune"), ("authorId.equals", "1")]))
                .unwrap();
        assert_eq!(service.count_by_criteria(&criteria), 2);

        let cheap = BooksCriteria::from_params(&params(&[("price.lessThan", "10")])).unwrap();
        let page = service
            .find_by_criteria(&cheap, None, Pageable::default())
            .unwrap();
        assert_eq!(page.total, 2);
    }

    #[test]
    fn sorts_by_price_descending_and_pages() {
        let module = seeded();
        let sort: Sort = "price,desc".parse().unwrap();

        let page = module
            .service()
            .find_by_criteria(
                &BooksCriteria::default(),
                Some(&sort),
                Pageable { page: 0, size: 2 },
            )
            .unwrap();
        let titles: Vec<_> = page.content.iter().filter_map(|b| b.title.as_deref()).collect();
        assert_eq!(titles, ["Children of Dune", "Dune"]);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        let module = seeded();
        let sort: Sort = "isbn".parse().unwrap();
        let err = module
            .service()
            .find_by_criteria(&BooksCriteria::default(), Some(&sort), Pageable::default())
            .unwrap_err();
        assert_eq!(bad_request_code(err), "invalidsort");
    }

    #[test]
    fn delete_of_unknown_id_is_silent() {
        let module = seeded();
        module.service().delete(999);
        module.service().delete(1);
        assert!(module.service().find_one(1).is_err());
    }

    #[tokio::test]
    async fn list_route_sets_total_count_header() {
        let router = seeded().routes();

        let response = router
            .oneshot(
                Request::get("/?page=0&size=1&sort=id,asc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-total-count"], "3");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let books: Vec<Book> = serde_json::from_slice(&body).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, Some(1));
    }

    #[tokio::test]
    async fn list_route_rejects_bad_page() {
        let response = seeded()
            .routes()
            .oneshot(Request::get("/?size=0").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_route_returns_location() {
        let response = seeded()
            .routes()
            .oneshot(
                Request::post("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"title":"Persuasion","price":3.5}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], "/api/books/4");
    }

    #[tokio::test]
    async fn get_route_returns_not_found() {
        let response = seeded()
            .routes()
            .oneshot(Request::get("/999").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_route_returns_no_content() {
        let response = seeded()
            .routes()
            .oneshot(Request::delete("/2").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
