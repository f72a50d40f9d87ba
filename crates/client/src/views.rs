//! Text view bindings over an [`EntityStore`].
//!
//! A view mounts a [`Page`] by dispatching the matching store operation and
//! renders whatever state the store holds afterwards. Views never touch the
//! gateway directly.

use std::fmt::Write;

use bookshelf_model::{Author, Book, Entity, EntityId};

use crate::{
    gateway::{EntityGateway, HttpGateway},
    routes::Page,
    state::EntityState,
    store::EntityStore,
    QueryParams,
};

/// How an entity is laid out in tables, detail cards and forms.
pub trait Columns: Entity {
    /// Heading used for the list and detail pages.
    const TITLE: &'static str;

    fn headers() -> &'static [&'static str];

    /// One rendered cell per header.
    fn cells(&self) -> Vec<String>;
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

impl Columns for Book {
    const TITLE: &'static str = "Books";

    fn headers() -> &'static [&'static str] {
        &["ID", "Title", "Price", "Author"]
    }

    fn cells(&self) -> Vec<String> {
        let author = self
            .author
            .as_ref()
            .map(|a| a.name.clone().unwrap_or_else(|| opt(&a.id)))
            .unwrap_or_default();
        vec![opt(&self.id), opt(&self.title), opt(&self.price), author]
    }
}

impl Columns for Author {
    const TITLE: &'static str = "Authors";

    fn headers() -> &'static [&'static str] {
        &["ID", "Name", "Books"]
    }

    fn cells(&self) -> Vec<String> {
        let books = self
            .books
            .iter()
            .flatten()
            .filter_map(|b| b.title.clone())
            .collect::<Vec<_>>()
            .join(", ");
        vec![opt(&self.id), opt(&self.name), books]
    }
}

pub struct View<E: Entity, G = HttpGateway<E>> {
    store: EntityStore<E, G>,
}

impl<E: Columns, G: EntityGateway<E>> View<E, G> {
    pub fn new(store: EntityStore<E, G>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &EntityStore<E, G> {
        &self.store
    }

    /// Load what `page` needs into the store.
    pub async fn mount(&self, page: Page, params: QueryParams) -> EntityState<E> {
        match page {
            Page::List => self.store.list(params).await,
            Page::New => {
                self.store.reset();
                self.store.state()
            }
            Page::Detail(id) | Page::Edit(id) | Page::Delete(id) => self.store.get(id).await,
        }
    }

    /// Submit the edit form: create when the entity is new, update otherwise.
    pub async fn save(&self, entity: E) -> EntityState<E> {
        if entity.is_new() {
            self.store.create(entity).await
        } else {
            self.store.update(entity).await
        }
    }

    pub async fn confirm_delete(&self, id: EntityId) -> EntityState<E> {
        self.store.delete(id).await
    }

    pub fn render(&self, page: Page) -> String {
        render(page, &self.store.state())
    }
}

/// Render `state` as the text for `page`.
pub fn render<E: Columns>(page: Page, state: &EntityState<E>) -> String {
    let mut out = String::new();

    if state.is_busy() {
        out.push_str("Loading...\n");
    }
    if let Some(message) = &state.error_message {
        let _ = writeln!(out, "Error: {message}");
    }

    match page {
        Page::List => render_list(&mut out, state),
        Page::Detail(_) => render_detail(&mut out, &state.entity),
        Page::New | Page::Edit(_) => render_form(&mut out, &state.entity),
        Page::Delete(id) => {
            let _ = writeln!(
                out,
                "Are you sure you want to delete {} {}?",
                E::TITLE.trim_end_matches('s'),
                id
            );
        }
    }

    if state.update_success {
        out.push_str("Saved.\n");
    }
    out
}

fn render_list<E: Columns>(out: &mut String, state: &EntityState<E>) {
    let _ = writeln!(out, "{} ({} total)", E::TITLE, state.total_items);
    if state.entities.is_empty() {
        if !state.loading {
            let _ = writeln!(out, "No {} found", E::TITLE.to_lowercase());
        }
        return;
    }

    let headers = E::headers();
    let rows: Vec<Vec<String>> = state.entities.iter().map(Columns::cells).collect();
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|row| row.get(i).map_or(0, |c| c.chars().count()))
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let _ = writeln!(out, "{}", line(headers.to_vec()));
    for row in &rows {
        let _ = writeln!(out, "{}", line(row.iter().map(String::as_str).collect()));
    }
}

fn render_detail<E: Columns>(out: &mut String, entity: &E) {
    let _ = writeln!(out, "{}", E::TITLE.trim_end_matches('s'));
    for (header, cell) in E::headers().iter().zip(entity.cells()) {
        let _ = writeln!(out, "  {header}: {cell}");
    }
}

fn render_form<E: Columns>(out: &mut String, entity: &E) {
    let verb = if entity.is_new() { "Create" } else { "Edit" };
    let _ = writeln!(out, "{verb} {}", E::TITLE.trim_end_matches('s'));
    for (header, cell) in E::headers().iter().zip(entity.cells()) {
        let _ = writeln!(out, "  [{header}] {cell}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Action, Operation};

    fn listed() -> EntityState<Book> {
        EntityState::default().reduce(Action::ListFulfilled {
            entities: vec![
                Book {
                    id: Some(1),
                    ..Book::new("Dune", 9.99)
                },
                Book {
                    id: Some(2),
                    author: Some(Author {
                        name: Some("Frank Herbert".into()),
                        ..Author::reference(4)
                    }),
                    ..Book::new("Children of Dune", 12.5)
                },
            ],
            total_items: 2,
        })
    }

    #[test]
    fn list_renders_table() {
        let text = render(Page::List, &listed());
        assert!(text.starts_with("Books (2 total)\n"));
        assert!(text.contains("ID  Title             Price  Author"));
        assert!(text.contains("2   Children of Dune  12.5   Frank Herbert"));
    }

    #[test]
    fn empty_list_says_so() {
        let text = render(Page::List, &EntityState::<Author>::default());
        assert!(text.contains("No authors found"));
    }

    #[test]
    fn loading_and_error_banners() {
        let state = EntityState::<Book>::default().reduce(Action::Pending(Operation::Get));
        assert!(render(Page::Detail(1), &state).starts_with("Loading..."));

        let state = state.reduce(Action::Rejected {
            operation: Operation::Get,
            message: "request failed with status code 404: Not Found".into(),
        });
        let text = render(Page::Detail(1), &state);
        assert!(text.contains("Error: request failed with status code 404"));
        assert!(!text.contains("Loading"));
    }

    #[test]
    fn form_title_depends_on_new_entity() {
        let state = EntityState::<Book>::default();
        assert!(render(Page::New, &state).starts_with("Create Book"));

        let state = state.reduce(Action::GetFulfilled(Book {
            id: Some(1),
            ..Book::new("Dune", 9.99)
        }));
        let text = render(Page::Edit(1), &state);
        assert!(text.starts_with("Edit Book"));
        assert!(text.contains("[Title] Dune"));
    }

    #[test]
    fn delete_asks_for_confirmation() {
        let text = render(Page::Delete(5), &EntityState::<Book>::default());
        assert_eq!(text, "Are you sure you want to delete Book 5?\n");
    }
}
