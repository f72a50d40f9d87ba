pub mod author;
pub mod books;
pub mod resource;

use std::sync::Arc;

use bookshelf_events::EventBus;
use bookshelf_kernel::ModuleRegistry;

/// Register every resource module; books publish on `events` and resolve
/// their author through the author module's service
pub fn register_all(registry: &mut ModuleRegistry, events: &EventBus) -> anyhow::Result<()> {
    let authors = author::AuthorModule::new();
    let books = books::BooksModule::new(events.clone(), authors.service().clone());

    registry.register(Arc::new(authors))?;
    registry.register(Arc::new(books))?;
    Ok(())
}
