use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use axum::Router;
use bookshelf_http::AppResult;
use bookshelf_kernel::{InitCtx, Module};
use bookshelf_model::{Author, Entity, EntityId};
use serde_json::json;

use crate::modules::resource::{
    filter::{self, RangeFilter, StringFilter, RANGE_OPERATORS, STRING_OPERATORS},
    openapi::resource_fragment,
    routes, Comparator, Criteria, ResourceService, ServerEntity,
};

#[derive(Debug, Default)]
pub struct AuthorCriteria {
    pub id: RangeFilter<EntityId>,
    pub name: StringFilter,
}

impl Criteria<Author> for AuthorCriteria {
    fn from_params(params: &HashMap<String, String>) -> AppResult<Self> {
        filter::reject_unknown(
            params,
            Author::RESOURCE,
            &[("id", RANGE_OPERATORS), ("name", STRING_OPERATORS)],
        )?;
        Ok(Self {
            id: RangeFilter::parse(params, Author::RESOURCE, "id")?,
            name: StringFilter::parse(params, Author::RESOURCE, "name")?,
        })
    }

    fn matches(&self, author: &Author) -> bool {
        self.id.matches(author.id) && self.name.matches(author.name.as_deref())
    }
}

impl ServerEntity for Author {
    type Criteria = AuthorCriteria;

    fn merge(&mut self, patch: Self) {
        if patch.name.is_some() {
            self.name = patch.name;
        }
        if patch.books.is_some() {
            self.books = patch.books;
        }
    }

    fn comparator(field: &str) -> Option<Comparator<Self>> {
        let compare: Comparator<Self> = match field {
            "id" => |a, b| a.id.cmp(&b.id),
            "name" => |a, b| a.name.cmp(&b.name),
            _ => return None,
        };
        Some(compare)
    }
}

/// Serves the `author` resource
pub struct AuthorModule {
    service: Arc<ResourceService<Author>>,
}

impl AuthorModule {
    pub fn new() -> Self {
        Self {
            service: Arc::new(ResourceService::new()),
        }
    }

    pub fn service(&self) -> &Arc<ResourceService<Author>> {
        &self.service
    }
}

impl Default for AuthorModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for AuthorModule {
    fn name(&self) -> &'static str {
        Author::RESOURCE
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "author module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(resource_fragment(
            "Author",
            "Author",
            json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer", "format": "int64" },
                    "name": { "type": "string" },
                    "books": {
                        "type": "array",
                        "items": { "$ref": "#/components/schemas/Book" }
                    }
                }
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_db::{Pageable, Sort};

    fn seeded() -> AuthorModule {
        let module = AuthorModule::new();
        for name in ["Jane Austen", "Frank Herbert", "Ursula K. Le Guin"] {
            module.service().create(Author::new(name)).unwrap();
        }
        module
    }

    #[test]
    fn name_filter_and_sort() {
        let module = seeded();
        let params: HashMap<String, String> =
            [("name.contains".to_string(), "an".to_string())].into();
        let criteria = AuthorCriteria::from_params(&params).unwrap();
        let sort: Sort = "name,asc".parse().unwrap();

        let page = module
            .service()
            .find_by_criteria(&criteria, Some(&sort), Pageable::default())
            .unwrap();
        let names: Vec<_> = page.content.iter().filter_map(|a| a.name.as_deref()).collect();
        assert_eq!(names, ["Frank Herbert", "Jane Austen"]);
    }

    #[test]
    fn name_exclusion_and_unknown_operator() {
        let module = seeded();
        let params: HashMap<String, String> =
            [("name.doesNotContain".to_string(), "AN".to_string())].into();
        let criteria = AuthorCriteria::from_params(&params).unwrap();
        assert_eq!(module.service().count_by_criteria(&criteria), 1);

        let params: HashMap<String, String> =
            [("name.lessThan".to_string(), "M".to_string())].into();
        assert!(AuthorCriteria::from_params(&params).is_err());
    }

    #[test]
    fn partial_update_keeps_unset_fields() {
        let module = seeded();
        let patch = Author {
            id: Some(2),
            ..Author::default()
        };

        let merged = module.service().partial_update(2, patch).unwrap();
        assert_eq!(merged.name.as_deref(), Some("Frank Herbert"));
    }
}
