//! Axum handlers shared by every resource module.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use bookshelf_db::{Pageable, Sort, DEFAULT_PAGE_SIZE};
use bookshelf_http::{router::TOTAL_COUNT_HEADER, AppError, AppResult};
use bookshelf_model::{Entity, EntityId};

use super::{Criteria, ResourceService, ServerEntity};

type Service<E> = State<Arc<ResourceService<E>>>;

/// Routes for one resource, to be mounted under `/api/{resource}`.
pub fn router<E: ServerEntity>(service: Arc<ResourceService<E>>) -> Router {
    Router::new()
        .route("/", get(list::<E>).post(create::<E>))
        .route("/count", get(count::<E>))
        .route("/health", get(health::<E>))
        .route(
            "/{id}",
            get(get_one::<E>)
                .put(update::<E>)
                .patch(partial_update::<E>)
                .delete(delete::<E>),
        )
        .with_state(service)
}

fn pageable(params: &HashMap<String, String>, entity: &'static str) -> AppResult<Pageable> {
    let number = |key: &str, default: u64| -> AppResult<u64> {
        match params.get(key) {
            Some(raw) => raw.parse().map_err(|_| {
                AppError::bad_request(entity, "invalidpage", format!("invalid {key} '{raw}'"))
            }),
            None => Ok(default),
        }
    };

    let size = number("size", DEFAULT_PAGE_SIZE)?;
    if size == 0 {
        return Err(AppError::bad_request(
            entity,
            "invalidpage",
            "page size must be at least 1",
        ));
    }

    Ok(Pageable {
        page: number("page", 0)?,
        size,
    })
}

/// RFC 5988 `Link` value with `next`, `prev`, `last` and `first` pages.
/// Query parameters other than `page` and `size` are carried over as sent.
fn pagination_link(path: &str, query: Option<&str>, pageable: Pageable, total: u64) -> String {
    let carried: String = query
        .unwrap_or_default()
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default();
            !pair.is_empty() && key != "page" && key != "size"
        })
        .map(|pair| format!("{pair}&"))
        .collect();
    let link = |page: u64, rel: &str| {
        format!(
            "<{path}?{carried}page={page}&size={}>; rel=\"{rel}\"",
            pageable.size
        )
    };

    let total_pages = total.div_ceil(pageable.size);
    let mut links = Vec::with_capacity(4);
    if pageable.page + 1 < total_pages {
        links.push(link(pageable.page + 1, "next"));
    }
    if pageable.page > 0 {
        links.push(link(pageable.page - 1, "prev"));
    }
    links.push(link(total_pages.saturating_sub(1), "last"));
    links.push(link(0, "first"));
    links.join(",")
}

fn location<E: Entity>(saved: &E) -> AppResult<String> {
    let id = saved.id().ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("saved {} row has no id", E::RESOURCE))
    })?;
    Ok(format!("/api/{}/{}", E::RESOURCE, id))
}

async fn list<E: ServerEntity>(
    State(service): Service<E>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<(HeaderMap, Json<Vec<E>>)> {
    tracing::debug!(resource = E::RESOURCE, ?params, "REST request to get all");

    let pageable = pageable(&params, E::RESOURCE)?;
    let sort = params
        .get("sort")
        .map(|raw| raw.parse::<Sort>())
        .transpose()
        .map_err(|e| AppError::bad_request(E::RESOURCE, "invalidsort", e.to_string()))?;
    let criteria = E::Criteria::from_params(&params)?;

    let page = service.find_by_criteria(&criteria, sort.as_ref(), pageable)?;

    let mut headers = HeaderMap::new();
    headers.insert(TOTAL_COUNT_HEADER, HeaderValue::from(page.total));
    let link = pagination_link(uri.path(), uri.query(), pageable, page.total);
    if let Ok(value) = HeaderValue::from_str(&link) {
        headers.insert(header::LINK, value);
    }
    Ok((headers, Json(page.content)))
}

async fn count<E: ServerEntity>(
    State(service): Service<E>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<u64>> {
    tracing::debug!(resource = E::RESOURCE, ?params, "REST request to count");
    let criteria = E::Criteria::from_params(&params)?;
    Ok(Json(service.count_by_criteria(&criteria)))
}

async fn get_one<E: ServerEntity>(
    State(service): Service<E>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<E>> {
    tracing::debug!(resource = E::RESOURCE, id, "REST request to get");
    service.find_one(id).map(Json)
}

async fn create<E: ServerEntity>(
    State(service): Service<E>,
    Json(entity): Json<E>,
) -> AppResult<(StatusCode, [(header::HeaderName, String); 1], Json<E>)> {
    tracing::debug!(resource = E::RESOURCE, "REST request to save");
    let saved = service.create(entity)?;

    let location = location(&saved)?;
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(saved)))
}

async fn update<E: ServerEntity>(
    State(service): Service<E>,
    Path(id): Path<EntityId>,
    Json(entity): Json<E>,
) -> AppResult<Json<E>> {
    tracing::debug!(resource = E::RESOURCE, id, "REST request to update");
    service.update(id, entity).map(Json)
}

async fn partial_update<E: ServerEntity>(
    State(service): Service<E>,
    Path(id): Path<EntityId>,
    Json(patch): Json<E>,
) -> AppResult<Json<E>> {
    tracing::debug!(resource = E::RESOURCE, id, "REST request to partial update");
    service.partial_update(id, patch).map(Json)
}

async fn delete<E: ServerEntity>(State(service): Service<E>, Path(id): Path<EntityId>) -> StatusCode {
    tracing::debug!(resource = E::RESOURCE, id, "REST request to delete");
    service.delete(id);
    StatusCode::NO_CONTENT
}

async fn health<E: ServerEntity>() -> String {
    format!("{} module is healthy", E::RESOURCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_model::Book;

    #[test]
    fn link_header_on_a_middle_page() {
        let link = pagination_link(
            "/api/books",
            Some("sort=id,asc&page=1&size=2&title.contains=dune"),
            Pageable { page: 1, size: 2 },
            5,
        );
        assert_eq!(
            link,
            "</api/books?sort=id,asc&title.contains=dune&page=2&size=2>; rel=\"next\",\
             </api/books?sort=id,asc&title.contains=dune&page=0&size=2>; rel=\"prev\",\
             </api/books?sort=id,asc&title.contains=dune&page=2&size=2>; rel=\"last\",\
             </api/books?sort=id,asc&title.contains=dune&page=0&size=2>; rel=\"first\""
        );
    }

    #[test]
    fn link_header_for_a_single_page() {
        let link = pagination_link("/api/author", None, Pageable::default(), 0);
        assert_eq!(
            link,
            "</api/author?page=0&size=20>; rel=\"last\",</api/author?page=0&size=20>; rel=\"first\""
        );
    }

    #[test]
    fn location_needs_an_assigned_id() {
        let saved = Book {
            id: Some(7),
            ..Book::new("Dune", 9.99)
        };
        assert_eq!(location(&saved).unwrap(), "/api/books/7");
        assert!(matches!(
            location(&Book::new("Dune", 9.99)),
            Err(AppError::Internal(_))
        ));
    }
}
