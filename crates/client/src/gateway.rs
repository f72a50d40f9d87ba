//! HTTP access to a single REST resource collection.

use std::marker::PhantomData;

use async_trait::async_trait;
use bookshelf_model::{Entity, EntityId, RawEntity};
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, Response, Url,
};
use serde::de::DeserializeOwned;

use crate::{error::ClientError, query::cache_buster, QueryParams};

/// Response header carrying the size of the whole collection.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

const MERGE_PATCH_JSON: &str = "application/merge-patch+json";

/// Raw result of a resource request: decoded body plus response headers.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub headers: HeaderMap,
}

/// One method per request kind; each call maps to exactly one HTTP request.
///
/// Entities handed to `create`/`update`/`partial_update` are expected to be
/// cleaned already.
#[async_trait]
pub trait EntityGateway<E: Entity>: Send + Sync {
    async fn list(&self, params: &QueryParams) -> Result<ApiResponse<Vec<E>>, ClientError>;

    async fn get(&self, id: EntityId) -> Result<ApiResponse<E>, ClientError>;

    async fn create(&self, entity: &E) -> Result<ApiResponse<E>, ClientError>;

    async fn update(&self, id: EntityId, entity: &E) -> Result<ApiResponse<E>, ClientError>;

    async fn partial_update(
        &self,
        id: EntityId,
        entity: &E,
    ) -> Result<ApiResponse<E>, ClientError>;

    async fn delete(&self, id: EntityId) -> Result<ApiResponse<()>, ClientError>;
}

/// reqwest-backed gateway for `{server}/api/{E::RESOURCE}`.
pub struct HttpGateway<E> {
    client: Client,
    base: String,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> HttpGateway<E> {
    pub fn new(client: Client, server_url: &str) -> Result<Self, ClientError> {
        let invalid = |message: String| ClientError::InvalidUrl {
            url: server_url.to_string(),
            message,
        };

        let mut root = Url::parse(server_url).map_err(|e| invalid(e.to_string()))?;
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        let base = root
            .join(&format!("api/{}", E::RESOURCE))
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            client,
            base: base.to_string(),
            _entity: PhantomData,
        })
    }

    /// Resource base path, e.g. `http://localhost:8080/api/books`.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn item_url(&self, id: EntityId) -> String {
        format!("{}/{}", self.base, id)
    }
}

#[async_trait]
impl<E: Entity> EntityGateway<E> for HttpGateway<E> {
    async fn list(&self, params: &QueryParams) -> Result<ApiResponse<Vec<E>>, ClientError> {
        let query = params.to_pairs(cache_buster());
        tracing::debug!(resource = E::RESOURCE, ?query, "GET list");

        let response = self.client.get(&self.base).query(&query).send().await?;
        decode(response).await
    }

    async fn get(&self, id: EntityId) -> Result<ApiResponse<E>, ClientError> {
        tracing::debug!(resource = E::RESOURCE, id, "GET entity");

        let response = self.client.get(self.item_url(id)).send().await?;
        decode(response).await
    }

    async fn create(&self, entity: &E) -> Result<ApiResponse<E>, ClientError> {
        tracing::debug!(resource = E::RESOURCE, "POST entity");

        let response = self.client.post(&self.base).json(entity).send().await?;
        decode(response).await
    }

    async fn update(&self, id: EntityId, entity: &E) -> Result<ApiResponse<E>, ClientError> {
        tracing::debug!(resource = E::RESOURCE, id, "PUT entity");

        let response = self
            .client
            .put(self.item_url(id))
            .json(entity)
            .send()
            .await?;
        decode(response).await
    }

    async fn partial_update(
        &self,
        id: EntityId,
        entity: &E,
    ) -> Result<ApiResponse<E>, ClientError> {
        let body = RawEntity::from_entity(entity)
            .map_err(|e| ClientError::malformed(format!("unserializable entity: {e}")))?;
        tracing::debug!(resource = E::RESOURCE, id, fields = ?body.fields(), "PATCH entity");

        let response = self
            .client
            .patch(self.item_url(id))
            .header(CONTENT_TYPE, HeaderValue::from_static(MERGE_PATCH_JSON))
            .body(serde_json::to_vec(&body).map_err(|e| ClientError::malformed(e.to_string()))?)
            .send()
            .await?;
        decode(response).await
    }

    async fn delete(&self, id: EntityId) -> Result<ApiResponse<()>, ClientError> {
        tracing::debug!(resource = E::RESOURCE, id, "DELETE entity");

        let response = check_status(self.client.delete(self.item_url(id)).send().await?).await?;
        Ok(ApiResponse {
            data: (),
            headers: response.headers().clone(),
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<ApiResponse<T>, ClientError> {
    let response = check_status(response).await?;
    let headers = response.headers().clone();
    let bytes = response.bytes().await?;
    let data = serde_json::from_slice(&bytes)
        .map_err(|e| ClientError::malformed(format!("undecodable body: {e}")))?;

    Ok(ApiResponse { data, headers })
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = server_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown status").to_string());

    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Pull `error.message` out of the server's error envelope.
fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

/// Parse the collection size from a list response.
pub fn total_count(headers: &HeaderMap) -> Result<u64, ClientError> {
    let value = headers
        .get(TOTAL_COUNT_HEADER)
        .ok_or_else(|| ClientError::malformed(format!("missing {TOTAL_COUNT_HEADER} header")))?;

    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| ClientError::malformed(format!("invalid {TOTAL_COUNT_HEADER} header")))
}
