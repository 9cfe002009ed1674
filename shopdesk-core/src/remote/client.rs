//! HTTP client for the Shopdesk document server.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::protocol::{
    parse_revision, CollectionBody, DocumentEntry, ReplaceRequest, IF_MATCH_HEADER,
    REVISION_HEADER,
};
use crate::store::{Blob, BlobStore, Entity, Snapshot, StoreError};

/// Timeout for the reachability probe.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    server_url: String,
    api_key: String,
}

impl RemoteClient {
    pub fn new(
        server_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            server_url: server_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }

    fn collection_path(collection: &str) -> String {
        format!("/collections/{}", urlencoding::encode(collection))
    }

    fn document_path(collection: &str, id: &str) -> String {
        format!(
            "/collections/{}/{}",
            urlencoding::encode(collection),
            urlencoding::encode(id)
        )
    }

    fn blob_path(path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();
        format!("/blobs/{}", encoded.join("/"))
    }

    fn request(&self, method: Method, path: &str, expected: Option<u64>) -> RequestBuilder {
        let builder = self
            .http
            .request(method, self.url(path))
            .bearer_auth(&self.api_key);
        match expected {
            Some(revision) => builder.header(IF_MATCH_HEADER, revision.to_string()),
            None => builder,
        }
    }

    fn revision(response: &Response) -> u64 {
        parse_revision(
            response
                .headers()
                .get(REVISION_HEADER)
                .and_then(|v| v.to_str().ok()),
        )
    }

    /// Turns 409 into [`StoreError::Conflict`] and other failures into
    /// [`StoreError::Status`].
    fn check(
        response: Response,
        resource: &str,
        expected: Option<u64>,
    ) -> Result<Response, StoreError> {
        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(StoreError::Conflict {
                resource: resource.to_string(),
                expected: expected.unwrap_or(0),
                found: Self::revision(&response),
            });
        }
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                resource: resource.to_string(),
            });
        }
        Ok(response)
    }

    /// True if the server answers its health endpoint.
    pub async fn health(&self) -> bool {
        match self
            .http
            .get(self.url("/health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Health check against {} failed: {}", self.server_url, e);
                false
            }
        }
    }

    pub async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
    ) -> Result<Snapshot<T>, StoreError> {
        let response = self
            .request(Method::GET, &Self::collection_path(collection), None)
            .send()
            .await?;
        let body: CollectionBody = Self::check(response, collection, None)?.json().await?;

        let mut items = Vec::with_capacity(body.documents.len());
        for entry in body.documents {
            items.push(serde_json::from_value(entry.body)?);
        }
        Ok(Snapshot {
            items,
            revision: body.revision,
        })
    }

    /// Fetches one document and the collection revision it was read at.
    pub async fn get_document<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<(Option<T>, u64), StoreError> {
        let response = self
            .request(Method::GET, &Self::document_path(collection, id), None)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok((None, Self::revision(&response)));
        }
        let response = Self::check(response, collection, None)?;
        let revision = Self::revision(&response);
        Ok((Some(response.json().await?), revision))
    }

    pub async fn put_document<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        body: &T,
        expected: Option<u64>,
    ) -> Result<u64, StoreError> {
        let response = self
            .request(Method::PUT, &Self::document_path(collection, id), expected)
            .json(body)
            .send()
            .await?;
        let response = Self::check(response, collection, expected)?;
        Ok(Self::revision(&response))
    }

    pub async fn delete_document(&self, collection: &str, id: &str) -> Result<u64, StoreError> {
        let response = self
            .request(Method::DELETE, &Self::document_path(collection, id), None)
            .send()
            .await?;
        let response = Self::check(response, collection, None)?;
        Ok(Self::revision(&response))
    }

    pub async fn replace_collection<T: Entity>(
        &self,
        collection: &str,
        entities: &[T],
        expected: Option<u64>,
    ) -> Result<u64, StoreError> {
        let mut documents = Vec::with_capacity(entities.len());
        for entity in entities {
            documents.push(DocumentEntry {
                id: entity.id().to_string(),
                body: serde_json::to_value(entity)?,
            });
        }

        let response = self
            .request(Method::PUT, &Self::collection_path(collection), expected)
            .json(&ReplaceRequest { documents })
            .send()
            .await?;
        let response = Self::check(response, collection, expected)?;
        Ok(Self::revision(&response))
    }
}

#[async_trait]
impl BlobStore for RemoteClient {
    async fn get_blob(&self, path: &str) -> Result<Option<Blob>, StoreError> {
        let response = self
            .request(Method::GET, &Self::blob_path(path), None)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(response, path, None)?;
        let revision = Self::revision(&response);
        let bytes = response.bytes().await?;
        Ok(Some(Blob {
            bytes: bytes.to_vec(),
            revision,
        }))
    }

    async fn put_blob(
        &self,
        path: &str,
        bytes: Vec<u8>,
        expected: Option<u64>,
    ) -> Result<bool, StoreError> {
        let size = bytes.len();
        let response = self
            .request(Method::PUT, &Self::blob_path(path), expected)
            .header(reqwest::header::CONTENT_TYPE, "application/gzip")
            .body(bytes)
            .send()
            .await?;
        Self::check(response, path, expected)?;
        tracing::debug!("Uploaded {} bytes to {}", size, path);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> RemoteClient {
        RemoteClient::new(url, "key", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let c = client("http://localhost:8080/");
        assert_eq!(c.server_url(), "http://localhost:8080");
        assert_eq!(c.url("/health"), "http://localhost:8080/health");
    }

    #[test]
    fn test_document_path_encodes_ids() {
        assert_eq!(
            RemoteClient::document_path("orders", "a b/c"),
            "/collections/orders/a%20b%2Fc"
        );
    }

    #[test]
    fn test_blob_path_keeps_segments() {
        assert_eq!(RemoteClient::blob_path("data/items"), "/blobs/data/items");
        assert_eq!(
            RemoteClient::blob_path("/backup//backup_data"),
            "/blobs/backup/backup_data"
        );
    }

    #[tokio::test]
    async fn test_health_false_when_unreachable() {
        // Port 9 (discard) on localhost is not expected to run an HTTP server.
        let c = client("http://127.0.0.1:9");
        assert!(!c.health().await);
    }
}
