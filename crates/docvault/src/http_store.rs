//! HTTP implementation of the [`Store`] contract.
//!
//! Thin REST client for the document service. Every non-2xx response is
//! turned into a [`StoreError`]: 404 on a document route becomes
//! [`StoreError::NotFound`], 409 becomes [`StoreError::Conflict`], and
//! everything else keeps the status plus the server's `detail` message.
//! Requests are not retried; mutations are not idempotent and the session
//! layer decides what a failure means.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use docvault_core::error::StoreError;
use docvault_core::models::{
    Document, DocumentPreview, DocumentVersion, MetadataPatch, NewDocument, RagResponse,
    SearchHit, Tag,
};
use docvault_core::store::Store;

use crate::config::ServerConfig;

pub struct HttpStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

/// FastAPI-style error body.
#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    #[serde(flatten)]
    patch: &'a MetadataPatch,
    base_version: i64,
}

#[derive(Serialize)]
struct QueryBody<'a> {
    query: &'a str,
    top_k: i64,
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

/// Multipart payload shared by upload and file replacement.
fn document_form(new: NewDocument) -> multipart::Form {
    let file = multipart::Part::bytes(new.content).file_name(new.file_name);
    let mut form = multipart::Form::new()
        .part("file", file)
        .text("tags", new.tags.join(","))
        .text("is_public", new.visibility.as_str().to_string());
    if let Some(description) = new.description {
        form = form.text("description", description);
    }
    form
}

impl HttpStore {
    /// Build a store from server config. The bearer token is read from the
    /// environment variable the config names; absence means unauthenticated
    /// requests, which the server is free to reject.
    pub fn new(config: &ServerConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(transport)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: std::env::var(&config.token_env).ok(),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        tracing::debug!("{} {}", method, path);
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        document_id: Option<i64>,
    ) -> Result<T, StoreError> {
        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .map_err(transport)?;
        Self::parse(response, document_id).await
    }

    async fn parse<T: DeserializeOwned>(
        response: Response,
        document_id: Option<i64>,
    ) -> Result<T, StoreError> {
        if !response.status().is_success() {
            return Err(Self::triage(response, document_id).await);
        }
        response.json::<T>().await.map_err(transport)
    }

    /// Extract the server's `detail` message, falling back to the raw body.
    async fn triage(response: Response, document_id: Option<i64>) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => parsed.detail,
            Err(_) => body,
        };
        match (status, document_id) {
            (StatusCode::NOT_FOUND, Some(id)) => StoreError::NotFound(id),
            (StatusCode::CONFLICT, Some(id)) => StoreError::Conflict {
                document_id: id,
                message,
            },
            _ => StoreError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl Store for HttpStore {
    async fn list_documents(&self, skip: i64, limit: i64) -> Result<Vec<Document>, StoreError> {
        let path = format!("/api/documents/?skip={}&limit={}", skip, limit);
        self.get_json(&path, None).await
    }

    async fn get_document(&self, id: i64) -> Result<Document, StoreError> {
        self.get_json(&format!("/api/documents/{}", id), Some(id))
            .await
    }

    async fn upload(&self, new: NewDocument) -> Result<Document, StoreError> {
        let response = self
            .request(Method::POST, "/api/documents/upload")
            .multipart(document_form(new))
            .send()
            .await
            .map_err(transport)?;
        Self::parse(response, None).await
    }

    async fn update_document(
        &self,
        id: i64,
        patch: MetadataPatch,
        base_version: i64,
    ) -> Result<Document, StoreError> {
        let body = UpdateBody {
            patch: &patch,
            base_version,
        };
        let response = self
            .request(Method::PUT, &format!("/api/documents/{}", id))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        Self::parse(response, Some(id)).await
    }

    async fn replace_file(&self, id: i64, new: NewDocument) -> Result<Document, StoreError> {
        let response = self
            .request(Method::PUT, &format!("/api/documents/{}/file", id))
            .multipart(document_form(new))
            .send()
            .await
            .map_err(transport)?;
        Self::parse(response, Some(id)).await
    }

    async fn delete_document(&self, id: i64) -> Result<(), StoreError> {
        let response = self
            .request(Method::DELETE, &format!("/api/documents/{}", id))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(Self::triage(response, Some(id)).await);
        }
        Ok(())
    }

    async fn list_versions(&self, document_id: i64) -> Result<Vec<DocumentVersion>, StoreError> {
        self.get_json(
            &format!("/api/documents/{}/versions", document_id),
            Some(document_id),
        )
        .await
    }

    async fn rollback(&self, document_id: i64, version_id: i64) -> Result<Document, StoreError> {
        let path = format!(
            "/api/documents/{}/versions/{}/rollback",
            document_id, version_id
        );
        // 404 here can mean either a missing document or a missing version,
        // so the detail message is kept instead of a NotFound mapping.
        let response = self
            .request(Method::POST, &path)
            .send()
            .await
            .map_err(transport)?;
        Self::parse(response, None).await
    }

    async fn semantic_search(&self, query: &str, top_k: i64) -> Result<Vec<SearchHit>, StoreError> {
        let response = self
            .request(Method::POST, "/api/search/semantic")
            .json(&QueryBody { query, top_k })
            .send()
            .await
            .map_err(transport)?;
        Self::parse(response, None).await
    }

    async fn rag_query(&self, query: &str, top_k: i64) -> Result<RagResponse, StoreError> {
        let response = self
            .request(Method::POST, "/api/search/rag")
            .json(&QueryBody { query, top_k })
            .send()
            .await
            .map_err(transport)?;
        Self::parse(response, None).await
    }

    async fn preview(&self, id: i64) -> Result<DocumentPreview, StoreError> {
        self.get_json(&format!("/api/documents/{}/preview", id), Some(id))
            .await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        self.get_json("/api/documents/tags/all", None).await
    }
}
