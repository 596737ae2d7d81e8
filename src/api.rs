//! HTTP contract of the archive backend.
//!
//! Everything the client needs from the server goes through [`ArchiveApi`], so
//! the session logic can be driven against any implementation. [`HttpArchive`]
//! is the reqwest-backed one.

use crate::config::ClientConfig;
use crate::records::{ImageRecord, ServerMessage, UpdateTagsResponse, UploadReceipt};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP error! status: {status}, message: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

/// A file ready to be sent as the `file` part of `/upload`
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ArchiveApi: Send + Sync {
    /// `GET /search?tags=<csv>`; an empty query returns the whole corpus
    async fn search(&self, tags: &str) -> Result<Vec<ImageRecord>, ApiError>;
    /// `GET /all-tags`
    async fn all_tags(&self) -> Result<Vec<String>, ApiError>;
    /// `GET /image/<path>`
    async fn fetch_image(&self, path: &str) -> Result<Vec<u8>, ApiError>;
    /// `POST /upload`; any non-2xx status is an error carrying the body text
    async fn upload(&self, file: FileUpload, folder: &str) -> Result<UploadReceipt, ApiError>;
    /// `POST /update-tags`
    async fn update_tags(&self, path: &str, tags: &str) -> Result<UpdateTagsResponse, ApiError>;
    /// `POST /index`
    async fn index(&self) -> Result<ServerMessage, ApiError>;
    /// `POST /process-folder`
    async fn process_folder(&self) -> Result<ServerMessage, ApiError>;
    /// Public URL of an image, for links opened outside the client
    fn image_url(&self, path: &str) -> String;
}

#[derive(Serialize)]
struct UpdateTagsRequest<'a> {
    path: &'a str,
    tags: &'a str,
}

#[derive(Clone)]
pub struct HttpArchive {
    client: Client,
    base: Url,
}

impl HttpArchive {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &ClientConfig) -> Result<Self, ApiError> {
        let base = Url::parse(&config.api_base)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.api_base, e)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.api_base.clone()));
        }
        Ok(Self { client, base })
    }

    /// Append path segments to the base URL. Each segment is percent-encoded
    /// on its own, so a `/` inside an image path becomes `%2F`.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn post_for_message(&self, segment: &str) -> Result<ServerMessage, ApiError> {
        let response = self
            .client
            .post(self.endpoint(&[segment])?)
            .send()
            .await?;
        Self::read_json(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ArchiveApi for HttpArchive {
    async fn search(&self, tags: &str) -> Result<Vec<ImageRecord>, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&["search"])?)
            .query(&[("tags", tags)])
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn all_tags(&self) -> Result<Vec<String>, ApiError> {
        let response = self.client.get(self.endpoint(&["all-tags"])?).send().await?;
        Self::read_json(response).await
    }

    async fn fetch_image(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&["image", path])?)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn upload(&self, file: FileUpload, folder: &str) -> Result<UploadReceipt, ApiError> {
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.mime)?;
        let form = Form::new().part("file", part).text("folder", folder.to_string());

        let response = self
            .client
            .post(self.endpoint(&["upload"])?)
            .multipart(form)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn update_tags(&self, path: &str, tags: &str) -> Result<UpdateTagsResponse, ApiError> {
        let response = self
            .client
            .post(self.endpoint(&["update-tags"])?)
            .json(&UpdateTagsRequest { path, tags })
            .send()
            .await?;

        // The backend answers failed edits with a 500 and `{"success": false}`;
        // that is a reported failure, not a transport one.
        let status = response.status();
        if status.is_success() {
            return Self::read_json(response).await;
        }
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<UpdateTagsResponse>(&body).map_err(|_| ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn index(&self) -> Result<ServerMessage, ApiError> {
        self.post_for_message("index").await
    }

    async fn process_folder(&self) -> Result<ServerMessage, ApiError> {
        self.post_for_message("process-folder").await
    }

    fn image_url(&self, path: &str) -> String {
        self.endpoint(&["image", path])
            .map(|u| u.to_string())
            .unwrap_or_default()
    }
}
