use crate::core::{AzureError, Config};
use crate::eventsource::{EventSourceExt, EventStream};
use crate::multipart::{MultipartForm, MultipartRequest};
use log::{debug, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

use super::types::chat_completion_request::ChatCompletionBody;
use super::types::{
    AudioResponseFormat, AudioResult, ChatCompletionChunk, ChatCompletionObject,
    ChatCompletionRequest, EmbeddingsRequest, EmbeddingsResponse, ErrorResponse,
    ImageEditRequest, ImageGenerationRequest, ImageVariationRequest, ImagesResponse,
    TranscriptionRequest, TranslationRequest,
};

const API_KEY_HEADER: &str = "api-key";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Deployment-scoped operations and their URL paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ChatCompletions,
    Embeddings,
    AudioTranscriptions,
    AudioTranslations,
    ImageGenerations,
    ImageVariations,
    ImageEdits,
}

impl Operation {
    pub const fn path(self) -> &'static str {
        match self {
            Self::ChatCompletions => "chat/completions",
            Self::Embeddings => "embeddings",
            Self::AudioTranscriptions => "audio/transcriptions",
            Self::AudioTranslations => "audio/translations",
            Self::ImageGenerations => "images/generations",
            Self::ImageVariations => "images/variations",
            Self::ImageEdits => "images/edits",
        }
    }
}

/// Who is responsible for tearing down the connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOwnership {
    /// Built by the client and released on shutdown
    Owned,
    /// Supplied by the caller and never torn down here
    Shared,
}

enum RequestBody {
    Json(Vec<u8>),
    Multipart { content_type: String, bytes: Vec<u8> },
}

impl RequestBody {
    fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, AzureError> {
        serde_json::to_vec(value)
            .map(Self::Json)
            .map_err(|e| AzureError::EncodingError(e.to_string()))
    }

    fn multipart(request: &impl MultipartRequest) -> Result<Self, AzureError> {
        let boundary = MultipartForm::with_random_boundary();
        let form = request.to_form(boundary.boundary())?;
        Ok(Self::Multipart {
            content_type: form.content_type(),
            bytes: form.encode()?,
        })
    }
}

/// Client for Azure-hosted OpenAI deployments.
///
/// Holds the API key, the configuration and a pooled transport handle. Safe to
/// share across tasks; every request and stream keeps its own state.
pub struct AzureOpenAIClient {
    api_key: String,
    config: Config,
    http: Mutex<Option<Client>>,
    ownership: TransportOwnership,
}

impl AzureOpenAIClient {
    /// Creates a client that owns its transport, built with the configured
    /// request timeout.
    pub fn new(api_key: impl Into<String>, config: Config) -> Result<Self, AzureError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AzureError::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            config,
            http: Mutex::new(Some(http)),
            ownership: TransportOwnership::Owned,
        })
    }

    /// Creates a client on top of a caller-owned transport.
    pub fn with_http_client(api_key: impl Into<String>, config: Config, http: Client) -> Self {
        Self {
            api_key: api_key.into(),
            config,
            http: Mutex::new(Some(http)),
            ownership: TransportOwnership::Shared,
        }
    }

    pub const fn ownership(&self) -> TransportOwnership {
        self.ownership
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Releases the transport. Safe to call any number of times.
    ///
    /// An owned pool is dropped here; a shared one is only detached and stays
    /// usable by its owner. Later requests fail with `ClientClosed`.
    pub fn shutdown(&self) {
        let released = self
            .http
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match (released, self.ownership) {
            (Some(pool), TransportOwnership::Owned) => {
                debug!("closing owned connection pool");
                drop(pool);
            }
            (Some(_), TransportOwnership::Shared) => debug!("detaching from shared transport"),
            (None, _) => debug!("shutdown called on a closed client"),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.http
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn http(&self) -> Result<Client, AzureError> {
        self.http
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(AzureError::ClientClosed)
    }

    /// `{endpoint}/openai/deployments/{deployment}/{operation}?api-version={version}`
    pub fn url(&self, deployment: &str, operation: Operation) -> String {
        format!(
            "{base}/openai/deployments/{deployment}/{path}?api-version={version}",
            base = self.config.endpoint.trim_end_matches('/'),
            path = operation.path(),
            version = self.config.api_version,
        )
    }

    async fn send(
        &self,
        deployment: &str,
        operation: Operation,
        body: RequestBody,
    ) -> Result<Response, AzureError> {
        let http = self.http()?;
        let url = self.url(deployment, operation);
        debug!("POST {url}");

        let (content_type, bytes) = match body {
            RequestBody::Json(bytes) => (JSON_CONTENT_TYPE.to_string(), bytes),
            RequestBody::Multipart {
                content_type,
                bytes,
            } => (content_type, bytes),
        };

        let response = http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        match serde_json::from_slice::<ErrorResponse>(&body) {
            Ok(error) => {
                warn!("{operation:?} failed with {status}: {}", error.error.message);
                Err(error.into_error(status.as_u16()))
            }
            Err(_) => {
                warn!("{operation:?} failed with {status} and no error body");
                Err(AzureError::HttpError {
                    status: status.as_u16(),
                })
            }
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        deployment: &str,
        operation: Operation,
        body: RequestBody,
    ) -> Result<T, AzureError> {
        let response = self.send(deployment, operation, body).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            AzureError::InvalidResponse(format!("Failed to parse {operation:?} response: {e}"))
        })
    }

    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionObject, AzureError> {
        let body = RequestBody::json(&ChatCompletionBody {
            request,
            stream: false,
            stream_options: None,
        })?;
        self.send_json(&self.config.deployments.chat, Operation::ChatCompletions, body)
            .await
    }

    /// Streams completion chunks in arrival order. Dropping the stream closes
    /// the connection. `stream_options` is sent only when the request sets it.
    pub async fn chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<EventStream<ChatCompletionChunk>, AzureError> {
        self.chat_completion_stream_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Like [`Self::chat_completion_stream`], ending early once `cancel` fires.
    pub async fn chat_completion_stream_with_cancel(
        &self,
        request: &ChatCompletionRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream<ChatCompletionChunk>, AzureError> {
        let body = RequestBody::json(&ChatCompletionBody {
            request,
            stream: true,
            stream_options: request.stream_options,
        })?;
        let response = self
            .send(&self.config.deployments.chat, Operation::ChatCompletions, body)
            .await?;
        Ok(response.events(cancel))
    }

    pub async fn embeddings(
        &self,
        request: &EmbeddingsRequest,
    ) -> Result<EmbeddingsResponse, AzureError> {
        let body = RequestBody::json(request)?;
        self.send_json(&self.config.deployments.embeddings, Operation::Embeddings, body)
            .await
    }

    pub async fn transcribe(
        &self,
        request: &TranscriptionRequest,
    ) -> Result<AudioResult, AzureError> {
        let format = request.response_format.unwrap_or_default();
        self.send_audio(Operation::AudioTranscriptions, RequestBody::multipart(request)?, format)
            .await
    }

    pub async fn translate(&self, request: &TranslationRequest) -> Result<AudioResult, AzureError> {
        let format = request.response_format.unwrap_or_default();
        self.send_audio(Operation::AudioTranslations, RequestBody::multipart(request)?, format)
            .await
    }

    async fn send_audio(
        &self,
        operation: Operation,
        body: RequestBody,
        format: AudioResponseFormat,
    ) -> Result<AudioResult, AzureError> {
        let deployment = &self.config.deployments.audio;
        if format.is_json() {
            return self.send_json(deployment, operation, body).await;
        }
        let response = self.send(deployment, operation, body).await?;
        Ok(AudioResult::from_text(response.text().await?))
    }

    pub async fn generate_images(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImagesResponse, AzureError> {
        let body = RequestBody::json(request)?;
        self.send_json(&self.config.deployments.images, Operation::ImageGenerations, body)
            .await
    }

    pub async fn edit_image(&self, request: &ImageEditRequest) -> Result<ImagesResponse, AzureError> {
        let body = RequestBody::multipart(request)?;
        self.send_json(&self.config.deployments.images, Operation::ImageEdits, body)
            .await
    }

    pub async fn image_variation(
        &self,
        request: &ImageVariationRequest,
    ) -> Result<ImagesResponse, AzureError> {
        let body = RequestBody::multipart(request)?;
        self.send_json(&self.config.deployments.images, Operation::ImageVariations, body)
            .await
    }
}

impl std::fmt::Debug for AzureOpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAIClient")
            .field("endpoint", &self.config.endpoint)
            .field("ownership", &self.ownership)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::azure::types::FileUpload;

    fn client(endpoint: &str) -> AzureOpenAIClient {
        AzureOpenAIClient::new("test-key", Config::default().with_endpoint(endpoint)).unwrap()
    }

    #[test]
    fn test_url_shape() {
        let client = client("https://res.openai.azure.com");
        let version = &client.config().api_version;
        assert_eq!(
            client.url("gpt-4o", Operation::ChatCompletions),
            format!(
                "https://res.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version={version}"
            )
        );
    }

    #[test]
    fn test_trailing_slash_is_tolerated() {
        let with_slash = client("https://res.openai.azure.com/");
        let without = client("https://res.openai.azure.com");
        assert_eq!(
            with_slash.url("d", Operation::ImageEdits),
            without.url("d", Operation::ImageEdits)
        );
    }

    #[test]
    fn test_operation_paths() {
        assert_eq!(Operation::AudioTranscriptions.path(), "audio/transcriptions");
        assert_eq!(Operation::AudioTranslations.path(), "audio/translations");
        assert_eq!(Operation::ImageGenerations.path(), "images/generations");
        assert_eq!(Operation::ImageVariations.path(), "images/variations");
        assert_eq!(Operation::Embeddings.path(), "embeddings");
    }

    #[test]
    fn test_owned_shutdown_is_idempotent() {
        let client = client("https://res.openai.azure.com");
        assert_eq!(client.ownership(), TransportOwnership::Owned);
        client.shutdown();
        client.shutdown();
        assert!(client.is_closed());
        assert!(matches!(client.http(), Err(AzureError::ClientClosed)));
    }

    #[test]
    fn test_shared_transport_survives_shutdown() {
        let shared = Client::new();
        let client =
            AzureOpenAIClient::with_http_client("k", Config::default(), shared.clone());
        assert_eq!(client.ownership(), TransportOwnership::Shared);
        client.shutdown();
        assert!(client.is_closed());
        // The caller's handle is untouched
        let _request = shared.get("https://example.com").build().unwrap();
    }

    #[test]
    fn test_multipart_body_carries_boundary_in_content_type() {
        let request = TranscriptionRequest::new(FileUpload::new("a.wav", vec![1, 2]));
        match RequestBody::multipart(&request).unwrap() {
            RequestBody::Multipart {
                content_type,
                bytes,
            } => {
                let boundary = content_type
                    .strip_prefix("multipart/form-data; boundary=")
                    .unwrap();
                assert!(bytes.starts_with(format!("--{boundary}\r\n").as_bytes()));
            }
            RequestBody::Json(_) => panic!("expected a multipart body"),
        }
    }
}
