//! One multipart POST per backend action.

use async_trait::async_trait;
use reqwest::{multipart, Client};
use shared::{
    domain::Action,
    protocol::{ACTION_FIELD, IMAGE_FIELD, REQUESTED_WITH_HEADER},
};
use tracing::{debug, error};

use crate::{config::Settings, error::TransportError, handle::ImageHandle};

/// A successful (2xx) backend response.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait ImageService: Send + Sync {
    async fn process(
        &self,
        image: &ImageHandle,
        action: Action,
    ) -> Result<BackendResponse, TransportError>;
}

pub struct HttpImageService {
    http: Client,
    endpoint: String,
    requested_with: Option<String>,
}

impl HttpImageService {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
            requested_with: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let endpoint = settings.endpoint()?;
        Ok(Self {
            http: Client::new(),
            endpoint: endpoint.to_string(),
            requested_with: settings.requested_with.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn form(image: &ImageHandle, action: Action) -> Result<multipart::Form, TransportError> {
        let part = multipart::Part::bytes(image.bytes().to_vec())
            .file_name(image.name().to_string())
            .mime_str(image.mime())
            .map_err(|source| TransportError::InvalidMime {
                mime: image.mime().to_string(),
                source,
            })?;
        Ok(multipart::Form::new()
            .part(IMAGE_FIELD, part)
            .text(ACTION_FIELD, action.wire_name()))
    }
}

#[async_trait]
impl ImageService for HttpImageService {
    async fn process(
        &self,
        image: &ImageHandle,
        action: Action,
    ) -> Result<BackendResponse, TransportError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .multipart(Self::form(image, action)?);
        if let Some(value) = &self.requested_with {
            request = request.header(REQUESTED_WITH_HEADER, value);
        }

        debug!(action = action.wire_name(), bytes = image.len(), "posting image to backend");
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                action = action.wire_name(),
                status = status.as_u16(),
                body = %body,
                "backend request failed"
            );
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();
        debug!(
            action = action.wire_name(),
            status = status.as_u16(),
            bytes = body.len(),
            "backend responded"
        );

        Ok(BackendResponse {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}
