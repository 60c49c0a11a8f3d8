//! Remote vectorization backend.
//!
//! Sends the raw image as a `multipart/form-data` POST to
//! `<base>/vectorize` together with the threshold and tracing
//! parameters. The backend answers with JSON, either
//! `{"svgString": ..., "width": ..., "height": ...}` or
//! `{"error": ...}`. The SVG is imported into a [`VectorDocument`].
//!
//! The HTTP round trip is blocking (`ureq`) and runs on tokio's blocking
//! pool.

use std::time::Duration;

use relief_pipeline::{Dimensions, PipelineConfig, ThresholdConfig, VectorDocument, import_svg};
use serde::Deserialize;

use crate::error::VectorizeError;
use crate::vectorize::{Vectorized, Vectorizer};

/// Largest response body accepted, in bytes.
const MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

/// Filename reported for the uploaded image part.
const UPLOAD_FILENAME: &str = "image";

/// Backend reply.
///
/// A populated `error` wins over any other field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BackendResponse {
    /// The backend failed.
    Failure {
        /// Human-readable failure.
        error: String,
    },
    /// The traced SVG and the size of the image the backend decoded.
    Success {
        /// The SVG document.
        #[serde(rename = "svgString")]
        svg_string: String,
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },
}

impl BackendResponse {
    /// Import the SVG, or surface the backend's error.
    ///
    /// # Errors
    ///
    /// Returns [`VectorizeError::Backend`] for a failure reply and
    /// [`VectorizeError::Pipeline`] if the SVG cannot be imported.
    pub fn into_document(self) -> Result<VectorDocument, VectorizeError> {
        match self {
            Self::Failure { error } => Err(VectorizeError::Backend {
                status: None,
                message: error,
            }),
            Self::Success {
                svg_string,
                width,
                height,
            } => Ok(import_svg(&svg_string, Dimensions { width, height })?),
        }
    }
}

/// The form fields sent alongside the image, in wire order.
///
/// `threshold` carries the manual cut rounded to an integer (128 when
/// absent); `manualThreshold` is `true` exactly when a manual cut is set.
#[must_use]
pub fn form_fields(config: &ThresholdConfig) -> Vec<(&'static str, String)> {
    let cut = config
        .manual_value
        .unwrap_or(ThresholdConfig::DEFAULT_MANUAL_CUT)
        .round();
    vec![
        ("turdsize", config.turd_size.to_string()),
        ("alphamax", config.alpha_max.to_string()),
        ("optcurve", config.optimize_curves.to_string()),
        ("opttolerance", config.optimize_tolerance.to_string()),
        ("threshold", format!("{cut:.0}")),
        ("manualThreshold", config.manual_value.is_some().to_string()),
        ("algorithm", config.algorithm.to_string()),
    ]
}

/// A `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct Multipart {
    /// Part delimiter, without the leading dashes.
    pub boundary: String,
    /// Encoded body.
    pub body: Vec<u8>,
}

impl Multipart {
    /// Encode `file` followed by `fields`.
    ///
    /// The boundary is random and checked against the payload.
    #[must_use]
    pub fn encode(file: &[u8], fields: &[(&str, String)]) -> Self {
        let mut boundary = random_boundary();
        while contains(file, boundary.as_bytes())
            || fields.iter().any(|(_, v)| v.contains(&boundary))
        {
            boundary = random_boundary();
        }

        let mut body = Vec::with_capacity(file.len() + 1024);
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{UPLOAD_FILENAME}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(b"\r\n");

        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        Self { boundary, body }
    }

    /// Value for the `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

fn random_boundary() -> String {
    format!("relief-{}", uuid::Uuid::new_v4().simple())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Vectorization through an HTTP backend.
#[derive(Debug, Clone)]
pub struct RemoteVectorizer {
    endpoint: String,
    agent: ureq::Agent,
}

impl RemoteVectorizer {
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    /// A client for the backend at `base_url` (e.g. `http://localhost:8000`).
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Self::DEFAULT_TIMEOUT)
    }

    /// Like [`new`](Self::new) with an explicit per-request timeout.
    #[must_use]
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            endpoint: format!("{}/vectorize", base_url.trim_end_matches('/')),
            agent,
        }
    }

    /// The full `/vectorize` URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post(&self, form: &Multipart) -> Result<BackendResponse, VectorizeError> {
        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("Content-Type", form.content_type())
            .send(&form.body[..])?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .body_mut()
                .with_config()
                .limit(MAX_RESPONSE_BYTES)
                .read_to_string()
                .unwrap_or_default();
            let message = serde_json::from_str::<BackendResponse>(&text)
                .ok()
                .and_then(|r| match r {
                    BackendResponse::Failure { error } => Some(error),
                    BackendResponse::Success { .. } => None,
                })
                .unwrap_or(text);
            return Err(VectorizeError::Backend {
                status: Some(status.as_u16()),
                message,
            });
        }

        let reply = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_json::<BackendResponse>()?;
        Ok(reply)
    }
}

impl Vectorizer for RemoteVectorizer {
    async fn vectorize(
        &self,
        image_bytes: Vec<u8>,
        config: &PipelineConfig,
    ) -> Result<Vectorized, VectorizeError> {
        config.threshold.validate()?;
        if image_bytes.is_empty() {
            return Err(relief_pipeline::PipelineError::EmptyInput.into());
        }

        let form = Multipart::encode(&image_bytes, &form_fields(&config.threshold));
        let client = self.clone();
        tracing::debug!(endpoint = %self.endpoint, bytes = form.body.len(), "posting to backend");
        let reply = tokio::task::spawn_blocking(move || client.post(&form)).await??;

        let document = reply.into_document()?;
        tracing::debug!(paths = document.len(), "vectorized remotely");
        Ok(Vectorized {
            document,
            raster: None,
        })
    }
}
