//! Vectorization backends.
//!
//! A [`Vectorizer`] turns raw image bytes into a [`VectorDocument`].
//! [`LocalVectorizer`] runs the raster stages in-process and hands the
//! binary raster to a [`LazyTracer`]; [`RemoteVectorizer`] sends the
//! image to an HTTP backend. [`Backend`] picks one at runtime.

use std::future::Future;
use std::sync::Arc;

use relief_pipeline::{Pipeline, PipelineConfig, RasterOutcome, TraceParams, VectorDocument};

use crate::error::VectorizeError;
use crate::remote::RemoteVectorizer;
use crate::tracer::{BuiltinLoader, LazyTracer, TracerLoader};

/// Output of a vectorization request.
#[derive(Debug, Clone)]
pub struct Vectorized {
    /// Every traced path, background included.
    pub document: VectorDocument,
    /// Raster stage outcome, when the raster stages ran locally.
    pub raster: Option<RasterOutcome>,
}

/// Turns image bytes into vector paths.
pub trait Vectorizer: Send + Sync {
    /// Vectorize `image_bytes` using the threshold half of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorizeError`] if the config is invalid, the image
    /// cannot be decoded, or the engine or backend fails.
    fn vectorize(
        &self,
        image_bytes: Vec<u8>,
        config: &PipelineConfig,
    ) -> impl Future<Output = Result<Vectorized, VectorizeError>> + Send;
}

/// In-process vectorization.
pub struct LocalVectorizer<L: TracerLoader = BuiltinLoader> {
    tracer: Arc<LazyTracer<L>>,
}

impl<L: TracerLoader> LocalVectorizer<L> {
    /// Vectorize with `tracer`, which may be shared with other users.
    pub const fn new(tracer: Arc<LazyTracer<L>>) -> Self {
        Self { tracer }
    }

    /// The shared tracer.
    pub const fn tracer(&self) -> &Arc<LazyTracer<L>> {
        &self.tracer
    }
}

impl Default for LocalVectorizer<BuiltinLoader> {
    fn default() -> Self {
        Self::new(Arc::new(LazyTracer::default()))
    }
}

impl<L: TracerLoader> Vectorizer for LocalVectorizer<L> {
    async fn vectorize(
        &self,
        image_bytes: Vec<u8>,
        config: &PipelineConfig,
    ) -> Result<Vectorized, VectorizeError> {
        let params = TraceParams::from(&config.threshold);
        let config = config.clone();
        let normalized = tokio::task::spawn_blocking(move || {
            Pipeline::new(image_bytes, config)
                .decode()
                .map(|decoded| decoded.binarize().normalize())
        })
        .await??;

        let outcome = RasterOutcome {
            threshold: normalized.threshold(),
            inverted: normalized.inverted(),
        };
        let document = self
            .tracer
            .trace(normalized.into_raster(), params)
            .await?;
        tracing::debug!(paths = document.len(), "vectorized locally");

        Ok(Vectorized {
            document,
            raster: Some(outcome),
        })
    }
}

/// A vectorizer chosen at runtime.
pub enum Backend {
    /// In-process raster stages and built-in tracer.
    Local(LocalVectorizer),
    /// HTTP vectorization backend.
    Remote(RemoteVectorizer),
}

impl Vectorizer for Backend {
    async fn vectorize(
        &self,
        image_bytes: Vec<u8>,
        config: &PipelineConfig,
    ) -> Result<Vectorized, VectorizeError> {
        match self {
            Self::Local(local) => local.vectorize(image_bytes, config).await,
            Self::Remote(remote) => remote.vectorize(image_bytes, config).await,
        }
    }
}
