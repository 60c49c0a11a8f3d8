//! Lazily initialized tracing engine.
//!
//! A tracing engine may need expensive one-time setup (loading a
//! module, warming caches). [`LazyTracer`] owns a [`TracerLoader`] and
//! runs it on first use. Concurrent first callers share one
//! initialization and none of them traces before it completes. A failed
//! initialization is not remembered, so the next call tries again.
//!
//! Tracing itself is CPU-bound and runs on tokio's blocking pool.

use std::future::Future;
use std::sync::Arc;

use relief_pipeline::{PathTracer, RgbaImage, TraceParams, TracerKind, VectorDocument};
use tokio::sync::OnceCell;

use crate::error::VectorizeError;

/// Produces a tracing engine.
pub trait TracerLoader: Send + Sync {
    /// The engine this loader builds.
    type Engine: PathTracer + Send + Sync + 'static;

    /// Build the engine.
    fn load(&self) -> impl Future<Output = Result<Self::Engine, VectorizeError>> + Send;
}

/// Loader for the built-in engine; never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLoader {
    /// Which built-in engine to build.
    pub kind: TracerKind,
}

impl TracerLoader for BuiltinLoader {
    type Engine = TracerKind;

    async fn load(&self) -> Result<TracerKind, VectorizeError> {
        Ok(self.kind)
    }
}

/// A tracing engine initialized on first use.
pub struct LazyTracer<L: TracerLoader> {
    loader: L,
    engine: OnceCell<Arc<L::Engine>>,
}

impl<L: TracerLoader> LazyTracer<L> {
    /// Wrap `loader`; nothing is loaded yet.
    pub const fn new(loader: L) -> Self {
        Self {
            loader,
            engine: OnceCell::const_new(),
        }
    }

    /// Whether the engine has been loaded.
    pub fn is_initialized(&self) -> bool {
        self.engine.initialized()
    }

    /// The engine, loading it if needed.
    ///
    /// # Errors
    ///
    /// Returns the loader's error. The failure is not cached.
    pub async fn engine(&self) -> Result<Arc<L::Engine>, VectorizeError> {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                tracing::debug!("initializing tracer");
                self.loader.load().await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(engine))
    }

    /// Trace `raster` on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns an initialization error, the engine's error, or
    /// [`VectorizeError::Task`] if the blocking task fails.
    pub async fn trace(
        &self,
        raster: RgbaImage,
        params: TraceParams,
    ) -> Result<VectorDocument, VectorizeError> {
        let engine = self.engine().await?;
        let document =
            tokio::task::spawn_blocking(move || engine.trace(&raster, &params)).await??;
        Ok(document)
    }
}

impl Default for LazyTracer<BuiltinLoader> {
    fn default() -> Self {
        Self::new(BuiltinLoader::default())
    }
}
