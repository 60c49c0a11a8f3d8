//! Vectorize-and-edit session.
//!
//! A [`Session`] pairs a [`Vectorizer`] with an [`Editor`]. Requests may
//! overlap: each one is tagged with a generation from a [`RequestGate`]
//! when it starts, and only the newest request may replace the
//! document. An older response that finishes later is dropped and
//! reported as [`Revectorized::Stale`].

use std::sync::atomic::{AtomicU64, Ordering};

use relief_pipeline::{Editor, ModelDimensions, PipelineConfig, RasterOutcome, SolidBuild};
use tokio::sync::{Mutex, MutexGuard};

use crate::error::VectorizeError;
use crate::vectorize::Vectorizer;

/// Hands out increasing request generations and remembers the newest.
#[derive(Debug, Default)]
pub struct RequestGate {
    latest: AtomicU64,
}

impl RequestGate {
    /// A gate that has issued nothing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
        }
    }

    /// Start a request and return its generation (the first is 1).
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// The newest generation issued.
    #[must_use]
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Whether `generation` is still the newest.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.latest() == generation
    }
}

/// What happened to a re-vectorization request.
#[derive(Debug, Clone)]
pub enum Revectorized {
    /// The result replaced the document.
    Applied {
        /// Generation of the request.
        generation: u64,
        /// The rebuilt solid.
        solid: SolidBuild,
        /// Raster stage outcome, for local vectorization.
        raster: Option<RasterOutcome>,
    },
    /// A newer request started first; the result was dropped.
    Stale {
        /// Generation of the dropped request.
        generation: u64,
        /// Newest generation at the time it finished.
        latest: u64,
    },
}

/// A vectorizer plus the editor holding its latest result.
pub struct Session<V: Vectorizer> {
    vectorizer: V,
    gate: RequestGate,
    editor: Mutex<Editor>,
}

impl<V: Vectorizer> Session<V> {
    /// A session with an empty editor.
    ///
    /// # Errors
    ///
    /// Returns [`VectorizeError::Pipeline`] if `dimensions` is invalid.
    pub fn new(vectorizer: V, dimensions: ModelDimensions) -> Result<Self, VectorizeError> {
        Ok(Self {
            vectorizer,
            gate: RequestGate::new(),
            editor: Mutex::new(Editor::new(dimensions)?),
        })
    }

    /// The request gate.
    pub const fn gate(&self) -> &RequestGate {
        &self.gate
    }

    /// The vectorizer.
    pub const fn vectorizer(&self) -> &V {
        &self.vectorizer
    }

    /// Exclusive access to the editor for undo, redo, and path removal.
    pub async fn editor(&self) -> MutexGuard<'_, Editor> {
        self.editor.lock().await
    }

    /// Vectorize `image_bytes` and, if no newer request has started in
    /// the meantime, commit the result and apply `config.model`.
    ///
    /// # Errors
    ///
    /// Returns the vectorizer's error, or [`VectorizeError::Pipeline`]
    /// if the result cannot be committed. A failed request never
    /// changes the editor.
    pub async fn revectorize(
        &self,
        image_bytes: Vec<u8>,
        config: &PipelineConfig,
    ) -> Result<Revectorized, VectorizeError> {
        config.validate()?;
        let generation = self.gate.begin();
        tracing::debug!(generation, "revectorizing");

        let vectorized = self.vectorizer.vectorize(image_bytes, config).await?;

        let mut editor = self.editor.lock().await;
        let latest = self.gate.latest();
        if latest != generation {
            tracing::warn!(generation, latest, "discarding stale vectorization");
            return Ok(Revectorized::Stale { generation, latest });
        }

        let solid = editor
            .commit_with_dimensions(vectorized.document, config.model)?
            .clone();
        tracing::info!(
            generation,
            triangles = solid.assembly.triangle_count(),
            "applied vectorization"
        );
        Ok(Revectorized::Applied {
            generation,
            solid,
            raster: vectorized.raster,
        })
    }
}
