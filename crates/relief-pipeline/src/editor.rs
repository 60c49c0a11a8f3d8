//! Editing session over a traced document.
//!
//! An [`Editor`] owns the undo history, the selected document, the model
//! dimensions, and the solid built from them. Every history transition
//! and every dimension change rebuilds the solid from the latest pair,
//! so [`Editor::solid`] always reflects what would be exported.

use crate::assemble::{SolidBuild, build_solid};
use crate::history::HistoryStack;
use crate::types::{ModelDimensions, PipelineError};
use crate::vector::{VectorDocument, VectorPath};

/// Undoable edits plus the solid derived from the current state.
#[derive(Debug, Clone)]
pub struct Editor {
    history: HistoryStack,
    document: Option<VectorDocument>,
    dimensions: ModelDimensions,
    solid: Option<SolidBuild>,
}

impl Editor {
    /// An editor with no document yet.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `dimensions` is invalid.
    pub fn new(dimensions: ModelDimensions) -> Result<Self, PipelineError> {
        Self::with_history(dimensions, HistoryStack::new())
    }

    /// An editor using `history` for undo/redo.
    ///
    /// Any snapshots already in `history` are ignored until the next
    /// transition.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `dimensions` is invalid.
    pub fn with_history(
        dimensions: ModelDimensions,
        history: HistoryStack,
    ) -> Result<Self, PipelineError> {
        dimensions.validate()?;
        Ok(Self {
            history,
            document: None,
            dimensions,
            solid: None,
        })
    }

    /// The selected document, if any.
    #[must_use]
    pub const fn document(&self) -> Option<&VectorDocument> {
        self.document.as_ref()
    }

    /// Current model dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> &ModelDimensions {
        &self.dimensions
    }

    /// The solid built from the selected document and dimensions.
    #[must_use]
    pub const fn solid(&self) -> Option<&SolidBuild> {
        self.solid.as_ref()
    }

    /// The undo history.
    #[must_use]
    pub const fn history(&self) -> &HistoryStack {
        &self.history
    }

    /// Record `document` as a new state, select it, and rebuild.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Snapshot`] if the snapshot cannot be
    /// stored; the editor is left unchanged.
    pub fn commit(&mut self, document: VectorDocument) -> Result<&SolidBuild, PipelineError> {
        self.history.push(&document)?;
        Ok(self.select(document))
    }

    /// Replace the model dimensions and commit `document` with a single
    /// rebuild.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `dimensions` is
    /// invalid, or [`PipelineError::Snapshot`] if the snapshot cannot be
    /// stored. In both cases the editor is left unchanged.
    pub fn commit_with_dimensions(
        &mut self,
        document: VectorDocument,
        dimensions: ModelDimensions,
    ) -> Result<&SolidBuild, PipelineError> {
        dimensions.validate()?;
        self.history.push(&document)?;
        self.dimensions = dimensions;
        Ok(self.select(document))
    }

    /// Delete the path at `index` from the selected document as a new
    /// undoable state, returning the removed path.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PathIndex`] if `index` is out of range or
    /// there is no document, and [`PipelineError::Snapshot`] if the new
    /// state cannot be stored.
    pub fn remove_path(&mut self, index: usize) -> Result<VectorPath, PipelineError> {
        let mut document = self
            .document
            .clone()
            .ok_or(PipelineError::PathIndex { index, len: 0 })?;
        let removed = document.remove_path_at(index)?;
        self.commit(document)?;
        Ok(removed)
    }

    /// Step back one state. Returns `false` when already at the oldest.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Snapshot`] if the stored state cannot be
    /// read back.
    pub fn undo(&mut self) -> Result<bool, PipelineError> {
        let Some(document) = self.history.undo()? else {
            return Ok(false);
        };
        self.select(document);
        Ok(true)
    }

    /// Step forward one state. Returns `false` when already at the newest.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Snapshot`] if the stored state cannot be
    /// read back.
    pub fn redo(&mut self) -> Result<bool, PipelineError> {
        let Some(document) = self.history.redo()? else {
            return Ok(false);
        };
        self.select(document);
        Ok(true)
    }

    /// Replace the model dimensions and rebuild. History is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `dimensions` is
    /// invalid; the previous dimensions stay in effect.
    pub fn set_dimensions(&mut self, dimensions: ModelDimensions) -> Result<(), PipelineError> {
        dimensions.validate()?;
        self.dimensions = dimensions;
        self.solid = self
            .document
            .as_ref()
            .map(|document| build_solid(document, &self.dimensions));
        Ok(())
    }

    fn select(&mut self, document: VectorDocument) -> &SolidBuild {
        let solid = build_solid(&document, &self.dimensions);
        tracing::debug!(
            paths = document.len(),
            position = ?self.history.index(),
            triangles = solid.assembly.triangle_count(),
            "rebuilt solid"
        );
        self.document = Some(document);
        self.solid.insert(solid)
    }
}
