//! Record of observed disagreements between the legacy and generic stores.
//!
//! Divergences are reported, never repaired here.

use crate::rest::Operation;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DivergenceKind {
    /// Legacy write succeeded, generic write failed.
    SecondaryWriteFailed(Operation),
    /// Both stores hold the object with different specs.
    SpecMismatch,
    /// Both stores hold the object; legacy-owned annotations differ.
    AnnotationMismatch,
    /// Generic store holds an object the legacy store does not.
    MissingInLegacy,
    /// Copying a legacy-only object into the generic store on read failed.
    BackfillFailed,
    /// Generic read failed; the legacy copy was served.
    SecondaryReadFailed,
}

impl DivergenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecondaryWriteFailed(_) => "secondary_write_failed",
            Self::SpecMismatch => "spec_mismatch",
            Self::AnnotationMismatch => "annotation_mismatch",
            Self::MissingInLegacy => "missing_in_legacy",
            Self::BackfillFailed => "backfill_failed",
            Self::SecondaryReadFailed => "secondary_read_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    pub kind: DivergenceKind,
    pub namespace: String,
    pub name: String,
    pub detail: String,
}

impl Display for Divergence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.kind.as_str(), self.namespace, self.name)?;
        if let DivergenceKind::SecondaryWriteFailed(operation) = &self.kind {
            write!(f, " op={operation}")?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// Shared, append-only divergence sink. Clones observe the same entries.
#[derive(Debug, Clone, Default)]
pub struct DivergenceLog {
    entries: Arc<Mutex<Vec<Divergence>>>,
}

impl DivergenceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, divergence: Divergence) {
        // A poisoned lock still holds valid entries; keep recording.
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push(divergence);
    }

    pub fn snapshot(&self) -> Vec<Divergence> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns and clears all recorded entries.
    pub fn drain(&self) -> Vec<Divergence> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *entries)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
