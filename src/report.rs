//! Machine-readable compatibility report

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::difference::{Difference, DifferenceList};
use crate::loader::LoadedSchema;

/// Where one side of the comparison came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub path: PathBuf,
    pub files: Vec<PathBuf>,
    pub checksum: Checksum,
    pub messages: usize,
}

impl SourceInfo {
    pub fn new(path: impl Into<PathBuf>, loaded: &LoadedSchema) -> Self {
        Self {
            path: path.into(),
            files: loaded.files.clone(),
            checksum: loaded.checksum.clone(),
            messages: loaded.snapshot.len(),
        }
    }
}

/// JSON envelope around a [`DifferenceList`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub generated_at: DateTime<Utc>,
    pub older: SourceInfo,
    pub newer: SourceInfo,
    /// No wire-breaking findings
    pub compatible: bool,
    /// Both sources hash identically
    pub identical_sources: bool,
    pub errors: Vec<Difference>,
    /// Empty when warnings are suppressed; `warning_count` still counts them
    pub warnings: Vec<Difference>,
    pub warning_count: usize,
    pub error_count: usize,
    pub summary: String,
}

impl CompatibilityReport {
    pub fn new(
        older: SourceInfo,
        newer: SourceInfo,
        differences: &DifferenceList,
        suppress_warnings: bool,
    ) -> Self {
        let warnings = if suppress_warnings {
            Vec::new()
        } else {
            differences.warnings().to_vec()
        };
        Self {
            generated_at: Utc::now(),
            identical_sources: older.checksum == newer.checksum,
            older,
            newer,
            compatible: differences.is_compatible(),
            errors: differences.errors().to_vec(),
            warnings,
            warning_count: differences.warnings().len(),
            error_count: differences.errors().len(),
            summary: differences.summary(),
        }
    }
}
