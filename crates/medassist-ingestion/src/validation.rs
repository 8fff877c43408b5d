//! Batch validation and chunking
//!
//! Files are checked in submission order. Individually invalid files are
//! dropped without aborting the batch; crossing the cumulative ceiling
//! rejects the batch as a whole.

use medassist_core::{Category, FilePayload, LimitsConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, ValidationError};

const PDF: &str = "application/pdf";
const DOC: &str = "application/msword";
const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const TEXT: &str = "text/plain";
const CSV: &str = "text/csv";
const JPEG: &str = "image/jpeg";
const PNG: &str = "image/png";

/// Why a file was left out of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
    UnsupportedType { content_type: String },
    TooLarge { size: u64, limit: u64 },
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::UnsupportedType { content_type } => {
                write!(f, "unsupported type {}", content_type)
            }
            DropReason::TooLarge { size, limit } => {
                write!(f, "{} bytes exceeds the per-file limit of {} bytes", size, limit)
            }
        }
    }
}

/// A file dropped by validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedFile {
    pub name: String,
    #[serde(flatten)]
    pub reason: DropReason,
}

/// Allow-list and size ceilings for one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub allowed_types: Vec<String>,
    pub max_file_size: u64,
    pub max_batch_size: u64,
    pub max_files_per_request: usize,
}

impl ValidationPolicy {
    pub fn for_category(category: Category) -> Self {
        let allowed: &[&str] = match category {
            Category::Medical => &[PDF, DOC, DOCX, TEXT, CSV, JPEG, PNG],
            Category::Patient => &[PDF, DOC, DOCX, TEXT, CSV],
        };
        let limits = LimitsConfig::default();

        Self {
            allowed_types: allowed.iter().map(|t| t.to_string()).collect(),
            max_file_size: limits.max_file_size,
            max_batch_size: limits.max_batch_size,
            max_files_per_request: limits.max_files_per_request,
        }
    }

    pub fn with_limits(mut self, limits: &LimitsConfig) -> Self {
        self.max_file_size = limits.max_file_size;
        self.max_batch_size = limits.max_batch_size;
        self.max_files_per_request = limits.max_files_per_request;
        self
    }

    /// Compares the type's essence, ignoring parameters and case.
    pub fn allows(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.allowed_types.iter().any(|t| *t == essence)
    }

    fn check(&self, file: &FilePayload) -> Option<DropReason> {
        if !self.allows(&file.content_type) {
            return Some(DropReason::UnsupportedType {
                content_type: file.content_type.clone(),
            });
        }
        if file.size() > self.max_file_size {
            return Some(DropReason::TooLarge {
                size: file.size(),
                limit: self.max_file_size,
            });
        }
        None
    }
}

/// Files cleared for submission
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    pub accepted: Vec<FilePayload>,
    pub dropped: Vec<DroppedFile>,
    max_files_per_request: usize,
}

impl ValidatedBatch {
    pub fn total_size(&self) -> u64 {
        self.accepted.iter().map(FilePayload::size).sum()
    }

    /// Some files were dropped before submission (informational).
    pub fn is_partial(&self) -> bool {
        !self.dropped.is_empty()
    }

    /// Accepted files grouped into request-sized chunks, order preserved.
    pub fn chunks(&self) -> impl Iterator<Item = &[FilePayload]> {
        self.accepted.chunks(self.max_files_per_request.max(1))
    }

    pub fn into_chunks(self) -> Vec<Vec<FilePayload>> {
        let size = self.max_files_per_request.max(1);
        let mut chunks = Vec::new();
        let mut current = Vec::with_capacity(size);
        for file in self.accepted {
            current.push(file);
            if current.len() == size {
                chunks.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

/// Filter a candidate batch against `policy`.
pub fn validate_batch(files: Vec<FilePayload>, policy: &ValidationPolicy) -> Result<ValidatedBatch> {
    let mut accepted = Vec::with_capacity(files.len());
    let mut dropped = Vec::new();
    let mut total: u64 = 0;

    for file in files {
        if let Some(reason) = policy.check(&file) {
            debug!(file = %file.name, reason = %reason, "Dropping file from batch");
            dropped.push(DroppedFile {
                name: file.name,
                reason,
            });
            continue;
        }

        total += file.size();
        if total > policy.max_batch_size {
            return Err(ValidationError::BatchTooLarge {
                total,
                limit: policy.max_batch_size,
            });
        }
        accepted.push(file);
    }

    if accepted.is_empty() {
        return Err(ValidationError::NoValidFiles);
    }

    Ok(ValidatedBatch {
        accepted,
        dropped,
        max_files_per_request: policy.max_files_per_request,
    })
}
