//! Book Translator - client library for the book translation service
//!
//! This library submits an EPUB to the translation backend, polls the
//! resulting task until it finishes, and downloads the translated book.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

pub mod cli;
pub mod core;

// Re-export key types for convenience
pub use crate::core::{
    client::{JobClient, StatusPoller},
    config::ClientConfig,
    errors::JobError,
    models::{Artifact, JobHandle, JobPhase, JobState, JobStatus, TranslationRequest},
    prefs::{FilePreferenceStore, PreferenceStore},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
