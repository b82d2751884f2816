//! Per-image failures.
//!
//! None of these stop a batch: the image is logged, left out of the store,
//! and picked up again on the next run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("failed to read image {path}: {source}")]
    ReadImage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("extraction request failed: {0:#}")]
    Request(anyhow::Error),

    #[error("no content generated")]
    EmptyResponse,

    #[error("JSON decode error ({shape}): {message}. Text: {text}")]
    Decode {
        shape: &'static str,
        message: String,
        text: String,
    },

    #[error("empty recipe array returned")]
    EmptyArray,

    #[error("already in store")]
    Duplicate,
}
