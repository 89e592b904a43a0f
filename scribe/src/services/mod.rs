//! Pipeline services

pub mod merge;
pub mod pipeline;
pub mod storage;
pub mod webhook;

pub use storage::{ArtifactKind, ArtifactStore};
pub use webhook::WebhookDispatcher;
