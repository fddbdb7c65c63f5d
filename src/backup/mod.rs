//! Backup pipeline: the filesystem writer and the per-message orchestrator.

pub mod orchestrator;
pub mod writer;
