//! Core data model types for parsed messages, selected content, and outcomes.

pub mod content;
pub mod message;
pub mod outcome;
