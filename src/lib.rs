//! `mailkeep`: mailbox backup into a browsable directory tree.
//!
//! This crate provides the core library: MIME decomposition of raw messages,
//! header decoding with total fallbacks, body/attachment selection, and the
//! deterministic filesystem projection (one directory per message, named
//! from its date, sender, and subject).

pub mod backup;
pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod sanitize;
pub mod select;
pub mod source;
