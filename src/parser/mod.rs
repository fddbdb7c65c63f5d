//! Message parsing: header decoding and MIME tree decomposition.

pub mod header;
pub mod mime;
