//! antenna library
//!
//! Resolves YouTube and Vimeo URLs to embed code and metadata through the
//! providers' oEmbed endpoints, with a file-backed TTL cache in front of them.

pub mod cache;
pub mod cli;
pub mod data;
