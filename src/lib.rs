//! Minimal file sharing over a line-based TCP protocol.
//!
//! A connection carries exactly one command line (`LIST`, `UPLOAD <name>` or
//! `DOWNLOAD <name>`); binary payloads follow the command on the same stream
//! and are delimited by half-close/EOF rather than a length prefix.

pub mod cli;
pub mod client;
pub mod protocol;
pub mod server;
pub mod store;
pub mod transfer;
