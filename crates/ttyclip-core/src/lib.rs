//! Core protocol types and logic for ttyclip.
//!
//! This crate holds everything that can be exercised without a real
//! terminal: the escape-sequence codec and the per-invocation session state
//! machine. The `ttyclip` binary drives both against the controlling
//! terminal.
//!
//! # Modules
//!
//! - [`codec`]: OSC 52 / XTGETTCAP encoding, response decoding, input scanning
//! - [`error`]: internal decode error type
//! - [`protocol`]: shared protocol vocabulary (selections, responses, events)
//! - [`session`]: the clipboard session state machine

pub mod codec;
pub mod error;
pub mod protocol;
pub mod session;
