//! The completion gateway protocol.
//!
//! The agent only ever needs one thing from a language model: give it the
//! conversation so far and get back a piece of text. This crate pins down
//! that exchange so the agent core can be written against any provider
//! (or a scripted one in tests) without knowing how the text is produced.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
