//! A ReAct agent loop: the model thinks, calls tools and reads their
//! results until it can answer.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod error;
pub mod extract;
mod model_client;
pub mod tool;

pub use agent::{Agent, AgentBuilder, Reply, ReplyKind, Step};
pub use error::AgentError;
pub use model_client::RetryPolicy;
