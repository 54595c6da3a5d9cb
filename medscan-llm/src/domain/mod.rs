//! Backend-facing domain types: the adapter contract, request/response
//! shapes, and the error taxonomy.

pub mod backend;
pub mod error;
pub mod messages;

pub use backend::{Backend, BackendInfo};
pub use error::BackendError;
pub use messages::{GenerationRequest, RawResponse, TokenUsage};
