//! Backend adapter implementations
//!
//! One module per transport variant; all of them implement
//! [`crate::domain::Backend`] and nothing else.

pub mod hosted;
pub mod lan;
pub mod local;
pub mod mock;

pub use hosted::HostedBackend;
pub use lan::LanBackend;
pub use local::LocalBackend;
pub use mock::MockBackend;
