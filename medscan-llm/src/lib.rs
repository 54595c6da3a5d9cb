pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{AnalysisPipeline, RequestOrchestrator};
pub use domain::*;
pub use infrastructure::chunker::split_project;
pub use infrastructure::interpreter::ResultInterpreter;
pub use infrastructure::prompts;
pub use infrastructure::registry::BackendRegistry;
