//! Analysis domain: requests, chunks, artifacts, results

pub mod entities;
pub mod value_objects;

pub use entities::{
    AnalysisRequest, AnalysisResult, Chunk, ChunkOutcome, ChunkRecord, ComplianceFinding,
    GeneratedTest, RiskItem,
};
pub use value_objects::{
    AnalysisArtifact, AnalysisKind, AnalysisStatus, ChunkId, Confidence, Severity, SourceSpan,
};
