//! LLM-backed opportunity analysis: provider clients, prompt and response
//! handling, and the scheduled batch runner.

pub mod analyzer;
pub mod batch;
pub mod clients;
pub mod error;
pub mod runner;
pub mod types;

pub use analyzer::AnalysisClient;
pub use batch::analyze_batch_weighted;
pub use clients::{ClaudeClient, OpenAiClient};
pub use error::AnalyzeError;
pub use runner::{
    load_niches, run_analysis_batch, AnalysisDetail, AnalysisRunSummary, AnalysisStatus,
};
pub use types::{GeneratedResearch, OpportunityAnalysis, Provider};
