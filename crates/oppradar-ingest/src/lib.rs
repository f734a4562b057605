//! Content ingestion: source transports, the heuristic signal filter, and
//! the per-source scrape pipeline.

pub mod error;
pub mod pipeline;
pub mod signal;
pub mod sources;

pub use error::IngestError;
pub use pipeline::{run_ingest, IngestClient, SourceOutcome, SourceResult};
pub use signal::{forum_signals, has_signal, story_signals};
pub use sources::hackernews::{HnClient, StoryKind};
