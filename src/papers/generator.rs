use thiserror::Error;

use super::graph::{ClusterInsight, GraphData, PaperNode};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("malformed {what} response: {reason}")]
    MalformedResponse { what: &'static str, reason: String },
    #[error("generator request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to read fixture {path}: {source}")]
    Fixture {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no insight for cluster {0} in fixture")]
    MissingInsight(u32),
}

impl GeneratorError {
    pub(super) fn malformed(what: &'static str, reason: impl ToString) -> Self {
        Self::MalformedResponse {
            what,
            reason: reason.to_string(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }
}

/// Produces graph content and cluster narratives.
///
/// Calls block and may take seconds; callers run them off the UI thread.
pub trait Generator: Send + Sync {
    fn generate_graph(&self, topic: &str) -> Result<GraphData, GeneratorError>;

    fn generate_insight(&self, papers: &[PaperNode]) -> Result<ClusterInsight, GeneratorError>;
}
