use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use super::generator::{Generator, GeneratorError};
use super::graph::{ClusterInsight, GraphData, PaperNode};
use super::parse::{parse_graph_response, parse_insight_response};

/// Serves a graph document from disk instead of a remote model.
///
/// An optional top-level `insights` object maps cluster ids (as strings) to
/// `{title, narrative}` records; the graph parser ignores it.
pub struct FixtureGenerator {
    path: PathBuf,
}

impl FixtureGenerator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<String, GeneratorError> {
        fs::read_to_string(&self.path).map_err(|source| GeneratorError::Fixture {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl Generator for FixtureGenerator {
    fn generate_graph(&self, topic: &str) -> Result<GraphData, GeneratorError> {
        tracing::info!(topic, path = %self.path.display(), "serving graph from fixture");
        parse_graph_response(&self.read()?)
    }

    fn generate_insight(&self, papers: &[PaperNode]) -> Result<ClusterInsight, GeneratorError> {
        let Some(cluster_id) = papers.first().map(|paper| paper.cluster_id) else {
            return Err(GeneratorError::malformed("insight", "no papers in cluster"));
        };

        let document: Value = serde_json::from_str(&self.read()?)
            .map_err(|error| GeneratorError::malformed("insight", error))?;
        let entry = document
            .get("insights")
            .and_then(|insights| insights.get(cluster_id.to_string()))
            .ok_or(GeneratorError::MissingInsight(cluster_id))?;

        parse_insight_response(&entry.to_string())
    }
}
