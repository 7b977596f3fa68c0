mod fixture;
mod gemini;
mod generator;
mod graph;
mod parse;

pub use fixture::FixtureGenerator;
pub use gemini::GeminiGenerator;
pub use generator::{Generator, GeneratorError};
pub use graph::{ClusterInsight, GraphData, Link, LinkKind, PaperNode};

#[cfg(test)]
pub(crate) use graph::test_paper;
