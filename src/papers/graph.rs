use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Citation,
    Similarity,
    Dataset,
}

impl LinkKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Citation => "citation",
            Self::Similarity => "similarity",
            Self::Dataset => "dataset",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperNode {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: i32,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub cluster_id: u32,
    /// The key must be present; `null`, empty and placeholder values mean the
    /// paper has no known arXiv id.
    #[serde(deserialize_with = "nullable_arxiv_id")]
    pub arxiv_id: Option<String>,
    pub relevance_statement: String,
    #[serde(default)]
    pub is_bridge: bool,
}

fn nullable_arxiv_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|value| value.trim().to_owned()).filter(|value| {
        !value.is_empty()
            && !value.eq_ignore_ascii_case("null")
            && !value.eq_ignore_ascii_case("n/a")
    }))
}

impl PaperNode {
    pub fn authors_line(&self) -> String {
        self.authors.join(", ")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: LinkKind,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GraphData {
    pub nodes: Vec<PaperNode>,
    pub links: Vec<Link>,
}

impl GraphData {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn node(&self, id: &str) -> Option<&PaperNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn year_span(&self) -> Option<(i32, i32)> {
        let min = self.nodes.iter().map(|node| node.year).min()?;
        let max = self.nodes.iter().map(|node| node.year).max()?;
        Some((min, max))
    }

    pub fn cluster_ids(&self) -> BTreeSet<u32> {
        self.nodes.iter().map(|node| node.cluster_id).collect()
    }

    pub fn papers_in_cluster(&self, cluster_id: u32) -> Vec<PaperNode> {
        self.nodes
            .iter()
            .filter(|node| node.cluster_id == cluster_id)
            .cloned()
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClusterInsight {
    pub title: String,
    pub narrative: String,
}

impl ClusterInsight {
    pub fn paragraphs(&self) -> Vec<&str> {
        self.narrative
            .split("\n\n")
            .map(str::trim)
            .filter(|paragraph| !paragraph.is_empty())
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn test_paper(id: &str, year: i32, cluster_id: u32) -> PaperNode {
    PaperNode {
        id: id.to_owned(),
        title: format!("Paper {id}"),
        authors: vec!["A. Author".to_owned(), "B. Author".to_owned()],
        year,
        abstract_text: String::new(),
        cluster_id,
        arxiv_id: None,
        relevance_statement: String::new(),
        is_bridge: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_span_and_clusters_follow_nodes() {
        let graph = GraphData {
            nodes: vec![
                test_paper("a", 2017, 2),
                test_paper("b", 2012, 0),
                test_paper("c", 2021, 2),
            ],
            links: Vec::new(),
        };

        assert_eq!(graph.year_span(), Some((2012, 2021)));
        assert_eq!(graph.cluster_ids().into_iter().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(graph.papers_in_cluster(2).len(), 2);
        assert_eq!(GraphData::default().year_span(), None);
    }

    #[test]
    fn paragraphs_skip_blank_runs() {
        let insight = ClusterInsight {
            title: "Vision Transformers".to_owned(),
            narrative: "First paragraph.\n\n\n\nSecond paragraph.\n\n".to_owned(),
        };

        assert_eq!(
            insight.paragraphs(),
            vec!["First paragraph.", "Second paragraph."]
        );
    }

    #[test]
    fn authors_line_keeps_order() {
        assert_eq!(test_paper("a", 2020, 0).authors_line(), "A. Author, B. Author");
    }
}
