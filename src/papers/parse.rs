use std::collections::HashSet;

use serde::de::DeserializeOwned;

use super::generator::GeneratorError;
use super::graph::{ClusterInsight, GraphData};

pub(super) fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let rest = match rest.split_once('\n') {
        Some((tag, body)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => body,
        _ => rest
            .get(..4)
            .filter(|tag| tag.eq_ignore_ascii_case("json"))
            .map_or(rest, |_| &rest[4..]),
    };
    let rest = rest.trim_end().strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

fn parse_strict<T: DeserializeOwned>(what: &'static str, raw: &str) -> Result<T, GeneratorError> {
    serde_json::from_str(strip_code_fence(raw))
        .map_err(|error| GeneratorError::malformed(what, error))
}

pub fn parse_graph_response(raw: &str) -> Result<GraphData, GeneratorError> {
    let graph: GraphData = parse_strict("graph", raw)?;

    let mut seen = HashSet::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        if node.id.trim().is_empty() {
            return Err(GeneratorError::malformed("graph", "paper with empty id"));
        }
        if !seen.insert(node.id.as_str()) {
            return Err(GeneratorError::malformed(
                "graph",
                format!("duplicate paper id {:?}", node.id),
            ));
        }
    }

    Ok(graph)
}

pub fn parse_insight_response(raw: &str) -> Result<ClusterInsight, GeneratorError> {
    parse_strict("insight", raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::papers::LinkKind;

    const GRAPH: &str = r#"{
        "nodes": [
            {"id": "vit", "title": "An Image is Worth 16x16 Words", "authors": ["Dosovitskiy"],
             "year": 2020, "abstract": "...", "clusterId": 0, "arxivId": "2010.11929",
             "relevanceStatement": "Introduces ViT.", "isBridge": true, "extra": 1},
            {"id": "detr", "title": "End-to-End Object Detection", "authors": ["Carion", "Massa"],
             "year": 2020, "abstract": "...", "clusterId": 1, "arxivId": null,
             "relevanceStatement": "Detection with transformers."}
        ],
        "links": [{"source": "vit", "target": "detr", "type": "similarity"}]
    }"#;

    #[test]
    fn parses_graph_and_ignores_extra_fields() {
        let graph = parse_graph_response(GRAPH).unwrap();

        assert_eq!(graph.node_count(), 2);
        assert!(graph.nodes[0].is_bridge);
        assert!(!graph.nodes[1].is_bridge);
        assert_eq!(graph.nodes[0].arxiv_id.as_deref(), Some("2010.11929"));
        assert_eq!(graph.nodes[1].arxiv_id, None);
        assert_eq!(graph.links[0].kind, LinkKind::Similarity);
    }

    #[test]
    fn strips_markdown_fence() {
        let fenced = format!("```json\n{GRAPH}\n```");
        assert_eq!(parse_graph_response(&fenced).unwrap().node_count(), 2);
    }

    #[test]
    fn fence_tag_is_case_insensitive() {
        for tag in ["JSON", "Json", "", "jsonc"] {
            let fenced = format!("```{tag}\n{GRAPH}\n```");
            assert_eq!(parse_graph_response(&fenced).unwrap().node_count(), 2, "tag {tag:?}");
        }

        let inline = r#"```JSON {"title": "Backbones", "narrative": "One."}```"#;
        assert_eq!(parse_insight_response(inline).unwrap().title, "Backbones");
    }

    #[test]
    fn missing_nodes_key_is_malformed() {
        let error = parse_graph_response(r#"{"links": []}"#).unwrap_err();
        assert!(error.is_malformed());
    }

    #[test]
    fn missing_required_paper_field_is_malformed() {
        let raw = GRAPH.replace(r#""arxivId": null,"#, "");
        assert!(parse_graph_response(&raw).unwrap_err().is_malformed());
    }

    #[test]
    fn unknown_link_type_is_malformed() {
        let raw = GRAPH.replace("similarity", "coauthor");
        assert!(parse_graph_response(&raw).unwrap_err().is_malformed());
    }

    #[test]
    fn duplicate_ids_are_malformed() {
        let raw = GRAPH.replace(r#""id": "detr""#, r#""id": "vit""#);
        let error = parse_graph_response(&raw).unwrap_err();
        assert!(error.to_string().contains("duplicate paper id"));
    }

    #[test]
    fn dangling_links_survive_parsing() {
        let raw = GRAPH.replace(r#""target": "detr""#, r#""target": "ghost""#);
        assert_eq!(parse_graph_response(&raw).unwrap().link_count(), 1);
    }

    #[test]
    fn parses_insight() {
        let insight =
            parse_insight_response(r#"{"title": "Backbones", "narrative": "One.\n\nTwo."}"#)
                .unwrap();
        assert_eq!(insight.title, "Backbones");
        assert!(parse_insight_response(r#"{"title": "Backbones"}"#).is_err());
        assert!(parse_insight_response("not json").is_err());
    }
}
