use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{Value, json};

use super::generator::{Generator, GeneratorError};
use super::graph::{ClusterInsight, GraphData, PaperNode};
use super::parse::{parse_graph_response, parse_insight_response};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: String) -> Result<Self, GeneratorError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    fn generate(
        &self,
        what: &'static str,
        prompt: String,
        schema: Value,
        search: bool,
    ) -> Result<String, GeneratorError> {
        let body = request_body(prompt, schema, search);

        let url = format!("{API_BASE}/{}:generateContent", self.model);
        tracing::debug!(model = %self.model, what, "sending generator request");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header("x-goog-api-key", &self.api_key)
            .body(body.to_string())
            .send()?;

        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: GenerateContentResponse =
            serde_json::from_str(&text).map_err(|error| GeneratorError::malformed(what, error))?;
        let content = envelope
            .candidates
            .into_iter()
            .find_map(|candidate| candidate.content)
            .ok_or_else(|| GeneratorError::malformed(what, "response has no candidates"))?;

        let joined = content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<String>();
        if joined.trim().is_empty() {
            return Err(GeneratorError::malformed(what, "response has no text"));
        }

        Ok(joined)
    }
}

fn request_body(prompt: String, schema: Value, search: bool) -> Value {
    let mut body = json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": schema,
        },
    });
    if search {
        body["tools"] = json!([{ "google_search": {} }]);
    }
    body
}

fn graph_prompt(topic: &str) -> String {
    format!(
        "Search for real, highly-cited research papers related to: \"{topic}\".\n\
         Create a graph of exactly 20 real papers.\n\
         For each paper:\n\
         1. Find its actual ArXiv ID (format: YYMM.NNNNN).\n\
         2. Write a concise 1-2 sentence statement (\"relevanceStatement\") explaining exactly how \
         this specific paper contributes to or connects with the user's query topic: \"{topic}\".\n\n\
         Assign each paper to one of 3 distinct clusters (clusterId 0, 1, or 2) based on sub-topics.\n\
         Identify 2-3 \"bridge papers\" that connect different clusters.\n\
         Generate links based on real citations or high conceptual similarity.\n\
         Return the result in the specified JSON format."
    )
}

fn graph_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "nodes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "title": { "type": "STRING" },
                        "authors": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "year": { "type": "INTEGER" },
                        "abstract": { "type": "STRING" },
                        "clusterId": { "type": "INTEGER" },
                        "arxivId": { "type": "STRING" },
                        "relevanceStatement": { "type": "STRING" },
                        "isBridge": { "type": "BOOLEAN" }
                    },
                    "required": ["id", "title", "authors", "year", "abstract", "clusterId", "arxivId", "relevanceStatement"]
                }
            },
            "links": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "source": { "type": "STRING" },
                        "target": { "type": "STRING" },
                        "type": { "type": "STRING", "enum": ["citation", "similarity", "dataset"] }
                    },
                    "required": ["source", "target", "type"]
                }
            }
        },
        "required": ["nodes", "links"]
    })
}

fn insight_prompt(papers: &[PaperNode]) -> String {
    let listing = papers
        .iter()
        .map(|paper| format!("- {} ({}) by {}", paper.title, paper.year, paper.authors_line()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Based on the following real papers in a specific research cluster, suggest a professional \
         subsection title for a Related Work section and write a 2-paragraph narrative connecting \
         their contributions and identifying trends.\n\nPapers:\n{listing}"
    )
}

fn insight_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "narrative": { "type": "STRING" }
        },
        "required": ["title", "narrative"]
    })
}

impl Generator for GeminiGenerator {
    fn generate_graph(&self, topic: &str) -> Result<GraphData, GeneratorError> {
        let text = self.generate("graph", graph_prompt(topic), graph_schema(), true)?;
        parse_graph_response(&text)
    }

    fn generate_insight(&self, papers: &[PaperNode]) -> Result<ClusterInsight, GeneratorError> {
        let text = self.generate("insight", insight_prompt(papers), insight_schema(), false)?;
        parse_insight_response(&text)
    }
}
