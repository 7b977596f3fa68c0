use std::collections::HashMap;
use std::sync::Arc;

use crate::app::filter::{FilterCache, FilterState};
use crate::papers::{ClusterInsight, GeneratorError, GraphData, PaperNode};

const GRAPH_FAILURE_MESSAGE: &str =
    "Failed to generate graph. Please check your API key and try again.";
const INSIGHT_FAILURE_MESSAGE: &str = "Failed to generate cluster insights.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) struct RequestToken {
    epoch: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) struct InsightToken {
    graph_epoch: u64,
    cluster_id: u32,
    serial: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum RequestOutcome {
    Applied,
    Failed,
    Stale,
}

struct PendingGraph {
    token: RequestToken,
    topic: String,
}

pub(in crate::app) struct Session {
    graph: Arc<GraphData>,
    active_topic: String,
    graph_epoch: u64,
    next_epoch: u64,
    pending_graph: Option<PendingGraph>,
    filter: FilterState,
    filter_cache: FilterCache,
    selected_paper: Option<String>,
    selected_cluster: Option<u32>,
    insights: HashMap<u32, ClusterInsight>,
    pending_insight: Option<InsightToken>,
    insight_serial: u64,
    error: Option<String>,
}

impl Session {
    pub(in crate::app) fn new() -> Self {
        let graph = Arc::new(GraphData::default());
        let filter = FilterState::for_graph(&graph);
        Self {
            graph,
            active_topic: String::new(),
            graph_epoch: 0,
            next_epoch: 1,
            pending_graph: None,
            filter,
            filter_cache: FilterCache::default(),
            selected_paper: None,
            selected_cluster: None,
            insights: HashMap::new(),
            pending_insight: None,
            insight_serial: 0,
            error: None,
        }
    }

    pub(in crate::app) fn graph(&self) -> &Arc<GraphData> {
        &self.graph
    }

    pub(in crate::app) fn active_topic(&self) -> &str {
        &self.active_topic
    }

    pub(in crate::app) fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(in crate::app) fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub(in crate::app) fn is_loading(&self) -> bool {
        self.pending_graph.is_some()
    }

    pub(in crate::app) fn begin_graph_request(&mut self, topic: &str) -> Option<RequestToken> {
        let topic = topic.trim();
        if topic.is_empty() {
            return None;
        }

        let token = RequestToken {
            epoch: self.next_epoch,
        };
        self.next_epoch += 1;
        if let Some(previous) = self.pending_graph.replace(PendingGraph {
            token,
            topic: topic.to_owned(),
        }) {
            tracing::debug!(
                epoch = previous.token.epoch,
                topic = %previous.topic,
                "graph request superseded"
            );
        }
        self.error = None;

        tracing::info!(epoch = token.epoch, topic, "graph requested");
        Some(token)
    }

    pub(in crate::app) fn finish_graph_request(
        &mut self,
        token: RequestToken,
        result: Result<GraphData, GeneratorError>,
    ) -> RequestOutcome {
        let Some(pending) = self
            .pending_graph
            .take_if(|pending| pending.token == token)
        else {
            tracing::debug!(epoch = token.epoch, "dropping stale graph response");
            return RequestOutcome::Stale;
        };

        match result {
            Ok(graph) => {
                tracing::info!(
                    epoch = token.epoch,
                    topic = %pending.topic,
                    nodes = graph.node_count(),
                    links = graph.link_count(),
                    "graph applied"
                );
                self.filter = FilterState::for_graph(&graph);
                self.filter_cache.clear();
                self.graph = Arc::new(graph);
                self.graph_epoch = token.epoch;
                self.active_topic = pending.topic;
                self.selected_paper = None;
                self.selected_cluster = None;
                self.insights.clear();
                self.pending_insight = None;
                RequestOutcome::Applied
            }
            Err(error) => {
                tracing::warn!(
                    epoch = token.epoch,
                    malformed = error.is_malformed(),
                    %error,
                    "graph request failed"
                );
                self.error = Some(GRAPH_FAILURE_MESSAGE.to_owned());
                RequestOutcome::Failed
            }
        }
    }

    pub(in crate::app) fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub(in crate::app) fn filter_mut(&mut self) -> &mut FilterState {
        &mut self.filter
    }

    pub(in crate::app) fn visible_graph(&mut self) -> Arc<GraphData> {
        self.filter_cache.apply(&self.graph, &self.filter)
    }

    pub(in crate::app) fn selected_paper(&self) -> Option<&PaperNode> {
        self.selected_paper
            .as_deref()
            .and_then(|id| self.graph.node(id))
    }

    pub(in crate::app) fn selected_cluster(&self) -> Option<u32> {
        self.selected_cluster
    }

    pub(in crate::app) fn select_paper(&mut self, id: &str) {
        if self.graph.node(id).is_some() {
            self.selected_paper = Some(id.to_owned());
        }
    }

    pub(in crate::app) fn select_cluster(&mut self, cluster_id: u32) {
        self.selected_cluster = Some(cluster_id);
    }

    pub(in crate::app) fn deselect_cluster(&mut self) {
        if let Some(cluster_id) = self.selected_cluster.take() {
            tracing::debug!(cluster_id, "cluster deselected");
        }
    }

    pub(in crate::app) fn insight(&self, cluster_id: u32) -> Option<&ClusterInsight> {
        self.insights.get(&cluster_id)
    }

    pub(in crate::app) fn is_insight_loading(&self, cluster_id: u32) -> bool {
        self.pending_insight
            .is_some_and(|token| token.cluster_id == cluster_id)
    }

    pub(in crate::app) fn begin_insight_request(
        &mut self,
        cluster_id: u32,
    ) -> Option<(InsightToken, Vec<PaperNode>)> {
        if self.insights.contains_key(&cluster_id) {
            return None;
        }

        let papers = self.graph.papers_in_cluster(cluster_id);
        if papers.is_empty() {
            tracing::debug!(cluster_id, "no papers for insight request");
            return None;
        }

        self.insight_serial += 1;
        let token = InsightToken {
            graph_epoch: self.graph_epoch,
            cluster_id,
            serial: self.insight_serial,
        };
        self.pending_insight = Some(token);

        tracing::info!(cluster_id, papers = papers.len(), "cluster insight requested");
        Some((token, papers))
    }

    pub(in crate::app) fn regenerate_insight(
        &mut self,
        cluster_id: u32,
    ) -> Option<(InsightToken, Vec<PaperNode>)> {
        self.insights.remove(&cluster_id);
        self.begin_insight_request(cluster_id)
    }

    pub(in crate::app) fn finish_insight_request(
        &mut self,
        token: InsightToken,
        result: Result<ClusterInsight, GeneratorError>,
    ) -> RequestOutcome {
        if token.graph_epoch != self.graph_epoch || self.pending_insight != Some(token) {
            tracing::debug!(
                cluster_id = token.cluster_id,
                serial = token.serial,
                "dropping stale insight response"
            );
            return RequestOutcome::Stale;
        }
        self.pending_insight = None;

        match result {
            Ok(insight) => {
                tracing::info!(
                    cluster_id = token.cluster_id,
                    title = %insight.title,
                    "cluster insight ready"
                );
                self.insights.insert(token.cluster_id, insight);
                RequestOutcome::Applied
            }
            Err(error) => {
                tracing::warn!(cluster_id = token.cluster_id, %error, "insight request failed");
                self.error = Some(INSIGHT_FAILURE_MESSAGE.to_owned());
                RequestOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::papers::{Link, LinkKind, test_paper};

    fn graph(ids: &[(&str, u32)]) -> GraphData {
        GraphData {
            nodes: ids
                .iter()
                .map(|(id, cluster_id)| test_paper(id, 2020, *cluster_id))
                .collect(),
            links: Vec::new(),
        }
    }

    fn insight(title: &str) -> ClusterInsight {
        ClusterInsight {
            title: title.to_owned(),
            narrative: "One.\n\nTwo.".to_owned(),
        }
    }

    fn malformed() -> GeneratorError {
        GeneratorError::MalformedResponse {
            what: "graph",
            reason: "missing field `nodes`".to_owned(),
        }
    }

    #[test]
    fn blank_topic_does_not_start_a_request() {
        let mut session = Session::new();
        assert!(session.begin_graph_request("   ").is_none());
        assert!(!session.is_loading());
    }

    #[test]
    fn late_response_of_superseded_request_is_discarded() {
        let mut session = Session::new();
        let a = session.begin_graph_request("topic a").unwrap();
        let b = session.begin_graph_request("topic b").unwrap();

        let outcome = session.finish_graph_request(b, Ok(graph(&[("b1", 0), ("b2", 1)])));
        assert_eq!(outcome, RequestOutcome::Applied);
        assert_eq!(session.active_topic(), "topic b");

        let outcome = session.finish_graph_request(a, Ok(graph(&[("a1", 0)])));
        assert_eq!(outcome, RequestOutcome::Stale);
        assert_eq!(session.active_topic(), "topic b");
        assert!(session.graph().node("b1").is_some());
        assert!(session.graph().node("a1").is_none());
        assert!(!session.is_loading());
    }

    #[test]
    fn malformed_response_keeps_prior_graph_and_sets_error() {
        let mut session = Session::new();
        let first = session.begin_graph_request("first").unwrap();
        session.finish_graph_request(first, Ok(graph(&[("a", 0), ("b", 0)])));
        session.select_paper("a");
        let prior = Arc::clone(session.graph());

        let second = session.begin_graph_request("second").unwrap();
        assert!(session.is_loading());
        assert_eq!(
            session.finish_graph_request(second, Err(malformed())),
            RequestOutcome::Failed
        );

        assert!(Arc::ptr_eq(&prior, session.graph()));
        assert_eq!(session.active_topic(), "first");
        assert_eq!(session.selected_paper().map(|paper| paper.id.as_str()), Some("a"));
        assert_eq!(session.error(), Some(GRAPH_FAILURE_MESSAGE));
        assert!(!session.is_loading());

        let retry = session.begin_graph_request("second").unwrap();
        assert!(session.error().is_none());
        assert_eq!(
            session.finish_graph_request(retry, Ok(graph(&[("c", 1)]))),
            RequestOutcome::Applied
        );
        assert!(session.selected_paper().is_none());
    }

    #[test]
    fn new_graph_resets_filters_to_its_contents() {
        let mut session = Session::new();
        let token = session.begin_graph_request("topic").unwrap();
        let mut data = graph(&[("a", 0), ("b", 3)]);
        data.nodes[0].year = 2012;
        data.nodes[1].year = 2019;
        data.links.push(Link {
            source: "a".to_owned(),
            target: "b".to_owned(),
            kind: LinkKind::Similarity,
        });
        session.finish_graph_request(token, Ok(data));

        let range = session.filter().year_range();
        assert_eq!((range.min, range.max), (2012, 2019));
        assert!(session.filter().is_cluster_visible(3));

        session.filter_mut().toggle_cluster(3);
        let visible = session.visible_graph();
        assert_eq!(visible.node_count(), 1);
        assert_eq!(visible.link_count(), 0);
    }

    #[test]
    fn insight_is_cached_until_regenerated_or_graph_changes() {
        let mut session = Session::new();
        let token = session.begin_graph_request("topic").unwrap();
        session.finish_graph_request(token, Ok(graph(&[("a", 0), ("b", 0), ("c", 1)])));

        let (request, papers) = session.begin_insight_request(0).unwrap();
        assert_eq!(papers.len(), 2);
        assert!(session.is_insight_loading(0));
        assert_eq!(
            session.finish_insight_request(request, Ok(insight("first"))),
            RequestOutcome::Applied
        );
        assert_eq!(session.insight(0).map(|i| i.title.as_str()), Some("first"));
        assert!(session.begin_insight_request(0).is_none());

        let (request, _) = session.regenerate_insight(0).unwrap();
        assert!(session.insight(0).is_none());
        session.finish_insight_request(request, Ok(insight("second")));
        assert_eq!(session.insight(0).map(|i| i.title.as_str()), Some("second"));

        let token = session.begin_graph_request("other").unwrap();
        session.finish_graph_request(token, Ok(graph(&[("x", 0)])));
        assert!(session.insight(0).is_none());
    }

    #[test]
    fn insight_for_replaced_graph_is_stale() {
        let mut session = Session::new();
        let token = session.begin_graph_request("topic").unwrap();
        session.finish_graph_request(token, Ok(graph(&[("a", 0)])));
        let (request, _) = session.begin_insight_request(0).unwrap();

        let token = session.begin_graph_request("next").unwrap();
        session.finish_graph_request(token, Ok(graph(&[("b", 0)])));

        assert_eq!(
            session.finish_insight_request(request, Ok(insight("late"))),
            RequestOutcome::Stale
        );
        assert!(session.insight(0).is_none());
    }

    #[test]
    fn newer_insight_request_supersedes_older_one() {
        let mut session = Session::new();
        let token = session.begin_graph_request("topic").unwrap();
        session.finish_graph_request(token, Ok(graph(&[("a", 0), ("b", 1)])));

        let (first, _) = session.begin_insight_request(0).unwrap();
        let (second, _) = session.begin_insight_request(1).unwrap();
        assert!(!session.is_insight_loading(0));

        assert_eq!(
            session.finish_insight_request(first, Ok(insight("zero"))),
            RequestOutcome::Stale
        );
        assert_eq!(
            session.finish_insight_request(second, Err(malformed())),
            RequestOutcome::Failed
        );
        assert_eq!(session.error(), Some(INSIGHT_FAILURE_MESSAGE));
        assert!(session.insight(1).is_none());
    }

    #[test]
    fn background_click_keeps_paper_details_open() {
        let mut session = Session::new();
        let token = session.begin_graph_request("topic").unwrap();
        session.finish_graph_request(token, Ok(graph(&[("a", 0)])));

        session.select_paper("missing");
        assert!(session.selected_paper().is_none());

        session.select_paper("a");
        session.select_cluster(0);
        session.deselect_cluster();
        assert_eq!(session.selected_paper().map(|paper| paper.id.as_str()), Some("a"));
        assert_eq!(session.selected_cluster(), None);

        session.deselect_cluster();
        assert_eq!(session.selected_cluster(), None);
    }
}
