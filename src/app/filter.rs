use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::papers::GraphData;

const EMPTY_GRAPH_YEARS: YearRange = YearRange {
    min: 2010,
    max: 2025,
};
const EMPTY_GRAPH_CLUSTERS: [u32; 3] = [0, 1, 2];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(in crate::app) struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub(in crate::app) fn contains(self, year: i32) -> bool {
        self.min <= year && year <= self.max
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) struct FilterState {
    year_range: YearRange,
    visible_clusters: BTreeSet<u32>,
}

impl FilterState {
    pub(in crate::app) fn for_graph(graph: &GraphData) -> Self {
        let year_range = graph
            .year_span()
            .map_or(EMPTY_GRAPH_YEARS, |(min, max)| YearRange { min, max });
        let mut visible_clusters = graph.cluster_ids();
        if visible_clusters.is_empty() {
            visible_clusters.extend(EMPTY_GRAPH_CLUSTERS);
        }

        Self {
            year_range,
            visible_clusters,
        }
    }

    pub(in crate::app) fn year_range(&self) -> YearRange {
        self.year_range
    }

    pub(in crate::app) fn visible_clusters(&self) -> &BTreeSet<u32> {
        &self.visible_clusters
    }

    pub(in crate::app) fn is_cluster_visible(&self, cluster_id: u32) -> bool {
        self.visible_clusters.contains(&cluster_id)
    }

    pub(in crate::app) fn set_min_year(&mut self, year: i32) {
        self.year_range.min = year;
        self.year_range.max = self.year_range.max.max(year);
    }

    pub(in crate::app) fn set_max_year(&mut self, year: i32) {
        self.year_range.max = year;
        self.year_range.min = self.year_range.min.min(year);
    }

    pub(in crate::app) fn toggle_cluster(&mut self, cluster_id: u32) -> bool {
        if self.visible_clusters.contains(&cluster_id) {
            if self.visible_clusters.len() == 1 {
                tracing::debug!(cluster_id, "refusing to hide the last visible cluster");
                return false;
            }
            self.visible_clusters.remove(&cluster_id);
        } else {
            self.visible_clusters.insert(cluster_id);
        }
        true
    }

    fn admits(&self, year: i32, cluster_id: u32) -> bool {
        self.year_range.contains(year) && self.visible_clusters.contains(&cluster_id)
    }
}

/// Derives the visible subgraph. Node and link order follow `graph`, and no
/// link of the result names a node outside it.
pub(in crate::app) fn filter_graph(graph: &GraphData, state: &FilterState) -> GraphData {
    let nodes = graph
        .nodes
        .iter()
        .filter(|node| state.admits(node.year, node.cluster_id))
        .cloned()
        .collect::<Vec<_>>();

    let passing = nodes
        .iter()
        .map(|node| node.id.as_str())
        .collect::<HashSet<_>>();
    let links = graph
        .links
        .iter()
        .filter(|link| {
            passing.contains(link.source.as_str()) && passing.contains(link.target.as_str())
        })
        .cloned()
        .collect();

    GraphData { nodes, links }
}

struct CachedFilter {
    source: Arc<GraphData>,
    state: FilterState,
    output: Arc<GraphData>,
}

#[derive(Default)]
pub(in crate::app) struct FilterCache {
    last: Option<CachedFilter>,
}

impl FilterCache {
    pub(in crate::app) fn apply(
        &mut self,
        graph: &Arc<GraphData>,
        state: &FilterState,
    ) -> Arc<GraphData> {
        if let Some(last) = &self.last
            && Arc::ptr_eq(&last.source, graph)
            && &last.state == state
        {
            return Arc::clone(&last.output);
        }

        let filtered = filter_graph(graph, state);
        let output = match &self.last {
            Some(last) if *last.output == filtered => Arc::clone(&last.output),
            _ => Arc::new(filtered),
        };

        tracing::debug!(
            nodes = output.node_count(),
            links = output.link_count(),
            "filtered view recomputed"
        );

        self.last = Some(CachedFilter {
            source: Arc::clone(graph),
            state: state.clone(),
            output: Arc::clone(&output),
        });
        output
    }

    pub(in crate::app) fn clear(&mut self) {
        self.last = None;
    }
}
