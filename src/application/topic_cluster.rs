//! Keyword co-occurrence graph
//!
//! Nodes are keywords carried by at least `min_frequency` distinct videos,
//! capped to the `max_nodes` most frequent. Edges are built against the capped
//! node set only, so pair generation stays bounded by `max_nodes²` per video.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::domain::analytics::{ClusterEdge, ClusterGraph, ClusterNode};
use crate::domain::video::VideoRecord;
use crate::infrastructure::config::ClusteringConfig;

/// Order-independent id for a keyword pair
pub fn pair_id(a: &str, b: &str) -> String {
    if a <= b { format!("{a}|{b}") } else { format!("{b}|{a}") }
}

#[derive(Default)]
struct KeywordStats<'a> {
    frequency: usize,
    niches: HashMap<&'a str, usize>,
}

impl KeywordStats<'_> {
    /// Most frequent niche; ties go to the lexicographically smallest
    fn dominant_niche(&self) -> String {
        self.niches
            .iter()
            .max_by(|(a_niche, a_count), (b_niche, b_count)| a_count.cmp(b_count).then_with(|| b_niche.cmp(a_niche)))
            .map(|(niche, _)| (*niche).to_string())
            .unwrap_or_default()
    }
}

pub struct TopicClusterBuilder {
    config: ClusteringConfig,
}

impl TopicClusterBuilder {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, videos: &[VideoRecord]) -> ClusterGraph {
        // Keywords per distinct video, de-duplicated and sorted
        let mut seen_ids = HashSet::new();
        let corpus: Vec<(&VideoRecord, BTreeSet<&str>)> = videos
            .iter()
            .filter(|video| seen_ids.insert(video.id.as_str()))
            .map(|video| {
                let keywords = video
                    .keywords
                    .iter()
                    .map(String::as_str)
                    .filter(|k| !k.trim().is_empty())
                    .collect();
                (video, keywords)
            })
            .collect();

        let mut stats: HashMap<&str, KeywordStats<'_>> = HashMap::new();
        for (video, keywords) in &corpus {
            for &keyword in keywords {
                let entry = stats.entry(keyword).or_default();
                entry.frequency += 1;
                *entry.niches.entry(video.niche.as_str()).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, &KeywordStats<'_>)> = stats
            .iter()
            .filter(|(_, s)| s.frequency >= self.config.min_frequency)
            .map(|(k, s)| (*k, s))
            .collect();
        ranked.sort_by(|(a_kw, a), (b_kw, b)| b.frequency.cmp(&a.frequency).then_with(|| a_kw.cmp(b_kw)));
        ranked.truncate(self.config.max_nodes);

        let nodes: Vec<ClusterNode> = ranked
            .iter()
            .map(|(keyword, s)| {
                let group = s.dominant_niche();
                let color = self
                    .config
                    .niche_palette
                    .get(&group)
                    .cloned()
                    .unwrap_or_else(|| self.config.default_color.clone());
                ClusterNode {
                    id: (*keyword).to_string(),
                    frequency: s.frequency,
                    size: s.frequency as f64 * self.config.node_size_scale,
                    group,
                    color,
                }
            })
            .collect();

        let frequencies: HashMap<&str, usize> = ranked.iter().map(|(k, s)| (*k, s.frequency)).collect();
        let max_frequency = ranked.first().map_or(1, |(_, s)| s.frequency.max(1)) as f64;

        let mut edges: BTreeMap<String, ClusterEdge> = BTreeMap::new();
        for (_, keywords) in &corpus {
            // BTreeSet iteration is sorted, so `a < b` for every pair below
            let matched: Vec<&str> = keywords.iter().copied().filter(|k| frequencies.contains_key(k)).collect();
            for (i, &a) in matched.iter().enumerate() {
                for &b in &matched[i + 1..] {
                    let increment = (frequencies[a] + frequencies[b]) as f64 / (2.0 * max_frequency);
                    let edge = edges.entry(pair_id(a, b)).or_insert_with(|| ClusterEdge {
                        id: pair_id(a, b),
                        source: a.to_string(),
                        target: b.to_string(),
                        co_occurrences: 0,
                        weight: 0.0,
                    });
                    edge.co_occurrences += 1;
                    edge.weight = (edge.weight + increment).min(self.config.max_edge_weight);
                }
            }
        }

        debug!(
            "Cluster graph: {} videos, {} candidate keywords, {} nodes, {} edges",
            corpus.len(),
            stats.len(),
            nodes.len(),
            edges.len()
        );

        ClusterGraph {
            nodes,
            edges: edges.into_values().collect(),
        }
    }
}
