//! Cluster membership and contig assignment tracking
//!
//! `ClusterMap` is the value handed from stage to stage. Membership can only grow through
//! `claim`, which refuses contigs that already belong to a cluster, so every contig
//! belongs to at most one cluster at all times.

use crate::error::{ReconError, Result};
use indexmap::map::Entry;
use indexmap::IndexMap;
use std::fmt;

/// Prefix of clusters synthesized during aggregation and circular splitting
pub const NOVEL_PREFIX: &str = "Novel_";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClusterId {
    /// Cluster tag of a reference plasmid
    Reference(String),
    /// Synthetic cluster with no reference support
    Novel(usize),
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterId::Reference(tag) => f.write_str(tag),
            ClusterId::Novel(k) => write!(f, "{NOVEL_PREFIX}{k}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    id: ClusterId,
    members: IndexMap<String, f64>,
}

impl Cluster {
    fn new(id: ClusterId) -> Self {
        Self {
            id,
            members: IndexMap::new(),
        }
    }

    pub fn id(&self) -> &ClusterId {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, contig_id: &str) -> bool {
        self.members.contains_key(contig_id)
    }

    /// Best bitscore recorded for a member
    pub fn score(&self, contig_id: &str) -> Option<f64> {
        self.members.get(contig_id).copied()
    }

    /// Member contig ids in claim order
    pub fn contig_ids(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, f64)> {
        self.members.iter().map(|(id, score)| (id.as_str(), *score))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClusterMap {
    clusters: IndexMap<ClusterId, Cluster>,
    assignments: IndexMap<String, ClusterId>,
    next_novel: usize,
}

impl ClusterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a cluster exists, creating it empty if needed
    pub fn open(&mut self, id: ClusterId) -> &ClusterId {
        let entry = self.clusters.entry(id.clone()).or_insert_with(|| Cluster::new(id));
        &entry.id
    }

    /// Create an empty cluster with the next `Novel_k` id.
    /// The counter only moves forward, so ids are never reused within a run.
    pub fn open_novel(&mut self) -> ClusterId {
        let id = ClusterId::Novel(self.next_novel);
        self.next_novel += 1;
        self.open(id.clone());
        id
    }

    /// Add `contig_id` to `cluster` unless it is already assigned elsewhere.
    ///
    /// Returns `Ok(true)` when the contig was claimed. Re-claiming by the owning cluster
    /// keeps the larger score and returns `Ok(false)`, as does a claim on a contig owned
    /// by another cluster.
    pub fn claim(&mut self, contig_id: &str, cluster: &ClusterId, score: f64) -> Result<bool> {
        let target = self
            .clusters
            .get_mut(cluster)
            .ok_or_else(|| ReconError::MissingCluster(cluster.to_string()))?;

        match self.assignments.entry(contig_id.to_string()) {
            Entry::Occupied(owner) => {
                if owner.get() == cluster {
                    if let Some(best) = target.members.get_mut(contig_id) {
                        if score > *best {
                            *best = score;
                        }
                    }
                }
                Ok(false)
            }
            Entry::Vacant(slot) => {
                slot.insert(cluster.clone());
                target.members.insert(contig_id.to_string(), score);
                Ok(true)
            }
        }
    }

    /// Move an assigned contig into a fresh `Novel_k` singleton, keeping its score
    pub fn split_out(&mut self, contig_id: &str) -> Result<ClusterId> {
        let owner = self
            .assignments
            .swap_remove(contig_id)
            .ok_or_else(|| ReconError::UnknownContig(contig_id.to_string()))?;
        let score = self
            .clusters
            .get_mut(&owner)
            .and_then(|cluster| cluster.members.shift_remove(contig_id))
            .ok_or_else(|| ReconError::MissingCluster(owner.to_string()))?;

        let novel = self.open_novel();
        self.claim(contig_id, &novel, score)?;
        Ok(novel)
    }

    /// Remove a cluster and release its contigs
    pub fn remove(&mut self, id: &ClusterId) -> Option<Cluster> {
        let cluster = self.clusters.shift_remove(id)?;
        for contig_id in cluster.members.keys() {
            self.assignments.swap_remove(contig_id);
        }
        Some(cluster)
    }

    /// Drop clusters that lost all their members
    pub fn remove_empty(&mut self) {
        self.clusters.retain(|_, cluster| !cluster.is_empty());
    }

    pub fn get(&self, id: &ClusterId) -> Option<&Cluster> {
        self.clusters.get(id)
    }

    pub fn cluster_of(&self, contig_id: &str) -> Option<&ClusterId> {
        self.assignments.get(contig_id)
    }

    pub fn is_assigned(&self, contig_id: &str) -> bool {
        self.assignments.contains_key(contig_id)
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn assigned_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ClusterId> {
        self.clusters.keys()
    }

    /// Next `Novel_k` index that would be handed out
    pub fn next_novel_index(&self) -> usize {
        self.next_novel
    }

    pub fn into_clusters(self) -> impl Iterator<Item = Cluster> {
        self.clusters.into_values()
    }
}
