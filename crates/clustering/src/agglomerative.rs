use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::ClusterError;

/// How the distance between two clusters is derived from member distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    #[default]
    Average,
    Complete,
    Single,
}

impl Linkage {
    /// Lance-Williams update: distance from the merged cluster (a ∪ b) to k.
    fn merged_distance(self, d_ak: f64, d_bk: f64, size_a: usize, size_b: usize) -> f64 {
        match self {
            Linkage::Single => d_ak.min(d_bk),
            Linkage::Complete => d_ak.max(d_bk),
            Linkage::Average => {
                (size_a as f64 * d_ak + size_b as f64 * d_bk) / (size_a + size_b) as f64
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
}

impl DistanceMetric {
    pub fn distance(self, a: &[f32], b: &[f32]) -> f64 {
        if a == b {
            return 0.0;
        }
        match self {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = *x as f64 - *y as f64;
                    d * d
                })
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Cosine => {
                let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
                let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
                let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

                if norm_a == 0.0 && norm_b == 0.0 {
                    0.0
                } else if norm_a == 0.0 || norm_b == 0.0 {
                    1.0
                } else {
                    (1.0 - dot / (norm_a * norm_b)).clamp(0.0, 2.0)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    pub distance_threshold: f64, // e.g., 0.25
    pub linkage: Linkage,
    pub metric: DistanceMetric,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            distance_threshold: 0.25,
            linkage: Linkage::Average,
            metric: DistanceMetric::Cosine,
        }
    }
}

/// Bottom-up clustering that keeps merging the closest pair of clusters until
/// the closest pair is farther apart than the distance threshold.
pub struct AgglomerativeClusterer {
    params: ClusterParams,
}

impl AgglomerativeClusterer {
    pub fn new(params: ClusterParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    /// Assign a cluster label to every vector.
    ///
    /// Labels are dense and numbered by first occurrence: the first vector is
    /// always in cluster 0, the first vector not in cluster 0 starts cluster 1,
    /// and so on.
    pub fn cluster(&self, vectors: &[Vec<f32>]) -> Result<Vec<usize>, ClusterError> {
        self.validate(vectors)?;

        let n = vectors.len();
        let threshold = self.params.distance_threshold;

        let mut dist = vec![vec![0.0f64; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = self.params.metric.distance(&vectors[i], &vectors[j]);
                dist[i][j] = d;
                dist[j][i] = d;
            }
        }

        // A cluster is identified by its lowest member index, so merging j into i (i < j)
        // keeps identifiers in first-occurrence order.
        let mut active = vec![true; n];
        let mut sizes = vec![1usize; n];
        let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        let mut merges = 0;

        loop {
            let mut closest: Option<(usize, usize, f64)> = None;
            for i in (0..n).filter(|&i| active[i]) {
                for j in ((i + 1)..n).filter(|&j| active[j]) {
                    if closest.is_none_or(|(_, _, best)| dist[i][j] < best) {
                        closest = Some((i, j, dist[i][j]));
                    }
                }
            }

            let Some((a, b, d)) = closest else { break };
            if d > threshold {
                break;
            }

            for k in (0..n).filter(|&k| active[k] && k != a && k != b) {
                let merged = self.params.linkage.merged_distance(dist[a][k], dist[b][k], sizes[a], sizes[b]);
                dist[a][k] = merged;
                dist[k][a] = merged;
            }

            sizes[a] += sizes[b];
            active[b] = false;
            let moved = std::mem::take(&mut members[b]);
            members[a].extend(moved);
            merges += 1;
        }

        let mut labels = vec![0usize; n];
        for (label, root) in (0..n).filter(|&i| active[i]).enumerate() {
            for &member in &members[root] {
                labels[member] = label;
            }
        }

        debug!(
            phrases = n,
            clusters = n - merges,
            threshold,
            linkage = ?self.params.linkage,
            "Agglomerative clustering finished"
        );

        Ok(labels)
    }

    fn validate(&self, vectors: &[Vec<f32>]) -> Result<(), ClusterError> {
        let threshold = self.params.distance_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ClusterError::invalid(format!(
                "distance threshold must be a non-negative number, got {}",
                threshold
            )));
        }

        let Some(first) = vectors.first() else {
            return Err(ClusterError::invalid("cannot cluster an empty phrase list"));
        };

        let dim = first.len();
        if dim == 0 {
            return Err(ClusterError::invalid("vectors must have at least one dimension"));
        }

        for (idx, vector) in vectors.iter().enumerate() {
            if vector.len() != dim {
                return Err(ClusterError::invalid(format!(
                    "vector {} has dimension {}, expected {}",
                    idx,
                    vector.len(),
                    dim
                )));
            }
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(ClusterError::invalid(format!(
                    "vector {} contains a non-finite component",
                    idx
                )));
            }
        }

        Ok(())
    }
}

/// Collect member phrases per label, in label order. Members keep their
/// original occurrence order.
pub fn group_by_label(
    phrases: &[String],
    labels: &[usize],
) -> Result<Vec<(usize, Vec<String>)>, ClusterError> {
    if phrases.len() != labels.len() {
        return Err(ClusterError::invalid(format!(
            "{} phrases but {} labels",
            phrases.len(),
            labels.len()
        )));
    }

    let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for (phrase, &label) in phrases.iter().zip(labels) {
        groups.entry(label)
            .or_insert_with(Vec::new)
            .push(phrase.clone());
    }

    Ok(groups.into_iter().collect())
}
