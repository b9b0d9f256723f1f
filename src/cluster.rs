//! Clusters and ordered cluster collections.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::error::Result;
use crate::tuple::Tuple;

/// A frozen centroid plus the dataset indices assigned to it.
///
/// Members are indices into the dataset the cluster was computed on, never tuple
/// references. Uniqueness of a member across clusters is the engine's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    centroid: Tuple,
    members: BTreeSet<usize>,
}

impl Cluster {
    pub fn new(centroid: Tuple) -> Self {
        Self {
            centroid,
            members: BTreeSet::new(),
        }
    }

    pub fn centroid(&self) -> &Tuple {
        &self.centroid
    }

    /// Returns `true` if `index` was not already a member.
    pub fn add_member(&mut self, index: usize) -> bool {
        self.members.insert(index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.members.contains(&index)
    }

    pub fn remove_member(&mut self, index: usize) {
        self.members.remove(&index);
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Member indices. The order carries no meaning.
    pub fn members(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    /// Size comparison that never reports `Equal`.
    ///
    /// `Less` when this cluster is strictly smaller, `Greater` otherwise, so two
    /// same-size clusters are never considered duplicates. Not a total order;
    /// `Cluster` deliberately does not implement `Ord`.
    pub fn compare(&self, other: &Cluster) -> Ordering {
        if self.size() < other.size() {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }

    /// Compact form: `Centroid=(v1 v2 ...)`.
    pub fn summary(&self) -> String {
        format!("Centroid=({})", self.centroid)
    }

    /// Detailed form listing each member's values and distance to the centroid,
    /// followed by the mean member distance.
    pub fn render(&self, dataset: &Dataset) -> Result<String> {
        let mut out = format!("Centroid=({})\nExamples:\n", self.centroid);
        for id in self.members() {
            let dist = self.centroid.distance(&dataset.tuple_at(id)?)?;
            out.push('[');
            for j in 0..dataset.attribute_count() {
                if let Some(value) = dataset.attribute_value(id, j) {
                    let _ = write!(out, "{} ", value);
                }
            }
            let _ = writeln!(out, "] dist={}", dist);
        }
        let avg = self.centroid.avg_distance(dataset, self.members())?;
        let _ = write!(out, "\nAvgDistance={}", avg);
        Ok(out)
    }
}

/// Clusters ordered by ascending size, ties kept in insertion order.
///
/// Backed by a `Vec` with positional insert so equal-size clusters all survive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Cluster>", into = "Vec<Cluster>")]
pub struct ClusterSet {
    clusters: Vec<Cluster>,
}

impl ClusterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert after every smaller or equal-size cluster.
    pub fn add(&mut self, cluster: Cluster) {
        let pos = self
            .clusters
            .partition_point(|c| cluster.compare(c) == Ordering::Greater);
        self.clusters.insert(pos, cluster);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cluster> {
        self.clusters.iter()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn clear(&mut self) {
        self.clusters.clear();
    }

    /// One `N:<summary>` line per cluster, numbered from 1.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (i, cluster) in self.clusters.iter().enumerate() {
            let _ = writeln!(out, "{}:{}", i + 1, cluster.summary());
        }
        out
    }

    /// One `N:<detailed rendering>` block per cluster, numbered from 1.
    pub fn render(&self, dataset: &Dataset) -> Result<String> {
        let mut out = String::new();
        for (i, cluster) in self.clusters.iter().enumerate() {
            let _ = writeln!(out, "{}:{}", i + 1, cluster.render(dataset)?);
        }
        Ok(out)
    }
}

impl From<Vec<Cluster>> for ClusterSet {
    fn from(clusters: Vec<Cluster>) -> Self {
        let mut set = ClusterSet::new();
        for cluster in clusters {
            set.add(cluster);
        }
        set
    }
}

impl From<ClusterSet> for Vec<Cluster> {
    fn from(set: ClusterSet) -> Self {
        set.clusters
    }
}

impl<'a> IntoIterator for &'a ClusterSet {
    type Item = &'a Cluster;
    type IntoIter = std::slice::Iter<'a, Cluster>;

    fn into_iter(self) -> Self::IntoIter {
        self.clusters.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{Attribute, Value};

    fn line_dataset() -> Dataset {
        Dataset::new(
            vec![Attribute::continuous("x", 0, 0.0, 10.0)],
            (0..5)
                .map(|i| vec![Value::Continuous(i as f64)])
                .collect(),
        )
        .unwrap()
    }

    fn cluster_with(dataset: &Dataset, centroid: usize, members: &[usize]) -> Cluster {
        let mut c = Cluster::new(dataset.tuple_at(centroid).unwrap());
        for &m in members {
            c.add_member(m);
        }
        c
    }

    #[test]
    fn test_membership() {
        let dataset = line_dataset();
        let mut c = Cluster::new(dataset.tuple_at(0).unwrap());
        assert!(c.add_member(0));
        assert!(c.add_member(3));
        assert!(!c.add_member(3));
        assert!(c.contains(3));
        assert_eq!(c.size(), 2);

        c.remove_member(3);
        c.remove_member(4);
        assert!(!c.contains(3));
        assert_eq!(c.size(), 1);
        assert_eq!(c.members().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_compare_never_equal() {
        let dataset = line_dataset();
        let small = cluster_with(&dataset, 0, &[0]);
        let a = cluster_with(&dataset, 1, &[1, 2]);
        let b = cluster_with(&dataset, 3, &[3, 4]);

        assert_eq!(small.compare(&a), Ordering::Less);
        assert_eq!(a.compare(&small), Ordering::Greater);
        assert_eq!(a.compare(&b), Ordering::Greater);
        assert_eq!(b.compare(&a), Ordering::Greater);
    }

    #[test]
    fn test_equal_size_clusters_are_kept() {
        let dataset = line_dataset();
        let mut set = ClusterSet::new();
        set.add(cluster_with(&dataset, 1, &[1, 2]));
        set.add(cluster_with(&dataset, 3, &[3, 4]));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_iteration_ascending_with_stable_ties() {
        let dataset = line_dataset();
        let mut set = ClusterSet::new();
        set.add(cluster_with(&dataset, 0, &[0, 1, 2]));
        set.add(cluster_with(&dataset, 3, &[3]));
        set.add(cluster_with(&dataset, 4, &[4]));

        let centroids: Vec<String> = set.iter().map(|c| c.centroid().to_string()).collect();
        assert_eq!(centroids, vec!["3", "4", "0"]);
    }

    #[test]
    fn test_summary_numbering() {
        let dataset = line_dataset();
        let mut set = ClusterSet::new();
        set.add(cluster_with(&dataset, 0, &[0, 1]));
        set.add(cluster_with(&dataset, 4, &[4]));
        assert_eq!(set.summary(), "1:Centroid=(4)\n2:Centroid=(0)\n");
    }

    #[test]
    fn test_render_lists_members_and_average() {
        let dataset = line_dataset();
        let c = cluster_with(&dataset, 0, &[0, 2]);
        let rendered = c.render(&dataset).unwrap();
        assert!(rendered.starts_with("Centroid=(0)\nExamples:\n"));
        assert!(rendered.contains("[0 ] dist=0\n"));
        assert!(rendered.contains("[2 ] dist=0.2\n"));
        assert!(rendered.ends_with("AvgDistance=0.1"));
    }

    #[test]
    fn test_render_empty_cluster_has_zero_average() {
        let dataset = line_dataset();
        let c = Cluster::new(dataset.tuple_at(1).unwrap());
        assert!(c.render(&dataset).unwrap().ends_with("AvgDistance=0"));
    }

    #[test]
    fn test_deserialize_restores_order() {
        let dataset = line_dataset();
        let big = cluster_with(&dataset, 0, &[0, 1, 2]);
        let small = cluster_with(&dataset, 4, &[4]);
        let json = serde_json::to_string(&vec![big, small]).unwrap();

        let set: ClusterSet = serde_json::from_str(&json).unwrap();
        let sizes: Vec<usize> = set.iter().map(Cluster::size).collect();
        assert_eq!(sizes, vec![1, 3]);
    }
}
