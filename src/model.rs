//! Quality-Threshold clustering engine

use std::path::Path;

use tracing::debug;

use crate::cluster::{Cluster, ClusterSet};
use crate::data::Dataset;
use crate::error::{Error, Result};
use crate::storage;
use crate::tuple::Tuple;

/// QT clustering engine with a fixed radius and the last computed partition.
///
/// Centroids are chosen among the examples and never re-estimated.
#[derive(Debug, Clone)]
pub struct QtMiner {
    /// `None` for engines restored from storage.
    radius: Option<f64>,
    clusters: ClusterSet,
}

impl QtMiner {
    /// Create an engine for `radius`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] if the radius is NaN or negative.
    pub fn new(radius: f64) -> Result<Self> {
        if radius.is_nan() || radius < 0.0 {
            return Err(Error::InvalidParameter {
                name: "radius",
                message: format!("must be a non-negative number, got {}", radius),
            });
        }
        Ok(Self {
            radius: Some(radius),
            clusters: ClusterSet::new(),
        })
    }

    /// Restore an engine from a result file written by [`QtMiner::save`].
    ///
    /// The restored engine has no radius: it can be rendered and saved again,
    /// but [`QtMiner::compute`] fails with [`Error::RadiusUnset`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            radius: None,
            clusters: storage::read_clusters(path.as_ref())?,
        })
    }

    /// Write the current clusters to `path`. The radius is not stored.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        storage::write_clusters(path.as_ref(), &self.clusters)
    }

    pub fn radius(&self) -> Option<f64> {
        self.radius
    }

    pub fn clusters(&self) -> &ClusterSet {
        &self.clusters
    }

    /// Partition `dataset` and return the number of clusters.
    ///
    /// Each round builds one candidate cluster around every unassigned example and
    /// commits the largest; the first candidate found wins ties. Every example ends
    /// up in exactly one cluster. Any previous result is discarded.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyDataset`] if the dataset has no examples
    /// - [`Error::RadiusUnset`] on an engine restored from storage
    /// - [`Error::ClusteringRadius`] if more than one example ended up in a single cluster
    pub fn compute(&mut self, dataset: &Dataset) -> Result<usize> {
        if dataset.is_empty() {
            return Err(Error::EmptyDataset);
        }
        let radius = self.radius.ok_or(Error::RadiusUnset)?;

        let n = dataset.example_count();
        let tuples = (0..n)
            .map(|i| dataset.tuple_at(i))
            .collect::<Result<Vec<Tuple>>>()?;

        self.clusters.clear();
        let mut assigned = vec![false; n];
        let mut assigned_count = 0;
        let mut rounds = 0;

        while assigned_count < n {
            let best = best_candidate(&tuples, &assigned, radius)?;
            for id in best.members() {
                assigned[id] = true;
            }
            assigned_count += best.size();
            rounds += 1;
            debug!(
                "Round {}: committed cluster of {} ({} / {} assigned)",
                rounds,
                best.size(),
                assigned_count,
                n
            );
            self.clusters.add(best);
        }

        let n_clusters = self.clusters.len();
        if n_clusters == 1 && n > 1 {
            return Err(Error::ClusteringRadius { radius, n_items: n });
        }
        Ok(n_clusters)
    }
}

/// Build a candidate around every unassigned example and return the largest.
///
/// Candidates are kept as index lists; only the winner becomes a [`Cluster`].
/// Only called while at least one example is unassigned.
fn best_candidate(tuples: &[Tuple], assigned: &[bool], radius: f64) -> Result<Cluster> {
    let mut best: Option<(usize, Vec<usize>)> = None;

    for (i, centroid) in tuples.iter().enumerate() {
        if assigned[i] {
            continue;
        }
        let mut members = vec![i];
        for (j, other) in tuples.iter().enumerate() {
            if i == j || assigned[j] {
                continue;
            }
            if centroid.distance(other)? <= radius {
                members.push(j);
            }
        }

        let larger = best
            .as_ref()
            .map_or(true, |(_, b)| members.len() > b.len());
        if larger {
            best = Some((i, members));
        }
    }

    // Unreachable while the caller keeps its loop invariant.
    let (centroid, members) = best.ok_or(Error::EmptyDataset)?;
    let mut cluster = Cluster::new(tuples[centroid].clone());
    for id in members {
        cluster.add_member(id);
    }
    Ok(cluster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{Attribute, Value};
    use std::collections::BTreeSet;

    /// Five 2-D points forming two visual groups, both axes over `[0, 10]`.
    fn two_groups() -> Dataset {
        let points = [(1.0, 1.0), (1.5, 2.0), (3.0, 4.0), (8.0, 7.0), (7.0, 8.0)];
        Dataset::new(
            vec![
                Attribute::continuous("x", 0, 0.0, 10.0),
                Attribute::continuous("y", 1, 0.0, 10.0),
            ],
            points
                .iter()
                .map(|&(x, y)| vec![Value::Continuous(x), Value::Continuous(y)])
                .collect(),
        )
        .unwrap()
    }

    fn membership(miner: &QtMiner) -> Vec<BTreeSet<usize>> {
        miner
            .clusters()
            .iter()
            .map(|c| c.members().collect())
            .collect()
    }

    #[test]
    fn test_two_cluster_scenario() {
        let dataset = two_groups();
        let mut miner = QtMiner::new(0.6).unwrap();

        let n = miner.compute(&dataset).unwrap();
        assert_eq!(n, 2);
        assert_eq!(
            membership(&miner),
            vec![
                [3, 4].into_iter().collect::<BTreeSet<_>>(),
                [0, 1, 2].into_iter().collect::<BTreeSet<_>>(),
            ]
        );
    }

    #[test]
    fn test_partition_covers_every_example_once() {
        let dataset = two_groups();
        for radius in [0.0, 0.1, 0.3, 0.6] {
            let mut miner = QtMiner::new(radius).unwrap();
            let n = miner.compute(&dataset).unwrap();
            assert!(n <= dataset.example_count());

            let mut seen = vec![0; dataset.example_count()];
            for cluster in miner.clusters() {
                for id in cluster.members() {
                    seen[id] += 1;
                }
            }
            assert!(seen.iter().all(|&count| count == 1), "radius {}", radius);
        }
    }

    #[test]
    fn test_zero_radius_gives_singletons() {
        let dataset = two_groups();
        let mut miner = QtMiner::new(0.0).unwrap();
        assert_eq!(miner.compute(&dataset).unwrap(), 5);
        assert!(miner.clusters().iter().all(|c| c.size() == 1));
    }

    #[test]
    fn test_degenerate_radius() {
        let dataset = two_groups();
        let mut miner = QtMiner::new(10.0).unwrap();
        let err = miner.compute(&dataset).unwrap_err();
        assert!(matches!(err, Error::ClusteringRadius { n_items: 5, .. }));
        // The partition is completed before the check.
        assert_eq!(miner.clusters().len(), 1);
        assert_eq!(miner.clusters().iter().next().unwrap().size(), 5);
    }

    #[test]
    fn test_single_example_is_not_degenerate() {
        let dataset = Dataset::new(
            vec![Attribute::continuous("x", 0, 0.0, 1.0)],
            vec![vec![Value::Continuous(0.5)]],
        )
        .unwrap();
        let mut miner = QtMiner::new(5.0).unwrap();
        assert_eq!(miner.compute(&dataset).unwrap(), 1);
    }

    #[test]
    fn test_empty_dataset() {
        let dataset = Dataset::new(vec![Attribute::continuous("x", 0, 0.0, 1.0)], vec![]).unwrap();
        let mut miner = QtMiner::new(0.5).unwrap();
        assert!(matches!(miner.compute(&dataset), Err(Error::EmptyDataset)));
    }

    #[test]
    fn test_first_candidate_wins_ties() {
        // 0 and 1 are close, 2 and 3 are close: both candidates have size 2.
        let dataset = Dataset::new(
            vec![Attribute::continuous("x", 0, 0.0, 10.0)],
            [0.0, 0.5, 9.0, 9.5]
                .iter()
                .map(|&x| vec![Value::Continuous(x)])
                .collect(),
        )
        .unwrap();
        let mut miner = QtMiner::new(0.1).unwrap();
        assert_eq!(miner.compute(&dataset).unwrap(), 2);

        let centroids: Vec<String> = miner
            .clusters()
            .iter()
            .map(|c| c.centroid().to_string())
            .collect();
        // Equal sizes iterate in commit order: the round-one winner is centred on 0.
        assert_eq!(centroids, vec!["0", "9"]);
    }

    #[test]
    fn test_best_candidate_skips_assigned_examples() {
        let dataset = two_groups();
        let tuples: Vec<Tuple> = (0..5).map(|i| dataset.tuple_at(i).unwrap()).collect();

        // 0, 1 and 2 each reach all three of the left group; 0 is found first.
        let best = best_candidate(&tuples, &[false; 5], 0.6).unwrap();
        assert_eq!(best.centroid(), &tuples[0]);
        assert_eq!(best.members().collect::<Vec<_>>(), vec![0, 1, 2]);

        let best = best_candidate(&tuples, &[true, true, true, false, false], 0.6).unwrap();
        assert_eq!(best.centroid(), &tuples[3]);
        assert_eq!(best.members().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_recompute_discards_previous_result() {
        let dataset = two_groups();
        let mut miner = QtMiner::new(0.6).unwrap();
        miner.compute(&dataset).unwrap();
        miner.compute(&dataset).unwrap();
        assert_eq!(miner.clusters().len(), 2);
    }

    #[test]
    fn test_invalid_radius() {
        assert!(QtMiner::new(-1.0).is_err());
        assert!(QtMiner::new(f64::NAN).is_err());
        assert!(QtMiner::new(f64::INFINITY).is_ok());
    }
}
