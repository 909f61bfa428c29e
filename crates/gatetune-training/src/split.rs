//! Train/validation partitioning by episode.
//!
//! Whole episodes are assigned to one side so that no interaction session
//! appears in both sets. The realized validation fraction therefore depends on
//! how many samples each episode holds and is not rebalanced.

use crate::error::{TrainingError, TrainingResult};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::{BTreeSet, HashSet};

/// Anything that belongs to an episode.
pub trait Episodic {
    fn episode_id(&self) -> &str;
}

impl Episodic for crate::dataset::RawSample {
    fn episode_id(&self) -> &str {
        &self.episode_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSplit<T> {
    pub train: Vec<T>,
    pub validation: Vec<T>,
    pub train_episodes: Vec<String>,
    pub validation_episodes: Vec<String>,
}

impl<T> DatasetSplit<T> {
    /// Share of items that landed in validation.
    #[must_use]
    pub fn realized_validation_fraction(&self) -> f64 {
        let total = self.train.len() + self.validation.len();
        if total == 0 {
            return 0.0;
        }
        self.validation.len() as f64 / total as f64
    }

    /// Apply `f` to every item, keeping the episode assignment.
    pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> Result<U, E>) -> Result<DatasetSplit<U>, E> {
        Ok(DatasetSplit {
            train: self.train.into_iter().map(&mut f).collect::<Result<_, _>>()?,
            validation: self.validation.into_iter().map(&mut f).collect::<Result<_, _>>()?,
            train_episodes: self.train_episodes,
            validation_episodes: self.validation_episodes,
        })
    }
}

/// Number of episodes assigned to training.
///
/// `floor((1 - val_fraction) * count)`, with at least one training episode
/// whenever any exist.
#[must_use]
pub fn train_episode_count(count: usize, val_fraction: f64) -> usize {
    if count == 0 {
        return 0;
    }
    // Tolerance absorbs products like 0.7 * 10 = 6.999...
    let raw = ((1.0 - val_fraction) * count as f64 + 1e-9).floor() as usize;
    raw.clamp(1, count)
}

/// Split items into training and validation sets by episode.
pub fn split<T: Episodic>(items: Vec<T>, val_fraction: f64, seed: u64) -> TrainingResult<DatasetSplit<T>> {
    if !(0.0..1.0).contains(&val_fraction) {
        return Err(TrainingError::InvalidSetting(format!(
            "val_fraction must be in [0, 1), got {val_fraction}"
        )));
    }

    let mut episodes: Vec<String> = items
        .iter()
        .map(|item| item.episode_id().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    episodes.shuffle(&mut rng);

    let n_train = train_episode_count(episodes.len(), val_fraction);
    let validation_episodes = episodes.split_off(n_train);
    let train_episodes = episodes;

    let train_set: HashSet<&str> = train_episodes.iter().map(String::as_str).collect();
    let (train, validation): (Vec<T>, Vec<T>) =
        items.into_iter().partition(|item| train_set.contains(item.episode_id()));

    Ok(DatasetSplit { train, validation, train_episodes, validation_episodes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        episode: String,
        n: usize,
    }

    impl Episodic for Item {
        fn episode_id(&self) -> &str {
            &self.episode
        }
    }

    /// `total` items spread round-robin over `episodes` episodes.
    fn items(total: usize, episodes: usize) -> Vec<Item> {
        (0..total).map(|n| Item { episode: format!("ep-{:03}", n % episodes), n }).collect()
    }

    #[test]
    fn test_153_samples_over_40_episodes() {
        let split = split(items(153, 40), 0.2, 42).unwrap();

        assert_eq!(split.train_episodes.len(), 32);
        assert_eq!(split.validation_episodes.len(), 8);
        assert_eq!(split.train.len() + split.validation.len(), 153);

        let train: HashSet<_> = split.train_episodes.iter().collect();
        let validation: HashSet<_> = split.validation_episodes.iter().collect();
        assert!(train.is_disjoint(&validation));
        assert_eq!(train.len() + validation.len(), 40);
    }

    #[test]
    fn test_items_follow_their_episode() {
        let split = split(items(153, 40), 0.2, 42).unwrap();
        let train: HashSet<_> = split.train_episodes.iter().map(String::as_str).collect();
        assert!(split.train.iter().all(|i| train.contains(i.episode.as_str())));
        assert!(split.validation.iter().all(|i| !train.contains(i.episode.as_str())));
    }

    #[test]
    fn test_split_is_deterministic() {
        let a = split(items(153, 40), 0.2, 42).unwrap();
        let b = split(items(153, 40), 0.2, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_input_order_does_not_change_assignment() {
        let forward = split(items(60, 12), 0.25, 7).unwrap();
        let mut reversed_items = items(60, 12);
        reversed_items.reverse();
        let reversed = split(reversed_items, 0.25, 7).unwrap();
        assert_eq!(forward.train_episodes, reversed.train_episodes);
    }

    #[test]
    fn test_different_seeds_usually_differ() {
        let a = split(items(100, 50), 0.2, 1).unwrap();
        let b = split(items(100, 50), 0.2, 2).unwrap();
        assert_ne!(a.validation_episodes, b.validation_episodes);
    }

    #[test]
    fn test_single_episode_leaves_validation_empty() {
        let split = split(items(5, 1), 0.2, 42).unwrap();
        assert_eq!(split.train.len(), 5);
        assert!(split.validation.is_empty());
        assert!(split.validation_episodes.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let split = split(Vec::<Item>::new(), 0.2, 42).unwrap();
        assert!(split.train.is_empty());
        assert!(split.validation.is_empty());
        assert_eq!(split.realized_validation_fraction(), 0.0);
    }

    #[test]
    fn test_rejects_out_of_range_fraction() {
        assert!(split(items(10, 5), 1.0, 42).is_err());
        assert!(split(items(10, 5), -0.1, 42).is_err());
        assert!(split(items(10, 5), f64::NAN, 42).is_err());
    }

    #[test]
    fn test_skewed_episodes_keep_deviation() {
        // One huge episode and nine single-item episodes.
        let mut data: Vec<Item> = (0..91).map(|n| Item { episode: "big".to_string(), n }).collect();
        data.extend((0..9).map(|n| Item { episode: format!("small-{n}"), n: 100 + n }));
        let split = split(data, 0.2, 42).unwrap();
        assert_eq!(split.train_episodes.len(), 8);
        assert_eq!(split.validation_episodes.len(), 2);
        let realized = split.realized_validation_fraction();
        assert!(realized == 0.02 || realized > 0.9, "realized fraction {realized}");
    }

    #[test]
    fn test_train_episode_count() {
        assert_eq!(train_episode_count(40, 0.2), 32);
        assert_eq!(train_episode_count(10, 0.3), 7);
        assert_eq!(train_episode_count(1, 0.2), 1);
        assert_eq!(train_episode_count(3, 0.0), 3);
        assert_eq!(train_episode_count(0, 0.2), 0);
    }

    #[test]
    fn test_try_map_preserves_assignment() {
        let split = split(items(20, 10), 0.2, 3).unwrap();
        let mapped = split.clone().try_map(|i| Ok::<_, ()>(i.n)).unwrap();
        assert_eq!(mapped.train, split.train.iter().map(|i| i.n).collect::<Vec<_>>());
        assert_eq!(mapped.validation_episodes, split.validation_episodes);
    }
}
