use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::PlaygroundError;

/// How to narrow a candidate list before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingStrategy {
    /// First `limit` items, unchanged
    TopN,
    /// `limit` items from a shuffled copy
    Random,
    /// Same as `TopN`; used when the caller already supplies exactly the
    /// desired items in the desired order
    Repeat,
}

impl FromStr for SamplingStrategy {
    type Err = PlaygroundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top-n" => Ok(SamplingStrategy::TopN),
            "random" => Ok(SamplingStrategy::Random),
            "repeat" => Ok(SamplingStrategy::Repeat),
            other => Err(PlaygroundError::InvalidSamplingMethod(other.to_string())),
        }
    }
}

/// Select at most `limit` items. Never mutates `items`.
pub fn sample<T: Clone>(items: &[T], limit: usize, strategy: SamplingStrategy) -> Vec<T> {
    sample_with_rng(items, limit, strategy, &mut rand::rng())
}

pub fn sample_with_rng<T: Clone, R: Rng + ?Sized>(
    items: &[T],
    limit: usize,
    strategy: SamplingStrategy,
    rng: &mut R,
) -> Vec<T> {
    match strategy {
        SamplingStrategy::TopN | SamplingStrategy::Repeat => {
            items.iter().take(limit).cloned().collect()
        }
        SamplingStrategy::Random => {
            let mut shuffled = items.to_vec();
            shuffled.shuffle(rng);
            shuffled.truncate(limit);
            shuffled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn items() -> Vec<u32> {
        (1..=8).collect()
    }

    #[test]
    fn test_top_n_takes_prefix() {
        assert_eq!(sample(&items(), 3, SamplingStrategy::TopN), vec![1, 2, 3]);
    }

    #[test]
    fn test_repeat_matches_top_n() {
        assert_eq!(
            sample(&items(), 5, SamplingStrategy::Repeat),
            sample(&items(), 5, SamplingStrategy::TopN)
        );
    }

    #[test]
    fn test_random_does_not_mutate_input() {
        let original = items();
        let snapshot = original.clone();
        let mut rng = StdRng::seed_from_u64(7);
        let picked = sample_with_rng(&original, 4, SamplingStrategy::Random, &mut rng);
        assert_eq!(original, snapshot);
        assert_eq!(picked.len(), 4);
        assert!(picked.iter().all(|p| original.contains(p)));
    }

    #[test]
    fn test_random_is_a_permutation_when_limit_covers_all() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut picked = sample_with_rng(&items(), 100, SamplingStrategy::Random, &mut rng);
        picked.sort();
        assert_eq!(picked, items());
    }

    #[test]
    fn test_length_is_min_of_limit_and_len() {
        for strategy in [
            SamplingStrategy::TopN,
            SamplingStrategy::Random,
            SamplingStrategy::Repeat,
        ] {
            for limit in [0, 1, 8, 20] {
                let picked = sample(&items(), limit, strategy);
                assert_eq!(picked.len(), limit.min(8), "{strategy:?} limit {limit}");
            }
        }
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let err = "weighted".parse::<SamplingStrategy>().unwrap_err();
        assert!(matches!(err, PlaygroundError::InvalidSamplingMethod(ref m) if m == "weighted"));
    }

    #[test]
    fn test_known_method_names() {
        let parse = |m: &str| m.parse::<SamplingStrategy>().unwrap();
        assert_eq!(parse("top-n"), SamplingStrategy::TopN);
        assert_eq!(parse("repeat"), SamplingStrategy::Repeat);
        assert_eq!(parse("random"), SamplingStrategy::Random);
    }
}
