//! Random selection primitives used by the query engine.
//!
//! Choosing *which* puzzles and choosing *their order* are separate steps,
//! each with its own draws.

use std::collections::HashSet;

use rand::Rng;

/// Pick `min(limit, candidates.len())` distinct elements uniformly.
///
/// When every candidate fits they are all returned in input order. Otherwise
/// indices are drawn uniformly and repeats are skipped; with `limit` much
/// smaller than the candidate count this needs about `limit` draws.
pub fn sample_without_replacement<T, R>(
  candidates: &[T],
  limit: usize,
  rng: &mut R,
) -> Vec<T>
where
  T: Clone,
  R: Rng + ?Sized,
{
  if candidates.len() <= limit {
    return candidates.to_vec();
  }

  let mut drawn = HashSet::with_capacity(limit);
  let mut picked = Vec::with_capacity(limit);
  while picked.len() < limit {
    let i = rng.gen_range(0..candidates.len());
    if drawn.insert(i) {
      picked.push(candidates[i].clone());
    }
  }
  picked
}

/// Uniform in-place Fisher–Yates shuffle.
pub fn shuffle<T, R>(items: &mut [T], rng: &mut R)
where
  R: Rng + ?Sized,
{
  for i in (1..items.len()).rev() {
    let j = rng.gen_range(0..=i);
    items.swap(i, j);
  }
}
