/**
 * CfReco
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use rand::Rng;

use crate::error::{RecoError, Result};
use crate::scored::{self, ScoredItem};

/// Candidates need at least this predicted score to be considered for sampled recommendations.
pub const MIN_SAMPLING_SCORE: f64 = 4.0;

/// A recommended item and its predicted score.
pub type Recommendation = (u32, f64);

/// Turn scored candidates into recommendations. Without `random_rec`, the `n_rec` highest scored
/// candidates are returned in descending order of score. With `random_rec`, `n_rec` candidates
/// scored at least `MIN_SAMPLING_SCORE` are drawn without replacement, with probabilities
/// proportional to their scores; this fails if there are fewer such candidates than requested.
pub fn select<R: Rng>(
    candidates: Vec<ScoredItem>,
    n_rec: usize,
    random_rec: bool,
    rng: &mut R,
) -> Result<Vec<Recommendation>> {

    if !random_rec {
        return Ok(scored::top_k(candidates, n_rec)
            .into_iter()
            .map(|scored_item| (scored_item.item, scored_item.score))
            .collect());
    }

    let qualified: Vec<ScoredItem> = candidates.into_iter()
        .filter(|scored_item| scored_item.score >= MIN_SAMPLING_SCORE)
        .collect();

    let total: f64 = qualified.iter().map(|scored_item| scored_item.score).sum();
    let probabilities: Vec<f64> = qualified.iter()
        .map(|scored_item| scored_item.score / total)
        .collect();

    let sampled = weighted_sample(&probabilities, n_rec, rng)?;

    Ok(sampled.into_iter()
        .map(|index| (qualified[index].item, qualified[index].score))
        .collect())
}

/// Draw `n` distinct indices into `weights`, each draw picking among the remaining indices with
/// probability proportional to their weight. Indices with a non-positive or non-finite weight are
/// never drawn and do not count as available.
pub fn weighted_sample<R: Rng>(weights: &[f64], n: usize, rng: &mut R) -> Result<Vec<usize>> {

    let mut remaining: Vec<(usize, f64)> = weights.iter()
        .cloned()
        .enumerate()
        .filter(|&(_, weight)| weight > 0.0 && weight.is_finite())
        .collect();

    if remaining.len() < n {
        return Err(RecoError::InsufficientCandidates {
            requested: n,
            available: remaining.len(),
        });
    }

    let mut sampled = Vec::with_capacity(n);

    for _ in 0..n {
        let total: f64 = remaining.iter().map(|&(_, weight)| weight).sum();
        let target = rng.gen::<f64>() * total;

        // Rounding can leave the target just above the last cumulative weight
        let mut position = remaining.len() - 1;
        let mut cumulative = 0.0;
        for (candidate, &(_, weight)) in remaining.iter().enumerate() {
            cumulative += weight;
            if target < cumulative {
                position = candidate;
                break;
            }
        }

        let (index, _) = remaining.remove(position);
        sampled.push(index);
    }

    Ok(sampled)
}
