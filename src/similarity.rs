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

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use scoped_pool::Pool;
use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RecoError;
use crate::types::{RatingMatrix, RatingRow};
use crate::utils;

/// Similarity measures between two entities, computed over the entries both of them rated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Similarity {
    Cosine,
    Msd,
    Pearson,
}

impl FromStr for Similarity {
    type Err = RecoError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "cosine" => Ok(Similarity::Cosine),
            "msd" => Ok(Similarity::Msd),
            "pearson" => Ok(Similarity::Pearson),
            _ => Err(RecoError::UnknownSimilarity(name.to_owned())),
        }
    }
}

impl fmt::Display for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            Similarity::Cosine => "cosine",
            Similarity::Msd => "msd",
            Similarity::Pearson => "pearson",
        };
        write!(f, "{}", name)
    }
}

/// Running sums over co-rated entries.
#[derive(Default)]
struct CoRatings {
    support: usize,
    prods: f64,
    sq_a: f64,
    sq_b: f64,
    sum_a: f64,
    sum_b: f64,
    sq_diffs: f64,
}

impl Similarity {

    /// Similarity of two rating rows. Pairs with fewer than `min_support` co-rated entries, and
    /// pairs for which the measure is undefined, get a similarity of zero.
    pub fn between(&self, row_a: &RatingRow, row_b: &RatingRow, min_support: usize) -> f64 {

        let mut co = CoRatings::default();

        for (key, rating_a) in row_a.iter() {
            if let Some(rating_b) = row_b.get(key) {
                co.support += 1;
                co.prods += rating_a * rating_b;
                co.sq_a += rating_a * rating_a;
                co.sq_b += rating_b * rating_b;
                co.sum_a += rating_a;
                co.sum_b += rating_b;
                co.sq_diffs += (rating_a - rating_b) * (rating_a - rating_b);
            }
        }

        if co.support == 0 || co.support < min_support {
            return 0.0;
        }

        let sim = match *self {
            Similarity::Cosine => {
                co.prods / (co.sq_a * co.sq_b).sqrt()
            },
            Similarity::Msd => {
                1.0 / (co.sq_diffs / co.support as f64 + 1.0)
            },
            Similarity::Pearson => {
                let n = co.support as f64;
                let numerator = n * co.prods - co.sum_a * co.sum_b;
                let denominator = ((n * co.sq_a - co.sum_a * co.sum_a) *
                    (n * co.sq_b - co.sum_b * co.sum_b)).sqrt();
                numerator / denominator
            },
        };

        if sim.is_finite() { sim } else { 0.0 }
    }
}

/// Dense, symmetric similarity matrix indexed by entity id. The diagonal is one.
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    n: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {

    pub fn n(&self) -> usize {
        self.n
    }

    /// Similarity of `a` and `b`, or `None` if either id lies outside the matrix.
    pub fn get(&self, a: u32, b: u32) -> Option<f64> {
        let (a, b) = (a as usize, b as usize);
        if a < self.n && b < self.n {
            Some(self.values[a * self.n + b])
        } else {
            None
        }
    }

    pub fn row(&self, a: u32) -> Option<&[f64]> {
        let a = a as usize;
        if a < self.n {
            Some(&self.values[a * self.n..(a + 1) * self.n])
        } else {
            None
        }
    }
}

/// Compute all pairwise similarities of the given rows, one matrix row per pool task. Each
/// unordered pair is always evaluated from its lower id, so the result is exactly symmetric and
/// independent of the pool size.
pub fn similarity_matrix(
    rows: &RatingMatrix,
    metric: Similarity,
    min_support: usize,
    pool_size: usize,
) -> SimilarityMatrix {

    let n = rows.len();
    let mut values = vec![0.0; n * n];

    let start = Instant::now();

    if n > 0 {
        let pool = Pool::new(pool_size.max(1));

        pool.scoped(|scope| {
            for (a, row_values) in values.chunks_mut(n).enumerate() {
                scope.execute(move || {
                    for (b, value) in row_values.iter_mut().enumerate() {
                        *value = if a == b {
                            1.0
                        } else {
                            let (low, high) = if a < b { (a, b) } else { (b, a) };
                            metric.between(&rows[low], &rows[high], min_support)
                        };
                    }
                });
            }
        });

        pool.shutdown();
    }

    debug!("computed {} {} similarities in {}ms", n * n, metric,
        utils::to_millis(start.elapsed()));

    SimilarityMatrix { n, values }
}
