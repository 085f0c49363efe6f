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

use std::time::Instant;

use fnv::FnvHashSet;
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use tracing::info;

use crate::baseline::{BaselineEstimator, BaselineMethod, Biases};
use crate::error::Result;
use crate::predictor::{Lookup, Predictor};
use crate::recommend::{self, Recommendation};
use crate::scored::{self, ScoredItem};
use crate::similarity::{self, Similarity, SimilarityMatrix};
use crate::types::{Dataset, RatingMatrix};
use crate::utils;

/// Neighbors only contribute items they rated above this value to top-N candidates.
const POSITIVE_RATING: f64 = 3.0;

const MIN_PREDICTION: f64 = 0.0;
const MAX_PREDICTION: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnConfig {
    pub similarity: Similarity,
    /// Size of the neighborhood
    pub k: usize,
    /// Minimum number of co-rated items for a non-zero similarity
    pub min_support: usize,
    /// Center neighbor ratings on their baseline estimates
    pub baseline: bool,
    pub baseline_method: BaselineMethod,
    /// Number of threads for computing similarities, defaults to the number of CPUs
    pub pool_size: Option<usize>,
}

impl Default for KnnConfig {
    fn default() -> Self {
        KnnConfig {
            similarity: Similarity::Pearson,
            k: 50,
            min_support: 1,
            baseline: true,
            baseline_method: BaselineMethod::Als,
            pool_size: None,
        }
    }
}

/// User-based neighborhood model. `fit` produces an immutable `FittedKnn`.
#[derive(Debug, Clone)]
pub struct UserKnn {
    config: KnnConfig,
}

impl UserKnn {

    /// The similarity option must be one of "cosine", "msd" or "pearson".
    pub fn new(sim_option: &str, k: usize, min_support: usize, baseline: bool) -> Result<Self> {
        let similarity = sim_option.parse::<Similarity>()?;

        Ok(UserKnn::from_config(KnnConfig {
            similarity,
            k,
            min_support,
            baseline,
            baseline_method: BaselineMethod::default(),
            pool_size: None,
        }))
    }

    pub fn from_config(config: KnnConfig) -> Self {
        UserKnn { config }
    }

    pub fn with_baseline_method(mut self, baseline_method: BaselineMethod) -> Self {
        self.config.baseline_method = baseline_method;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.config.pool_size = Some(pool_size);
        self
    }

    pub fn config(&self) -> &KnnConfig {
        &self.config
    }

    pub fn fit(&self, dataset: &Dataset) -> FittedKnn {

        let start = Instant::now();

        let pool_size = self.config.pool_size.unwrap_or_else(num_cpus::get);

        let sim = similarity::similarity_matrix(
            dataset.train_user(),
            self.config.similarity,
            self.config.min_support,
            pool_size,
        );

        let biases = if self.config.baseline {
            Some(self.config.baseline_method.estimate(dataset))
        } else {
            None
        };

        info!("fitted user kNN ({} similarity, k={}) for {} users in {}ms",
            self.config.similarity, self.config.k, dataset.n_users(),
            utils::to_millis(start.elapsed()));

        FittedKnn {
            config: self.config.clone(),
            global_mean: dataset.global_mean(),
            default_prediction: dataset.global_mean(),
            train_user: dataset.train_user().clone(),
            train_item: dataset.train_item().clone(),
            sim,
            biases,
        }
    }
}

/// A fitted user kNN model. All state is read-only, so predictions can be issued concurrently.
#[derive(Debug, Clone)]
pub struct FittedKnn {
    config: KnnConfig,
    global_mean: f64,
    default_prediction: f64,
    train_user: RatingMatrix,
    train_item: RatingMatrix,
    sim: SimilarityMatrix,
    biases: Option<Biases>,
}

impl FittedKnn {

    pub fn similarities(&self) -> &SimilarityMatrix {
        &self.sim
    }

    pub fn biases(&self) -> Option<&Biases> {
        self.biases.as_ref()
    }

    /// Weighted vote of the `k` users most similar to `user` among those who rated `item`.
    /// Neighbors are selected by similarity rank, but only those with a positive similarity
    /// contribute to the vote. `NotFound` for unknown ids and for neighborhoods without any
    /// positive similarity.
    pub fn lookup(&self, user: u32, item: u32) -> Lookup<f64> {

        let raters = match self.train_item.get(item as usize) {
            Some(raters) => raters,
            None => return Lookup::NotFound,
        };

        let similarities = match self.sim.row(user) {
            Some(similarities) => similarities,
            None => return Lookup::NotFound,
        };

        let baseline = match self.biases {
            Some(ref biases) => match biases.estimate(self.global_mean, user, item) {
                Some(bui) => Some((biases, bui)),
                None => return Lookup::NotFound,
            },
            None => None,
        };

        let neighbors = scored::top_k(
            raters.keys().map(|v| ScoredItem { item: *v, score: similarities[*v as usize] }),
            self.config.k,
        );

        let mut sim_ratings = 0.0;
        let mut sim_sums = 0.0;

        for neighbor in neighbors.iter().filter(|neighbor| neighbor.score > 0.0) {
            let rating = raters[&neighbor.item];

            let deviation = match baseline {
                Some((biases, _)) => {
                    let bvi = self.global_mean + biases.bu[neighbor.item as usize] +
                        biases.bi[item as usize];
                    rating - bvi
                },
                None => rating,
            };

            sim_ratings += neighbor.score * deviation;
            sim_sums += neighbor.score;
        }

        if sim_sums == 0.0 {
            return Lookup::NotFound;
        }

        let offset = baseline.map(|(_, bui)| bui).unwrap_or(0.0);

        Lookup::Found(utils::clamp(offset + sim_ratings / sim_sums, MIN_PREDICTION, MAX_PREDICTION))
    }

    /// Recommend up to `n_rec` items to `user` from the positively rated items of its `k` most
    /// similar users, skipping items the user already rated. Every candidate is scored with a
    /// full prediction. See `recommend::select` for the difference between sorted and sampled
    /// recommendations. Unknown users receive no recommendations.
    pub fn top_n<R: Rng>(
        &self,
        user: u32,
        k: usize,
        n_rec: usize,
        random_rec: bool,
        rng: &mut R,
    ) -> Result<Vec<Recommendation>> {

        let (similarities, rated) = match (self.sim.row(user), self.train_user.get(user as usize)) {
            (Some(similarities), Some(rated)) => (similarities, rated),
            _ => return Ok(Vec::new()),
        };

        let neighbors = scored::top_k(
            similarities.iter()
                .enumerate()
                .filter(|&(v, _)| v != user as usize)
                .map(|(v, sim)| ScoredItem { item: v as u32, score: *sim }),
            k,
        );

        let mut seen = FnvHashSet::default();
        let mut candidates = Vec::new();

        for neighbor in neighbors.iter() {
            for (item, rating) in self.train_user[neighbor.item as usize].iter() {
                if *rating > POSITIVE_RATING && !rated.contains_key(item) && seen.insert(*item) {
                    candidates.push(ScoredItem { item: *item, score: self.predict(user, *item) });
                }
            }
        }

        recommend::select(candidates, n_rec, random_rec, rng)
    }
}

impl Predictor for FittedKnn {

    fn predict(&self, user: u32, item: u32) -> f64 {
        self.lookup(user, item).unwrap_or(self.default_prediction)
    }

    fn default_prediction(&self) -> f64 {
        self.default_prediction
    }
}


#[cfg(test)]
mod tests {

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::baseline::{AlsBaseline, SgdBaseline};
    use crate::error::RecoError;
    use super::*;

    fn ratings() -> Vec<(u32, u32, f64)> {
        vec![
            (0, 0, 5.0), (0, 1, 4.0), (0, 2, 1.0),
            (1, 0, 5.0), (1, 1, 4.0), (1, 2, 2.0), (1, 3, 5.0), (1, 4, 4.0),
            (2, 0, 1.0), (2, 1, 2.0), (2, 2, 5.0), (2, 3, 1.0),
            (3, 0, 4.0), (3, 1, 5.0), (3, 4, 5.0), (3, 5, 4.0),
            (4, 2, 4.0), (4, 5, 1.0),
        ]
    }

    fn fitted(sim_option: &str, baseline: bool) -> FittedKnn {
        let dataset = Dataset::from_ratings(&ratings(), &[]);
        UserKnn::new(sim_option, 3, 1, baseline).unwrap().with_pool_size(2).fit(&dataset)
    }

    #[test]
    fn unknown_similarity_fails_at_construction() {
        match UserKnn::new("euclidean", 10, 1, true) {
            Err(RecoError::UnknownSimilarity(name)) => assert_eq!(name, "euclidean"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn single_neighbor_without_baseline_predicts_its_rating() {
        let dataset = Dataset::from_ratings(&[(0, 0, 4.0), (0, 1, 4.0), (1, 0, 3.0),
            (1, 1, 3.0), (1, 2, 3.5)], &[]);

        let model = UserKnn::new("cosine", 5, 1, false).unwrap().fit(&dataset);

        assert!((model.similarities().get(0, 1).unwrap() - 1.0).abs() < 1e-12);
        assert!((model.predict(0, 2) - 3.5).abs() < 1e-12);
    }

    #[test]
    fn predictions_are_bounded() {
        for &sim_option in &["cosine", "msd", "pearson"] {
            for &baseline in &[true, false] {
                let model = fitted(sim_option, baseline);
                for user in 0..5 {
                    for item in 0..6 {
                        let prediction = model.predict(user, item);
                        assert!(prediction >= 0.0 && prediction <= 5.0);
                    }
                }
            }
        }
    }

    #[test]
    fn unknown_ids_yield_default_prediction() {
        let model = fitted("pearson", true);
        let global_mean = Dataset::from_ratings(&ratings(), &[]).global_mean();

        assert_eq!(model.default_prediction(), global_mean);
        assert_eq!(model.predict(99, 0), global_mean);
        assert_eq!(model.predict(0, 99), global_mean);
        assert_eq!(model.lookup(99, 99), Lookup::NotFound);
    }

    #[test]
    fn no_positive_neighbors_yields_default_prediction() {
        // user 1 disagrees with user 0 on everything
        let dataset = Dataset::from_ratings(&[(0, 0, 5.0), (0, 1, 1.0), (1, 0, 1.0),
            (1, 1, 5.0), (1, 2, 4.0)], &[]);

        for &baseline in &[true, false] {
            let model = UserKnn::new("pearson", 5, 1, baseline).unwrap().fit(&dataset);
            assert!(model.similarities().get(0, 1).unwrap() < 0.0);
            assert_eq!(model.lookup(0, 2), Lookup::NotFound);
            assert_eq!(model.predict(0, 2), dataset.global_mean());
        }
    }

    #[test]
    fn baseline_centers_neighbor_ratings() {
        let dataset = Dataset::from_ratings(&ratings(), &[]);
        let model = UserKnn::new("cosine", 50, 1, true).unwrap().fit(&dataset);

        let biases = model.biases().unwrap();
        let mean = dataset.global_mean();

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (v, r) in dataset.train_item()[4].iter() {
            let sim = model.similarities().get(0, *v).unwrap();
            if sim > 0.0 {
                numerator += sim * (r - (mean + biases.bu[*v as usize] + biases.bi[4]));
                denominator += sim;
            }
        }
        let expected = mean + biases.bu[0] + biases.bi[4] + numerator / denominator;
        let expected = expected.max(0.0).min(5.0);

        assert!((model.predict(0, 4) - expected).abs() < 1e-9);
    }

    #[test]
    fn sorted_top_n() {
        let model = fitted("cosine", true);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let recommendations = model.top_n(0, 3, 2, false, &mut rng).unwrap();

        assert!(recommendations.len() <= 2);
        assert!(!recommendations.is_empty());
        for pair in recommendations.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        for &(item, score) in recommendations.iter() {
            assert!(item >= 3);
            assert_eq!(score, model.predict(0, item));
        }
    }

    #[test]
    fn sampled_top_n() {
        let model = fitted("cosine", false);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        // of the candidates 3, 4 and 5 only item 4 is predicted above 4
        let recommendations = model.top_n(0, 4, 1, true, &mut rng).unwrap();
        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].0, 4);
        assert!(recommendations[0].1 >= 4.0);

        let sorted = model.top_n(0, 4, 3, false, &mut rng).unwrap();
        assert_eq!(sorted.len(), 3);
        assert_eq!(sorted[0].0, 4);

        match model.top_n(0, 4, 2, true, &mut rng) {
            Err(RecoError::InsufficientCandidates { requested, available }) => {
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn baseline_method_selects_estimator() {
        let dataset = Dataset::from_ratings(&ratings(), &[]);

        let als = UserKnn::new("pearson", 3, 1, true).unwrap().fit(&dataset);
        let sgd = UserKnn::new("pearson", 3, 1, true).unwrap()
            .with_baseline_method(BaselineMethod::Sgd)
            .fit(&dataset);

        assert_eq!(als.biases(), Some(&AlsBaseline::default().estimate(&dataset)));
        assert_eq!(sgd.biases(), Some(&SgdBaseline::default().estimate(&dataset)));
        assert_ne!(als.biases(), sgd.biases());

        let config: KnnConfig = serde_json::from_str(r#"{"baseline_method": "sgd"}"#).unwrap();
        assert_eq!(config.baseline_method, BaselineMethod::Sgd);
        assert_eq!(config.k, 50);
    }

    #[test]
    fn lookup_only_uses_k_nearest_raters() {
        // user 1 agrees with user 0, user 2 mostly disagrees, both rated item 2
        let dataset = Dataset::from_ratings(&[(0, 0, 5.0), (0, 1, 1.0), (1, 0, 5.0),
            (1, 1, 1.0), (1, 2, 5.0), (2, 0, 1.0), (2, 1, 5.0), (2, 2, 1.0)], &[]);

        let nearest = UserKnn::new("cosine", 1, 1, false).unwrap().fit(&dataset);
        let both = UserKnn::new("cosine", 2, 1, false).unwrap().fit(&dataset);

        assert!(nearest.similarities().get(0, 2).unwrap() > 0.0);
        assert!((nearest.predict(0, 2) - 5.0).abs() < 1e-9);
        assert!(both.predict(0, 2) < 4.5);
    }

    #[test]
    fn top_n_never_picks_the_user_as_its_own_neighbor() {
        let dataset = Dataset::from_ratings(&[(0, 0, 5.0), (0, 1, 1.0), (1, 0, 5.0),
            (1, 1, 2.0), (1, 2, 5.0), (1, 3, 2.0)], &[]);
        let model = UserKnn::new("cosine", 5, 1, false).unwrap().fit(&dataset);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        assert!(model.similarities().get(0, 1).unwrap() < 1.0);

        let recommendations = model.top_n(0, 1, 5, false, &mut rng).unwrap();

        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].0, 2);
        assert!((recommendations[0].1 - 5.0).abs() < 1e-9);
    }

    #[test]
    fn top_n_skips_items_no_neighbor_rated_highly() {
        // item 3 is rated 2 and 3 by the neighbors of user 0
        let dataset = Dataset::from_ratings(&[(0, 0, 5.0), (0, 1, 1.0), (1, 0, 5.0),
            (1, 1, 2.0), (1, 2, 5.0), (1, 3, 2.0), (2, 0, 4.0), (2, 1, 1.0), (2, 3, 3.0)], &[]);
        let model = UserKnn::new("cosine", 5, 1, false).unwrap().fit(&dataset);
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        assert!(model.lookup(0, 3).is_found());

        let recommendations = model.top_n(0, 2, 5, false, &mut rng).unwrap();

        let items: Vec<u32> = recommendations.iter().map(|r| r.0).collect();
        assert_eq!(items, vec![2]);
    }

    #[test]
    fn top_n_for_unknown_user_is_empty() {
        let model = fitted("msd", true);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert!(model.top_n(42, 3, 5, false, &mut rng).unwrap().is_empty());
    }
}
