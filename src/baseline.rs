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

use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Dataset;

/// Per-user and per-item bias terms, such that a rating is approximated by
/// `global_mean + bu[user] + bi[item]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Biases {
    pub bu: Vec<f64>,
    pub bi: Vec<f64>,
}

impl Biases {

    pub fn zeros(n_users: usize, n_items: usize) -> Self {
        Biases { bu: vec![0.0; n_users], bi: vec![0.0; n_items] }
    }

    /// Baseline estimate for a pair, `None` if either id is unknown.
    pub fn estimate(&self, global_mean: f64, user: u32, item: u32) -> Option<f64> {
        let bu = self.bu.get(user as usize)?;
        let bi = self.bi.get(item as usize)?;
        Some(global_mean + bu + bi)
    }
}

pub trait BaselineEstimator {
    fn estimate(&self, dataset: &Dataset) -> Biases;
}

/// Which estimator computes the biases of a neighborhood model, each with its default settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineMethod {
    Als,
    Sgd,
}

impl Default for BaselineMethod {
    fn default() -> Self {
        BaselineMethod::Als
    }
}

impl BaselineEstimator for BaselineMethod {
    fn estimate(&self, dataset: &Dataset) -> Biases {
        match *self {
            BaselineMethod::Als => AlsBaseline::default().estimate(dataset),
            BaselineMethod::Sgd => SgdBaseline::default().estimate(dataset),
        }
    }
}

/// Alternating least squares for the biases: each epoch first solves all user biases with fixed
/// item biases, then all item biases with fixed user biases.
#[derive(Debug, Clone)]
pub struct AlsBaseline {
    pub n_epochs: usize,
    pub reg_u: f64,
    pub reg_i: f64,
}

impl Default for AlsBaseline {
    fn default() -> Self {
        AlsBaseline { n_epochs: 10, reg_u: 15.0, reg_i: 10.0 }
    }
}

impl BaselineEstimator for AlsBaseline {

    fn estimate(&self, dataset: &Dataset) -> Biases {

        let global_mean = dataset.global_mean();
        let mut biases = Biases::zeros(dataset.n_users(), dataset.n_items());

        for _ in 0..self.n_epochs {
            for (user, row) in dataset.train_user().iter().enumerate() {
                let deviation: f64 = row.iter()
                    .map(|(item, rating)| rating - global_mean - biases.bi[*item as usize])
                    .sum();
                biases.bu[user] = deviation / (self.reg_u + row.len() as f64);
            }

            for (item, row) in dataset.train_item().iter().enumerate() {
                let deviation: f64 = row.iter()
                    .map(|(user, rating)| rating - global_mean - biases.bu[*user as usize])
                    .sum();
                biases.bi[item] = deviation / (self.reg_i + row.len() as f64);
            }
        }

        debug!("estimated ALS baseline for {} users and {} items", biases.bu.len(),
            biases.bi.len());

        biases
    }
}

/// Stochastic gradient descent on the regularized squared error of the baseline, visiting the
/// ratings in user order each epoch.
#[derive(Debug, Clone)]
pub struct SgdBaseline {
    pub n_epochs: usize,
    pub learning_rate: f64,
    pub reg: f64,
}

impl Default for SgdBaseline {
    fn default() -> Self {
        SgdBaseline { n_epochs: 20, learning_rate: 0.005, reg: 0.02 }
    }
}

impl BaselineEstimator for SgdBaseline {

    fn estimate(&self, dataset: &Dataset) -> Biases {

        let global_mean = dataset.global_mean();
        let mut biases = Biases::zeros(dataset.n_users(), dataset.n_items());
        let triples = dataset.train_triples();

        for _ in 0..self.n_epochs {
            for &(user, item, rating) in triples.iter() {
                let (u, i) = (user as usize, item as usize);
                let error = rating - (global_mean + biases.bu[u] + biases.bi[i]);
                biases.bu[u] += self.learning_rate * (error - self.reg * biases.bu[u]);
                biases.bi[i] += self.learning_rate * (error - self.reg * biases.bi[i]);
            }
        }

        debug!("estimated SGD baseline for {} users and {} items", biases.bu.len(),
            biases.bi.len());

        biases
    }
}


#[cfg(test)]
mod tests {

    use super::*;

    fn dataset() -> Dataset {
        Dataset::from_ratings(&[
            (0, 0, 5.0), (0, 1, 4.0), (0, 2, 5.0),
            (1, 0, 2.0), (1, 1, 1.0),
            (2, 1, 3.0), (2, 2, 4.0),
        ], &[])
    }

    #[test]
    fn single_epoch_matches_closed_form() {
        let dataset = Dataset::from_ratings(&[(0, 0, 5.0), (1, 0, 3.0)], &[]);
        let estimator = AlsBaseline { n_epochs: 1, reg_u: 1.0, reg_i: 2.0 };

        let biases = estimator.estimate(&dataset);

        // global mean 4, user deviations +1 and -1 with one rating each
        assert!((biases.bu[0] - 0.5).abs() < 1e-12);
        assert!((biases.bu[1] + 0.5).abs() < 1e-12);
        // residuals after user biases cancel out for the only item
        assert!(biases.bi[0].abs() < 1e-12);
    }

    #[test]
    fn generous_user_gets_positive_bias() {
        for biases in vec![AlsBaseline::default().estimate(&dataset()),
                           SgdBaseline::default().estimate(&dataset())] {
            assert_eq!(biases.bu.len(), 3);
            assert_eq!(biases.bi.len(), 3);
            assert!(biases.bu[0] > 0.0);
            assert!(biases.bu[1] < 0.0);
        }
    }

    #[test]
    fn estimate_unknown_ids() {
        let biases = Biases { bu: vec![0.5], bi: vec![-0.25] };

        assert_eq!(biases.estimate(3.0, 0, 0), Some(3.25));
        assert_eq!(biases.estimate(3.0, 1, 0), None);
        assert_eq!(biases.estimate(3.0, 0, 1), None);
    }
}
