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

use crate::als::Task;
use crate::predictor::{Lookup, Predictor};
use crate::recommend::Recommendation;
use crate::scored::{self, ScoredItem};
use crate::types::{Dataset, SparseBinaryMatrix};
use crate::utils;

/// A trained neural collaborative filtering model (generalized matrix factorization combined
/// with a multilayer perceptron), treated as an opaque scorer. Training happens elsewhere.
pub trait NeuralModel {

    fn n_users(&self) -> usize;

    fn n_items(&self) -> usize;

    /// Raw output of the model for a known pair: the predicted rating for rating tasks, the
    /// logit of an interaction for ranking tasks.
    fn output(&self, user: u32, item: u32) -> f64;
}

/// Predictions and recommendations on top of a trained `NeuralModel`.
pub struct NeuralPredictor<M> {
    model: M,
    task: Task,
    default_prediction: f64,
    rated: SparseBinaryMatrix,
}

impl<M: NeuralModel> NeuralPredictor<M> {

    /// Wrap a model trained on `dataset`.
    pub fn new(model: M, task: Task, dataset: &Dataset) -> Self {
        NeuralPredictor {
            model,
            task,
            default_prediction: dataset.global_mean(),
            rated: dataset.rated_items(),
        }
    }

    fn output(&self, user: u32, item: u32) -> Lookup<f64> {
        if (user as usize) < self.model.n_users() && (item as usize) < self.model.n_items() {
            Lookup::Found(self.model.output(user, item))
        } else {
            Lookup::NotFound
        }
    }

    /// Clamped rating for rating tasks, the binary label for ranking tasks.
    pub fn lookup(&self, user: u32, item: u32) -> Lookup<f64> {
        match self.output(user, item) {
            Lookup::Found(output) => Lookup::Found(match self.task {
                Task::Rating => utils::clamp(output, 1.0, 5.0),
                Task::Ranking => if utils::sigmoid(output) >= 0.5 { 1.0 } else { 0.0 },
            }),
            Lookup::NotFound => Lookup::NotFound,
        }
    }

    /// Interaction probability of a pair, 0.5 for unknown ids.
    pub fn probability(&self, user: u32, item: u32) -> f64 {
        utils::sigmoid(self.output(user, item).unwrap_or(0.0))
    }

    /// The `n_rec` highest scored items the user has not rated, scored by the unclamped model
    /// output for rating tasks and by the interaction probability for ranking tasks.
    pub fn recommend_user(&self, user: u32, n_rec: usize) -> Vec<Recommendation> {

        if (user as usize) >= self.model.n_users() {
            return Vec::new();
        }

        let rated = self.rated.get(user as usize);

        let candidates = (0..self.model.n_items() as u32)
            .filter(|item| !rated.map(|rated| rated.contains(item)).unwrap_or(false))
            .map(|item| {
                let output = self.model.output(user, item);
                let score = match self.task {
                    Task::Rating => output,
                    Task::Ranking => utils::sigmoid(output),
                };
                ScoredItem { item, score }
            });

        scored::top_k(candidates, n_rec)
            .into_iter()
            .map(|scored_item| (scored_item.item, scored_item.score))
            .collect()
    }
}

impl<M: NeuralModel> Predictor for NeuralPredictor<M> {

    fn predict(&self, user: u32, item: u32) -> f64 {
        self.lookup(user, item).unwrap_or(self.default_prediction)
    }

    fn default_prediction(&self) -> f64 {
        self.default_prediction
    }
}
