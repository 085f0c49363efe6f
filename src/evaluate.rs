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

use crate::predictor::Predictor;
use crate::types::{Dataset, Rating};

/// Which part of a dataset to score a predictor on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

/// Root mean squared error of the predictions for the explicit ratings of a split, `None` if
/// the split holds no ratings.
pub fn rmse<P: Predictor + ?Sized>(predictor: &P, dataset: &Dataset, split: Split) -> Option<f64> {

    let ratings: Vec<Rating> = match split {
        Split::Train => dataset.train_triples(),
        Split::Test => dataset.test().to_vec(),
    };

    if ratings.is_empty() {
        return None;
    }

    let squared_errors: f64 = ratings.iter()
        .map(|&(user, item, rating)| {
            let error = predictor.predict(user, item) - rating;
            error * error
        })
        .sum();

    Some((squared_errors / ratings.len() as f64).sqrt())
}

/// Fraction of implicit feedback labels of a split which are predicted exactly, `None` if the
/// split holds no implicit feedback.
pub fn accuracy<P: Predictor + ?Sized>(
    predictor: &P,
    dataset: &Dataset,
    split: Split,
) -> Option<f64> {

    let feedback = match split {
        Split::Train => dataset.train_implicit(),
        Split::Test => dataset.test_implicit(),
    };

    if feedback.is_empty() {
        return None;
    }

    let hits = feedback.triples()
        .filter(|&(user, item, label)| predictor.predict(user, item) == label)
        .count();

    Some(hits as f64 / feedback.len() as f64)
}
