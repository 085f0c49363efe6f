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

pub mod als;
pub mod baseline;
pub mod error;
pub mod evaluate;
pub mod io;
pub mod knn;
mod linalg;
pub mod neural;
pub mod predictor;
pub mod recommend;
pub mod scored;
pub mod similarity;
pub mod stats;
pub mod types;
pub mod utils;

mod usage_tests;

pub use als::{Als, AlsConfig, FittedAls, Task};
pub use error::{RecoError, Result};
pub use knn::{FittedKnn, KnnConfig, UserKnn};
pub use predictor::{Lookup, Predictor};
pub use similarity::Similarity;
pub use types::Dataset;
