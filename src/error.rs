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

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecoError>;

/// Failures which are visible to callers. Unknown users or items and empty neighborhoods are not
/// errors, predictors answer them with their default prediction.
#[derive(Debug, Error)]
pub enum RecoError {
    #[error("similarity option {0} not allowed, use one of cosine, msd, pearson")]
    UnknownSimilarity(String),
    #[error("task {0} not allowed, use one of rating, ranking")]
    UnknownTask(String),
    #[error("cannot sample {requested} recommendations from {available} candidates")]
    InsufficientCandidates { requested: usize, available: usize },
    #[error("normal equations for {entity} {index} are not positive definite")]
    Singular { entity: &'static str, index: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
