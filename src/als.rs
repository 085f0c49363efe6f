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

use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{RecoError, Result};
use crate::evaluate::{self, Split};
use crate::linalg;
use crate::predictor::{Lookup, Predictor};
use crate::recommend::{self, Recommendation};
use crate::scored::ScoredItem;
use crate::types::{Dataset, ImplicitFeedback, RatingMatrix, SparseBinaryMatrix};
use crate::utils;

const INIT_SCALE: f64 = 0.05;

const MIN_RATING: f64 = 1.0;
const MAX_RATING: f64 = 5.0;

/// Explicit ratings are factorized as they are, implicit feedback labels are fitted and then
/// predicted through a logistic link as binary outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Rating,
    Ranking,
}

impl FromStr for Task {
    type Err = RecoError;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        match name {
            "rating" => Ok(Task::Rating),
            "ranking" => Ok(Task::Ranking),
            _ => Err(RecoError::UnknownTask(name.to_owned())),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Task::Rating => write!(f, "rating"),
            Task::Ranking => write!(f, "ranking"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlsConfig {
    pub n_factors: usize,
    pub n_epochs: usize,
    /// Strength of the ridge penalty on each latent vector
    pub reg: f64,
    pub task: Task,
    pub seed: u64,
    /// Report training and test metrics after every epoch
    pub verbose: bool,
}

impl Default for AlsConfig {
    fn default() -> Self {
        AlsConfig {
            n_factors: 100,
            n_epochs: 20,
            reg: 5.0,
            task: Task::Rating,
            seed: 42,
            verbose: false,
        }
    }
}

/// The entities on the other side of the factorization observed together with one entity, and
/// the corresponding ratings or labels.
#[derive(Debug, Clone, Default)]
struct Observations {
    others: Vec<usize>,
    targets: Vec<f64>,
}

impl Observations {

    fn push(&mut self, other: u32, target: f64) {
        self.others.push(other as usize);
        self.targets.push(target);
    }
}

/// Observations per entity from a rating matrix, ordered by the id of the other entity.
fn observations_from_ratings(rows: &RatingMatrix) -> Vec<Observations> {
    rows.iter()
        .map(|row| {
            let mut entries: Vec<(u32, f64)> = row.iter().map(|(k, v)| (*k, *v)).collect();
            entries.sort_by_key(|entry| entry.0);

            let mut observations = Observations::default();
            for (other, target) in entries {
                observations.push(other, target);
            }
            observations
        })
        .collect()
}

/// Observations per entity from flat implicit feedback arrays, selecting the triples which
/// belong to each entity. Triples with ids outside the trained ranges are ignored.
fn observations_from_implicit(
    feedback: &ImplicitFeedback,
    n_users: usize,
    n_items: usize,
) -> (Vec<Observations>, Vec<Observations>) {

    let mut by_user = vec![Observations::default(); n_users];
    let mut by_item = vec![Observations::default(); n_items];

    for (user, item, label) in feedback.triples() {
        if (user as usize) < n_users && (item as usize) < n_items {
            by_user[user as usize].push(item, label);
            by_item[item as usize].push(user, label);
        }
    }

    (by_user, by_item)
}

/// Matrix of the given shape with entries drawn from a normal distribution truncated at two
/// standard deviations. Draws outside the truncation bounds are redrawn.
pub fn truncated_normal<R: Rng>(
    shape: (usize, usize),
    mean: f64,
    scale: f64,
    rng: &mut R,
) -> Array2<f64> {
    Array2::from_shape_simple_fn(shape, || loop {
        let z: f64 = rng.sample(StandardNormal);
        if z.abs() <= 2.0 {
            return mean + scale * z;
        }
    })
}

/// Alternating least squares matrix factorization. `fit` produces an immutable `FittedAls`.
#[derive(Debug, Clone)]
pub struct Als {
    config: AlsConfig,
}

impl Als {

    pub fn new(n_factors: usize, n_epochs: usize, reg: f64, task: Task, seed: u64) -> Self {
        Als::from_config(AlsConfig { n_factors, n_epochs, reg, task, seed, verbose: false })
    }

    pub fn from_config(config: AlsConfig) -> Self {
        Als { config }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn config(&self) -> &AlsConfig {
        &self.config
    }

    /// Initial user and item factors, determined by the seed.
    pub fn initial_factors(&self, n_users: usize, n_items: usize) -> (Array2<f64>, Array2<f64>) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        let pu = truncated_normal((n_users, self.config.n_factors), 0.0, INIT_SCALE, &mut rng);
        let qi = truncated_normal((n_items, self.config.n_factors), 0.0, INIT_SCALE, &mut rng);

        (pu, qi)
    }

    /// Run `n_epochs` epochs, each of which first solves the factors of every user with ratings
    /// against the current item factors, and then the factors of every rated item against the
    /// freshly updated user factors. Rating tasks read the ratings of the dataset, ranking tasks
    /// its flat implicit feedback.
    pub fn fit(&self, dataset: &Dataset) -> Result<FittedAls> {

        let (mut pu, mut qi) = self.initial_factors(dataset.n_users(), dataset.n_items());

        let (by_user, by_item) = match self.config.task {
            Task::Rating => (
                observations_from_ratings(dataset.train_user()),
                observations_from_ratings(dataset.train_item()),
            ),
            Task::Ranking => {
                if dataset.train_implicit().is_empty() {
                    warn!("fitting a ranking model without implicit feedback");
                }
                observations_from_implicit(
                    dataset.train_implicit(),
                    dataset.n_users(),
                    dataset.n_items(),
                )
            },
        };

        // Both tasks only update entities which have ratings
        let users: Vec<usize> = active_entities(dataset.train_user());
        let items: Vec<usize> = active_entities(dataset.train_item());

        info!("fitting ALS ({} task, {} factors) for {} users and {} items", self.config.task,
            self.config.n_factors, users.len(), items.len());

        for epoch in 1..=self.config.n_epochs {
            let epoch_start = Instant::now();

            solve_all(&mut pu, &qi, &users, &by_user, self.config.reg, "user")?;
            solve_all(&mut qi, &pu, &items, &by_item, self.config.reg, "item")?;

            debug!("epoch {} took {}ms", epoch, utils::to_millis(epoch_start.elapsed()));

            if self.config.verbose {
                let view = FactorView {
                    task: self.config.task,
                    pu: &pu,
                    qi: &qi,
                    default_prediction: dataset.global_mean(),
                };
                report(epoch, &view, dataset);
            }
        }

        Ok(FittedAls {
            task: self.config.task,
            pu,
            qi,
            default_prediction: dataset.global_mean(),
            rated: dataset.rated_items(),
        })
    }
}

fn active_entities(rows: &RatingMatrix) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|&(_, row)| !row.is_empty())
        .map(|(index, _)| index)
        .collect()
}

/// Replace the factors of each of the given entities by the solution of its regularized normal
/// equations against the fixed factors. An entity without observations gets the zero vector.
fn solve_all(
    factors: &mut Array2<f64>,
    fixed: &Array2<f64>,
    entities: &[usize],
    observations: &[Observations],
    reg: f64,
    entity: &'static str,
) -> Result<()> {

    for &index in entities {
        let observed = &observations[index];

        if observed.others.is_empty() {
            factors.row_mut(index).fill(0.0);
            continue;
        }

        let targets = Array1::from(observed.targets.clone());
        let (gram, rhs) = linalg::normal_equations(fixed, &observed.others, &targets, reg);

        let solution = linalg::solve_cholesky(gram.view(), &rhs)
            .ok_or(RecoError::Singular { entity, index: index as u32 })?;

        factors.row_mut(index).assign(&solution);
    }

    Ok(())
}

fn report(epoch: usize, view: &FactorView, dataset: &Dataset) {
    let (metric, train, test) = match view.task {
        Task::Rating => ("rmse",
            evaluate::rmse(view, dataset, Split::Train),
            evaluate::rmse(view, dataset, Split::Test)),
        Task::Ranking => ("accuracy",
            evaluate::accuracy(view, dataset, Split::Train),
            evaluate::accuracy(view, dataset, Split::Test)),
    };

    info!("epoch {}: training {} {:?}, test {} {:?}", epoch, metric, train, metric, test);
}

/// Borrowed factors, so that metrics can be computed while fitting.
struct FactorView<'a> {
    task: Task,
    pu: &'a Array2<f64>,
    qi: &'a Array2<f64>,
    default_prediction: f64,
}

impl<'a> FactorView<'a> {

    fn lookup(&self, user: u32, item: u32) -> Lookup<f64> {
        let (u, i) = (user as usize, item as usize);
        if u >= self.pu.nrows() || i >= self.qi.nrows() {
            return Lookup::NotFound;
        }

        let dot = self.pu.row(u).dot(&self.qi.row(i));

        Lookup::Found(match self.task {
            Task::Rating => utils::clamp(dot, MIN_RATING, MAX_RATING),
            Task::Ranking => if utils::sigmoid(dot) >= 0.5 { 1.0 } else { 0.0 },
        })
    }
}

impl<'a> Predictor for FactorView<'a> {

    fn predict(&self, user: u32, item: u32) -> f64 {
        self.lookup(user, item).unwrap_or(self.default_prediction)
    }

    fn default_prediction(&self) -> f64 {
        self.default_prediction
    }
}

/// A fitted ALS model. The factors are read-only after fitting, so predictions and
/// recommendations can be issued concurrently.
#[derive(Debug, Clone)]
pub struct FittedAls {
    task: Task,
    pu: Array2<f64>,
    qi: Array2<f64>,
    default_prediction: f64,
    rated: SparseBinaryMatrix,
}

impl FittedAls {

    fn view(&self) -> FactorView<'_> {
        FactorView {
            task: self.task,
            pu: &self.pu,
            qi: &self.qi,
            default_prediction: self.default_prediction,
        }
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn user_factors(&self) -> &Array2<f64> {
        &self.pu
    }

    pub fn item_factors(&self) -> &Array2<f64> {
        &self.qi
    }

    /// Clamped rating for rating tasks, the binary label for ranking tasks. `NotFound` for
    /// unknown ids.
    pub fn lookup(&self, user: u32, item: u32) -> Lookup<f64> {
        self.view().lookup(user, item)
    }

    /// Recommend up to `n_rec` items the user has not rated yet. All unrated items are scored
    /// at once by their dot product with the user factors, clamped to the rating range. Ranking
    /// tasks use the same clamped scores instead of their logistic predictions. See
    /// `recommend::select` for the difference between sorted and sampled recommendations.
    /// Unknown users receive no recommendations.
    pub fn recommend_user<R: Rng>(
        &self,
        user: u32,
        n_rec: usize,
        random_rec: bool,
        rng: &mut R,
    ) -> Result<Vec<Recommendation>> {

        let rated = match self.rated.get(user as usize) {
            Some(rated) if (user as usize) < self.pu.nrows() => rated,
            _ => return Ok(Vec::new()),
        };

        let unrated: Vec<usize> = (0..self.qi.nrows())
            .filter(|item| !rated.contains(&(*item as u32)))
            .collect();

        if unrated.is_empty() {
            return Ok(Vec::new());
        }

        let scores = self.qi.select(Axis(0), &unrated).dot(&self.pu.row(user as usize));

        let candidates = unrated.iter()
            .zip(scores.iter())
            .map(|(item, score)| ScoredItem {
                item: *item as u32,
                score: utils::clamp(*score, MIN_RATING, MAX_RATING),
            })
            .collect();

        recommend::select(candidates, n_rec, random_rec, rng)
    }
}

impl Predictor for FittedAls {

    fn predict(&self, user: u32, item: u32) -> f64 {
        self.lookup(user, item).unwrap_or(self.default_prediction)
    }

    fn default_prediction(&self) -> f64 {
        self.default_prediction
    }
}
