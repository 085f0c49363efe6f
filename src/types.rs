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

use fnv::{FnvHashMap, FnvHashSet};
use rand::Rng;

/// A single observed (user, item, rating) triple with consecutive integer ids.
pub type Rating = (u32, u32, f64);

pub type RatingRow = FnvHashMap<u32, f64>;
pub type RatingMatrix = Vec<RatingRow>;

pub type SparseBinaryMatrix = Vec<FnvHashSet<u32>>;

pub fn new_rating_matrix(num_rows: usize) -> RatingMatrix {
    vec![FnvHashMap::with_capacity_and_hasher(0, Default::default()); num_rows]
}

/// Flat parallel arrays of (user, item, label) triples for implicit feedback.
#[derive(Debug, Clone, Default)]
pub struct ImplicitFeedback {
    pub users: Vec<u32>,
    pub items: Vec<u32>,
    pub labels: Vec<f64>,
}

impl ImplicitFeedback {

    pub fn from_triples(triples: &[Rating]) -> Self {
        let mut feedback = ImplicitFeedback {
            users: Vec::with_capacity(triples.len()),
            items: Vec::with_capacity(triples.len()),
            labels: Vec::with_capacity(triples.len()),
        };

        for &(user, item, label) in triples {
            feedback.users.push(user);
            feedback.items.push(item);
            feedback.labels.push(label);
        }

        feedback
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn triples(&self) -> impl Iterator<Item = Rating> + '_ {
        self.users.iter()
            .zip(self.items.iter())
            .zip(self.labels.iter())
            .map(|((user, item), label)| (*user, *item, *label))
    }
}

/// Ratings of a training split indexed by user and by item, plus the held-out test split. The
/// dataset is immutable once constructed; both indexes are built from the same triples, so every
/// (user, item) entry of `train_user` has a mirror entry with the same rating in `train_item`.
#[derive(Debug, Clone)]
pub struct Dataset {
    n_users: usize,
    n_items: usize,
    train_user: RatingMatrix,
    train_item: RatingMatrix,
    global_mean: f64,
    test: Vec<Rating>,
    train_implicit: ImplicitFeedback,
    test_implicit: ImplicitFeedback,
}

impl Dataset {

    /// Index the training ratings. The number of users and items is derived from the largest ids
    /// in the training split, test ratings for ids beyond that range refer to unknown entities.
    /// Repeated (user, item) pairs keep the last rating.
    pub fn from_ratings(train: &[Rating], test: &[Rating]) -> Self {

        let n_users = train.iter().map(|r| r.0 as usize + 1).max().unwrap_or(0);
        let n_items = train.iter().map(|r| r.1 as usize + 1).max().unwrap_or(0);

        let mut train_user = new_rating_matrix(n_users);
        let mut train_item = new_rating_matrix(n_items);

        for &(user, item, rating) in train {
            train_user[user as usize].insert(item, rating);
            train_item[item as usize].insert(user, rating);
        }

        let (sum, count) = train_user.iter()
            .flat_map(|row| row.values())
            .fold((0.0, 0usize), |(sum, count), rating| (sum + rating, count + 1));

        let global_mean = if count > 0 { sum / count as f64 } else { 0.0 };

        Dataset {
            n_users,
            n_items,
            train_user,
            train_item,
            global_mean,
            test: test.to_vec(),
            train_implicit: ImplicitFeedback::default(),
            test_implicit: ImplicitFeedback::default(),
        }
    }

    /// Attach flat implicit feedback arrays for ranking models.
    pub fn with_implicit(mut self, train: ImplicitFeedback, test: ImplicitFeedback) -> Self {
        self.train_implicit = train;
        self.test_implicit = test;
        self
    }

    /// Derive implicit feedback from the observed ratings: every training rating becomes a
    /// positive example, complemented by `num_neg` sampled unrated items per positive which are
    /// labeled 0. Test ratings become positives with the same number of sampled negatives.
    pub fn with_sampled_negatives<R: Rng>(self, num_neg: usize, rng: &mut R) -> Self {

        let train = self.sample_negatives(self.train_triples(), num_neg, rng);
        let test = self.sample_negatives(self.test.clone(), num_neg, rng);

        self.with_implicit(train, test)
    }

    fn sample_negatives<R: Rng>(
        &self,
        positives: Vec<Rating>,
        num_neg: usize,
        rng: &mut R,
    ) -> ImplicitFeedback {

        let mut triples = Vec::with_capacity(positives.len() * (num_neg + 1));

        for (user, item, _) in positives {
            triples.push((user, item, 1.0));

            let rated = self.train_user.get(user as usize);
            let num_unrated = self.n_items - rated.map(|row| row.len()).unwrap_or(0);

            if num_unrated == 0 {
                continue;
            }

            for _ in 0..num_neg {
                loop {
                    let candidate = rng.gen_range(0..self.n_items as u32);
                    let seen = rated.map(|row| row.contains_key(&candidate)).unwrap_or(false);
                    if !seen {
                        triples.push((user, candidate, 0.0));
                        break;
                    }
                }
            }
        }

        ImplicitFeedback::from_triples(&triples)
    }

    pub fn n_users(&self) -> usize {
        self.n_users
    }

    pub fn n_items(&self) -> usize {
        self.n_items
    }

    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    pub fn train_user(&self) -> &RatingMatrix {
        &self.train_user
    }

    pub fn train_item(&self) -> &RatingMatrix {
        &self.train_item
    }

    pub fn test(&self) -> &[Rating] {
        &self.test
    }

    pub fn train_implicit(&self) -> &ImplicitFeedback {
        &self.train_implicit
    }

    pub fn test_implicit(&self) -> &ImplicitFeedback {
        &self.test_implicit
    }

    pub fn num_ratings(&self) -> usize {
        self.train_user.iter().map(|row| row.len()).sum()
    }

    /// The ids of the items rated by each user.
    pub fn rated_items(&self) -> SparseBinaryMatrix {
        self.train_user.iter()
            .map(|row| row.keys().cloned().collect())
            .collect()
    }

    pub fn train_triples(&self) -> Vec<Rating> {
        let mut triples = Vec::with_capacity(self.num_ratings());
        for (user, row) in self.train_user.iter().enumerate() {
            for (item, rating) in row.iter() {
                triples.push((user as u32, *item, *rating));
            }
        }
        triples.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        triples
    }
}


#[cfg(test)]
mod tests {

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn ratings() -> Vec<Rating> {
        vec![(0, 0, 5.0), (0, 1, 3.0), (1, 1, 4.0), (2, 2, 1.0), (0, 1, 2.0)]
    }

    #[test]
    fn indexes_are_symmetric() {
        let dataset = Dataset::from_ratings(&ratings(), &[]);

        assert_eq!(dataset.n_users(), 3);
        assert_eq!(dataset.n_items(), 3);

        for (user, row) in dataset.train_user().iter().enumerate() {
            for (item, rating) in row.iter() {
                assert_eq!(dataset.train_item()[*item as usize][&(user as u32)], *rating);
            }
        }

        assert_eq!(dataset.num_ratings(), 4);
        assert_eq!(dataset.train_user()[0][&1], 2.0);
    }

    #[test]
    fn global_mean_over_distinct_pairs() {
        let dataset = Dataset::from_ratings(&ratings(), &[]);
        assert!((dataset.global_mean() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_dataset() {
        let dataset = Dataset::from_ratings(&[], &[]);
        assert_eq!(dataset.n_users(), 0);
        assert_eq!(dataset.global_mean(), 0.0);
    }

    #[test]
    fn sampled_negatives_are_unrated() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let dataset = Dataset::from_ratings(&ratings(), &[(1, 0, 3.0)])
            .with_sampled_negatives(2, &mut rng);

        let train = dataset.train_implicit();
        assert_eq!(train.users.len(), train.items.len());
        assert_eq!(train.items.len(), train.labels.len());

        let positives = train.triples().filter(|t| t.2 == 1.0).count();
        assert_eq!(positives, dataset.num_ratings());

        for (user, item, label) in train.triples() {
            if label == 0.0 {
                assert!(!dataset.train_user()[user as usize].contains_key(&item));
            }
        }

        assert_eq!(dataset.test_implicit().triples().filter(|t| t.2 == 1.0).count(), 1);
    }
}
