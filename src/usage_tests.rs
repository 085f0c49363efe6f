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

#[cfg(test)]
mod tests {

    use std::sync::Mutex;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use scoped_pool::Pool;

    use crate::{Als, Dataset, Predictor, Task, UserKnn};
    use crate::stats::{DataDictionary, NamedRating, Renaming};

    fn named_ratings() -> Vec<NamedRating> {
        vec![
            (String::from("alice"), String::from("apple"), 5.0),
            (String::from("alice"), String::from("dog"), 4.0),
            (String::from("alice"), String::from("pony"), 1.0),
            (String::from("bob"), String::from("apple"), 4.0),
            (String::from("bob"), String::from("pony"), 2.0),
            (String::from("bob"), String::from("bike"), 5.0),
            (String::from("charles"), String::from("pony"), 5.0),
            (String::from("charles"), String::from("bike"), 2.0),
            (String::from("charles"), String::from("dog"), 1.0),
            (String::from("dora"), String::from("apple"), 5.0),
            (String::from("dora"), String::from("dog"), 5.0),
        ]
    }

    #[test]
    fn programmatic_usage() {

        /* Our input data comprises of ratings which users gave to items. The identifiers used
           can be strings of arbitrary length and structure. */
        let ratings = named_ratings();

        /* Internally, we use consecutive integer ids. The data dictionary maps from string to
           integer identifiers. */
        let data_dict = DataDictionary::from_ratings(&ratings);
        let dataset = Dataset::from_ratings(&data_dict.index(&ratings), &[]);

        assert_eq!(dataset.n_users(), data_dict.num_users());
        assert_eq!(dataset.n_items(), data_dict.num_items());

        let mut rng = ChaCha8Rng::seed_from_u64(42);

        /* A user-based neighborhood model, which predicts ratings from the ratings of the most
           similar users, corrected by user and item biases. */
        let knn = UserKnn::new("cosine", 2, 1, true).unwrap().fit(&dataset);

        /* A latent factor model fitted with alternating least squares. */
        let als = Als::new(2, 10, 0.1, Task::Rating, 42).fit(&dataset).unwrap();

        let dora = data_dict.user_index("dora").unwrap();
        let bike = data_dict.item_index("bike").unwrap();

        for &prediction in &[knn.predict(dora, bike), als.predict(dora, bike)] {
            assert!(prediction >= 0.0 && prediction <= 5.0);
        }

        let from_knn = knn.top_n(dora, 2, 1, false, &mut rng).unwrap();
        let from_als = als.recommend_user(dora, 2, false, &mut rng).unwrap();

        /* The renaming data structure helps us map the integer ids back to the original
           string ids. */
        let renaming = Renaming::from(data_dict);

        for &(item, _) in from_knn.iter().chain(from_als.iter()) {
            let name = renaming.item_name(item);
            assert!(name == "pony" || name == "bike");
        }
    }

    #[test]
    fn fitted_models_answer_concurrent_predictions() {

        let ratings = named_ratings();
        let data_dict = DataDictionary::from_ratings(&ratings);
        let dataset = Dataset::from_ratings(&data_dict.index(&ratings), &[]);

        let als = Als::new(3, 5, 0.5, Task::Rating, 7).fit(&dataset).unwrap();
        let knn = UserKnn::new("pearson", 3, 1, true).unwrap().fit(&dataset);

        let sequential: Vec<(f64, f64)> = (0..dataset.n_users() as u32)
            .flat_map(|user| (0..dataset.n_items() as u32).map(move |item| (user, item)))
            .map(|(user, item)| (als.predict(user, item), knn.predict(user, item)))
            .collect();

        let concurrent = Mutex::new(vec![(0.0, 0.0); sequential.len()]);
        let n_items = dataset.n_items();

        let pool = Pool::new(4);
        pool.scoped(|scope| {
            for user in 0..dataset.n_users() {
                let (als, knn, concurrent) = (&als, &knn, &concurrent);
                scope.execute(move || {
                    for item in 0..n_items {
                        let predictions = (
                            als.predict(user as u32, item as u32),
                            knn.predict(user as u32, item as u32),
                        );
                        if let Ok(mut concurrent) = concurrent.lock() {
                            concurrent[user * n_items + item] = predictions;
                        }
                    }
                });
            }
        });
        pool.shutdown();

        assert_eq!(concurrent.into_inner().unwrap(), sequential);
    }
}
