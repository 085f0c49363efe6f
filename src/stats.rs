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

use fnv::FnvHashMap;

use crate::types::Rating;

/// A rating with the original string identifiers of user and item.
pub type NamedRating = (String, String, f64);

/// Maps the string identifiers of users and items to consecutive integer ids.
pub struct DataDictionary {
    user_dict: FnvHashMap<String, u32>,
    item_dict: FnvHashMap<String, u32>,
    num_ratings: u64,
}

impl DataDictionary {

    pub fn num_users(&self) -> usize {
        self.user_dict.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_dict.len()
    }

    pub fn num_ratings(&self) -> u64 {
        self.num_ratings
    }

    pub fn user_index(&self, name: &str) -> Option<u32> {
        self.user_dict.get(name).cloned()
    }

    pub fn item_index(&self, name: &str) -> Option<u32> {
        self.item_dict.get(name).cloned()
    }
}

impl DataDictionary {

    /// Assign ids in order of first appearance.
    pub fn from_ratings<'a, I>(ratings: I) -> Self
        where I: IntoIterator<Item = &'a NamedRating> {

        let mut user_index: u32 = 0;
        let mut user_dict: FnvHashMap<String, u32> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());

        let mut item_index: u32 = 0;
        let mut item_dict: FnvHashMap<String, u32> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());

        let mut num_ratings: u64 = 0;

        for (user, item, _) in ratings {

            if !user_dict.contains_key(user) {
                user_dict.insert(user.clone(), user_index);
                user_index += 1;
            }

            if !item_dict.contains_key(item) {
                item_dict.insert(item.clone(), item_index);
                item_index += 1;
            }

            num_ratings += 1;
        }

        DataDictionary { user_dict, item_dict, num_ratings }
    }

    /// Translate ratings to integer ids, dropping those with unknown users or items.
    pub fn index<'a, I>(&self, ratings: I) -> Vec<Rating>
        where I: IntoIterator<Item = &'a NamedRating> {

        ratings.into_iter()
            .filter_map(|(user, item, rating)| {
                match (self.user_index(user), self.item_index(item)) {
                    (Some(user_index), Some(item_index)) => Some((user_index, item_index, *rating)),
                    _ => None,
                }
            })
            .collect()
    }
}

/// Maps integer ids back to the original string identifiers.
pub struct Renaming {
    user_names: FnvHashMap<u32, String>,
    item_names: FnvHashMap<u32, String>,
}

impl Renaming {

    pub fn user_name(&self, user_index: u32) -> &str {
        &self.user_names[&user_index]
    }

    pub fn item_name(&self, item_index: u32) -> &str {
        &self.item_names[&item_index]
    }
}

impl From<DataDictionary> for Renaming {

    fn from(data_dict: DataDictionary) -> Self {

        let mut user_names: FnvHashMap<u32, String> =
            FnvHashMap::with_capacity_and_hasher(data_dict.num_users(), Default::default());

        let mut item_names: FnvHashMap<u32, String> =
            FnvHashMap::with_capacity_and_hasher(data_dict.num_items(), Default::default());

        for (user, user_id) in data_dict.user_dict.into_iter() {
            user_names.insert(user_id, user);
        }

        for (item, item_id) in data_dict.item_dict.into_iter() {
            item_names.insert(item_id, item);
        }

        Renaming { user_names, item_names }
    }
}


#[cfg(test)]
mod tests {

    use super::*;

    fn named(user: &str, item: &str, rating: f64) -> NamedRating {
        (user.to_owned(), item.to_owned(), rating)
    }

    #[test]
    fn ids_in_order_of_appearance() {
        let ratings = vec![
            named("alice", "apple", 5.0),
            named("bob", "apple", 3.0),
            named("alice", "pony", 4.0),
        ];

        let data_dict = DataDictionary::from_ratings(&ratings);

        assert_eq!(data_dict.num_users(), 2);
        assert_eq!(data_dict.num_items(), 2);
        assert_eq!(data_dict.num_ratings(), 3);
        assert_eq!(data_dict.user_index("bob"), Some(1));
        assert_eq!(data_dict.item_index("pony"), Some(1));
        assert_eq!(data_dict.item_index("dog"), None);

        assert_eq!(data_dict.index(&ratings), vec![(0, 0, 5.0), (1, 0, 3.0), (0, 1, 4.0)]);
        assert!(data_dict.index(&[named("carol", "apple", 1.0)]).is_empty());

        let renaming = Renaming::from(data_dict);
        assert_eq!(renaming.user_name(0), "alice");
        assert_eq!(renaming.item_name(1), "pony");
    }
}
