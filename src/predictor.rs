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

/// Outcome of resolving a (user, item) query against the trained index ranges, checked before
/// anything is computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {

    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Lookup::Found(value) => value,
            Lookup::NotFound => default,
        }
    }

    pub fn is_found(&self) -> bool {
        match *self {
            Lookup::Found(_) => true,
            Lookup::NotFound => false,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Lookup::Found(value),
            None => Lookup::NotFound,
        }
    }
}

/// A fitted model which answers single (user, item) queries. Predictions are always defined,
/// queries the model cannot answer yield `default_prediction()`.
pub trait Predictor {

    fn predict(&self, user: u32, item: u32) -> f64;

    fn default_prediction(&self) -> f64;
}
