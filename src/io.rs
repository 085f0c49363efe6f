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

use std::fs::File;
use std::io::{stdout, Write};
use std::path::Path;

use serde_derive::Serialize;

use crate::error::Result;
use crate::recommend::Recommendation;
use crate::stats::{NamedRating, Renaming};

/// Reads a CSV input file. We expect NO headers, and a user-item-rating triple per line
/// with tab separation.
pub fn csv_reader<P: AsRef<Path>>(file: P) -> Result<csv::Reader<File>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .from_path(file)?;

    Ok(reader)
}

/// All ratings of a reader, failing on the first malformed record.
pub fn ratings_from_csv<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<Vec<NamedRating>> {
    let mut ratings = Vec::new();

    for record in reader.deserialize() {
        let rating: NamedRating = record?;
        ratings.push(rating);
    }

    Ok(ratings)
}

/// Struct used for JSON serialization of recommendations. Field names will be used in JSON.
#[derive(Serialize)]
struct ScoredName<'a> {
    item: &'a str,
    score: f64,
}

#[derive(Serialize)]
struct Recommendations<'a> {
    for_user: &'a str,
    recommended_items: Vec<ScoredName<'a>>,
}

/// Output the computed recommendations in JSON format, one user per line, using the original
/// identifiers from the inputfile. If a `recommendations_path` is supplied, we write to a file at
/// the specified path, otherwise, we output to stdout.
pub fn write_recommendations(
    recommendations: &[(u32, Vec<Recommendation>)],
    renaming: &Renaming,
    recommendations_path: Option<String>,
) -> Result<()> {

    let out: Box<dyn Write> = match recommendations_path {
        Some(path) => Box::new(File::create(Path::new(&path))?),
        _ => Box::new(stdout())
    };

    write_json_lines(recommendations, renaming, out)
}

fn write_json_lines<W: Write>(
    recommendations: &[(u32, Vec<Recommendation>)],
    renaming: &Renaming,
    mut out: W,
) -> Result<()> {

    for (user_index, recommended) in recommendations.iter() {

        let for_user = renaming.user_name(*user_index);

        let recommended_items = recommended.iter()
            .map(|&(item_index, score)| ScoredName { item: renaming.item_name(item_index), score })
            .collect();

        let line = serde_json::to_string(&Recommendations { for_user, recommended_items })?;

        writeln!(out, "{}", line)?;
    }

    out.flush()?;

    Ok(())
}
