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

use std::env;
use std::error::Error;
use std::fs::File;

use getopts::Options;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use cfreco::io;
use cfreco::recommend::Recommendation;
use cfreco::stats::{DataDictionary, Renaming};
use cfreco::{Als, AlsConfig, Dataset, KnnConfig, RecoError, Task, UserKnn};

fn main() {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Input file name (required). The input consists of ratings \
        which users gave to items. The input file must contain a user, item and rating triple \
        per line, separated by tabs.", "PATH");
    opts.optopt("o", "outputfile", "Output file name (optional, output will be written to stdout \
        by default).", "PATH");
    opts.optopt("m", "model", "Model to fit, either 'knn' or 'als' (optional, defaults to \
        'als').", "MODEL");
    opts.optopt("c", "config", "JSON file with the model configuration (optional, defaults are \
        used for missing fields).", "PATH");
    opts.optopt("n", "num-recommendations", "Number of items to recommend per user (optional, \
        defaults to 10).", "NUMBER");
    opts.optopt("", "num-neg", "Number of sampled negatives per rating for the ranking task \
        (optional, defaults to 1).", "NUMBER");
    opts.optflag("r", "random", "Sample recommendations proportionally to their scores instead \
        of returning the highest scored items");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if matches.opt_present("h") {
        return print_usage_and_exit(&program, opts, None);
    }

    let ratings_path = match matches.opt_str("i") {
        Some(path) => path,
        None => return print_usage_and_exit(
            &program,
            opts,
            Some("Please specify an inputfile via --inputfile."),
        ),
    };

    let n_rec: usize = match matches.opt_get_default("n", 10) {
        Ok(n_rec) => n_rec,
        Err(failure) => {
            let hint = format!("Problem with option 'n': {}", failure);
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    let num_neg: usize = match matches.opt_get_default("num-neg", 1) {
        Ok(num_neg) => num_neg,
        Err(failure) => {
            let hint = format!("Problem with option 'num-neg': {}", failure);
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    let model = matches.opt_str("m").unwrap_or_else(|| String::from("als"));
    if model != "knn" && model != "als" {
        let hint = format!("Unknown model '{}', use 'knn' or 'als'.", model);
        return print_usage_and_exit(&program, opts, Some(&hint));
    }

    let settings = Settings {
        ratings_path,
        recommendations_path: matches.opt_str("o"),
        config_path: matches.opt_str("c"),
        model,
        n_rec,
        num_neg,
        random_rec: matches.opt_present("r"),
    };

    if let Err(failure) = compute_recommendations(settings) {
        eprintln!("{}", failure);
        std::process::exit(1);
    }
}

fn print_usage_and_exit(
    program: &str,
    opts: Options,
    hint: Option<&str>
) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
}

struct Settings {
    ratings_path: String,
    recommendations_path: Option<String>,
    config_path: Option<String>,
    model: String,
    n_rec: usize,
    num_neg: usize,
    random_rec: bool,
}

fn read_config<T>(config_path: &Option<String>) -> Result<T, RecoError>
    where T: Default + serde::de::DeserializeOwned {

    match *config_path {
        Some(ref path) => Ok(serde_json::from_reader(File::open(path)?)?),
        None => Ok(T::default()),
    }
}

fn compute_recommendations(settings: Settings) -> Result<(), Box<dyn Error>> {

    info!("Reading {} to compute data statistics", settings.ratings_path);

    let mut reader = io::csv_reader(&settings.ratings_path)?;
    let ratings = io::ratings_from_csv(&mut reader)?;
    let data_dict = DataDictionary::from_ratings(&ratings);

    info!(
        "Found {} ratings between {} users and {} items.",
        data_dict.num_ratings(),
        data_dict.num_users(),
        data_dict.num_items(),
    );

    let dataset = Dataset::from_ratings(&data_dict.index(&ratings), &[]);
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let recommendations: Vec<(u32, Vec<Recommendation>)> = if settings.model == "knn" {
        let config: KnnConfig = read_config(&settings.config_path)?;
        let k = config.k;
        let model = UserKnn::from_config(config).fit(&dataset);

        recommend_all(&dataset, |user, rng| {
            model.top_n(user, k, settings.n_rec, settings.random_rec, rng)
        }, &mut rng)?
    } else {
        let config: AlsConfig = read_config(&settings.config_path)?;
        rng = ChaCha8Rng::seed_from_u64(config.seed);

        let dataset = if config.task == Task::Ranking {
            dataset.with_sampled_negatives(settings.num_neg, &mut rng)
        } else {
            dataset
        };
        let model = Als::from_config(config).fit(&dataset)?;

        recommend_all(&dataset, |user, rng| {
            model.recommend_user(user, settings.n_rec, settings.random_rec, rng)
        }, &mut rng)?
    };

    let renaming: Renaming = data_dict.into();

    info!("Writing recommendations...");
    io::write_recommendations(&recommendations, &renaming, settings.recommendations_path)?;

    Ok(())
}

/// Recommendations for every user. Users for which recommending fails get an empty list and are
/// reported in a summary. Fails if no user received recommendations at all.
fn recommend_all<F>(
    dataset: &Dataset,
    recommend: F,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<(u32, Vec<Recommendation>)>, RecoError>
    where F: Fn(u32, &mut ChaCha8Rng) -> Result<Vec<Recommendation>, RecoError> {

    let num_users = dataset.n_users();
    let mut recommendations = Vec::with_capacity(num_users);
    let mut last_failure = None;
    let mut num_failed = 0;

    for user in 0..num_users as u32 {
        match recommend(user, rng) {
            Ok(recommended) => recommendations.push((user, recommended)),
            Err(failure) => {
                debug!("No recommendations for user {}: {}", user, failure);
                num_failed += 1;
                last_failure = Some(failure);
                recommendations.push((user, Vec::new()));
            },
        }
    }

    if let Some(failure) = last_failure {
        if num_failed == num_users {
            return Err(failure);
        }
        warn!("{} of {} users received no recommendations, last failure: {}", num_failed,
            num_users, failure);
    }

    Ok(recommendations)
}
