use std::env;
use std::fs;

use log::info;
use rs_markov_core::{DatasetService, ServiceConfig};

const SAMPLE: &str = "The cat sat on the mat. The dog sat on the rug. A bird flew over the mat. \
    The cat chased the bird. The dog chased the cat over the rug.";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Everything is stored under RS_MARKOV_DATA_DIR (default "./data")
    let config = ServiceConfig::from_env()?;
    let service = DatasetService::open(config);

    // Optional corpus file given on the command line, the built-in sample otherwise
    let corpus = match env::args().nth(1) {
        Some(path) => fs::read(&path)?,
        None => SAMPLE.as_bytes().to_vec(),
    };

    // Build and cache a model of order 2 for dataset "demo" of group 0
    service.add(0, "demo", &corpus)?;
    info!("cached datasets: {:?}", service.list_cached(0)?);

    // A higher order sticks closer to the corpus
    service.regenerate(0, "demo", 3)?;

    // The sentence count is clamped to 1..=10
    for count in [1, 3, 42] {
        println!("{count} sentence(s): {}", service.generate(0, "demo", count)?);
    }

    // Asking for an unknown dataset
    match service.generate(0, "unknown", 1) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("{e}"),
    }

    // The corpus is kept after removal and the model can be rebuilt
    service.remove(0, "demo")?;
    println!("cached after remove: {:?}", service.list_cached(0)?);
    println!("corpora after remove: {:?}", service.list_datasets(0)?);

    Ok(())
}
