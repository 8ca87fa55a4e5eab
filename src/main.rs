//! Asperity Search CLI - Fit a rough surface to target checkpoints from a JSON run file.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use asperity_search::{
    compute::{
        ContactModel,
        evolution::{EvolutionEngine, HeightStatistics, SurfaceReport},
    },
    schema::{EvolutionConfig, TargetPoint, TargetSet},
};

/// Contents of a run file.
#[derive(Debug, Serialize, Deserialize)]
struct RunFile {
    #[serde(default)]
    config: EvolutionConfig,
    targets: Vec<TargetPoint>,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_run();
        return;
    }

    if args.len() < 2 {
        eprintln!("Usage: {} <run.json> [--output report.json]", args[0]);
        eprintln!();
        eprintln!("Search for an asperity height distribution matching target checkpoints.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  run.json     Run file with \"config\" and \"targets\"");
        eprintln!("  --output     Write the best surface, statistics and curve as JSON");
        eprintln!();
        eprintln!("An example run file is printed with the --example flag.");
        std::process::exit(1);
    }

    let run_path = PathBuf::from(&args[1]);
    let output_path = args
        .iter()
        .position(|a| a == "--output")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    let run_str = fs::read_to_string(&run_path).unwrap_or_else(|e| {
        eprintln!("Error reading run file: {}", e);
        std::process::exit(1);
    });

    let run: RunFile = serde_json::from_str(&run_str).unwrap_or_else(|e| {
        eprintln!("Error parsing run file: {}", e);
        std::process::exit(1);
    });

    let targets = TargetSet::new(run.targets).unwrap_or_else(|e| {
        eprintln!("Invalid targets: {}", e);
        std::process::exit(1);
    });

    let config = run.config;
    let model = ContactModel::from_config(&config.contact);
    let samples = config.contact.samples;

    println!("Rough Surface Search");
    println!("====================");
    println!(
        "Asperities: {} (heights {}..={} µm)",
        config.surface.asperity_count,
        config.surface.height_bounds.0,
        config.surface.height_bounds.1
    );
    println!("Radii: {:?}", config.surface.radius);
    println!("E*: {:e}", config.contact.elastic_modulus);
    println!(
        "Population: {}, generations: {}",
        config.population.size, config.population.max_generations
    );
    println!("Targets: {}", targets.len());
    println!();

    let mut engine = EvolutionEngine::new(config, targets.clone()).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let result = engine.run_with_callback(|progress| {
        // Print progress every 10%
        let every = (progress.total_generations / 10).max(1);
        if progress.generation % every == 0 {
            println!(
                "  Generation {}/{}: best={:.6e}, mean={:.6e}",
                progress.generation,
                progress.total_generations,
                progress.generation_best,
                progress.avg_score
            );
        }
    });

    println!();
    println!("Stopped: {:?}", result.stats.stop_reason);
    println!("Generations: {}", result.stats.generations);
    println!("Evaluations: {}", result.stats.total_evaluations);
    println!("Best score: {:.6e}", result.stats.best_score);
    println!("Time: {:.2}s", result.stats.elapsed_seconds);

    if let Some(stats) = HeightStatistics::from_heights(&result.best.heights) {
        println!();
        println!("Height distribution:");
        println!("  Mean: {:.3} µm", stats.mean);
        println!("  Variance: {:.3} µm²", stats.variance);
        println!("  Skewness: {:.4}", stats.skewness);
        println!("  Kurtosis: {:.4}", stats.kurtosis);
    }

    if let Some(path) = output_path {
        let report = SurfaceReport::new(&result, &targets, &model, samples).unwrap_or_else(|e| {
            eprintln!("Error building report: {}", e);
            std::process::exit(1);
        });
        if let Err(e) = report.save_json(&path) {
            eprintln!("Error writing report: {}", e);
            std::process::exit(1);
        }
        println!();
        println!("Report written to {}", path.display());
    }
}

fn print_example_run() {
    let run = RunFile {
        config: EvolutionConfig {
            random_seed: Some(42),
            ..Default::default()
        },
        targets: vec![TargetPoint::new(18_384_800_256.0, 149_053.0)],
    };

    match serde_json::to_string_pretty(&run) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing example: {}", e);
            std::process::exit(1);
        }
    }
}
