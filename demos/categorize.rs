//! Categorize remarks with the built-in hashing embedder and print the wide table.
//!
//! ```text
//! cargo run --example categorize -- [remarks.txt] [config.toml]
//! ```
//!
//! `remarks.txt` holds one remark per line; without it a small sample is used.
//! Set `RUST_LOG=remark_clusters=debug` to follow each stage.

use std::{env, fs, path::Path, process};

use remark_clusters::{config, HashingEmbedder, Pipeline, PipelineConfig};

const SAMPLE: &[&str] = &[
    "Meter display is blank since morning",
    "meter display blank, not showing reading",
    "Display of meter gone blank",
    "Electricity bill amount too high this month",
    "bill amount is very high compared to last month",
    "High bill amount received",
    "Power outage in our street since night",
    "no power supply in street, outage for hours",
    "Street power outage again",
    "Transformer sparking near the school",
];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("remark_clusters=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let texts: Vec<String> = match args.first() {
        Some(path) => match fs::read_to_string(path) {
            Ok(raw) => raw.lines().map(str::to_string).collect(),
            Err(err) => {
                eprintln!("cannot read {path}: {err}");
                process::exit(1);
            }
        },
        None => SAMPLE.iter().map(|s| s.to_string()).collect(),
    };
    let cfg = match args.get(1) {
        Some(path) => config::load(Path::new(path)),
        None => Ok(PipelineConfig {
            assign_noise_to_nearest_cluster: true,
            ..PipelineConfig::default()
        }),
    };

    let result = cfg
        .and_then(|cfg| Pipeline::new(cfg, HashingEmbedder::default()))
        .and_then(|pipeline| pipeline.run_texts(&texts));
    let result = match result {
        Ok(r) => r,
        Err(err) => {
            eprintln!("categorization failed: {err}");
            process::exit(1);
        }
    };

    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
    for column in &result.table.columns {
        println!("== {} ({})", column.name, column.len());
        for text in &column.texts {
            println!("   {text}");
        }
    }
    match serde_json::to_string_pretty(&result.table.long_rows()) {
        Ok(json) => println!("\n{json}"),
        Err(err) => eprintln!("cannot serialize rows: {err}"),
    }
}
