mod cli;

use anyhow::{bail, Context, Result};
use brandmark::{
    adaptive_outline_for_str, analyze_files, validate_file, ColorSwatch, FileDescriptor,
    ImageOutcome, JsonFileStore, PipelineConfig, QualityThresholds, RemoveBgClient, RemoveBgConfig,
    Session,
};
use clap::Parser;
use cli::{Cli, Command};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Command::Validate { files } => {
            let thresholds = QualityThresholds {
                analysis_max_side: config.analysis_max_side,
                ..QualityThresholds::default()
            };
            for path in files {
                let result = validate_file(&path, &thresholds)
                    .with_context(|| format!("reading {}", path.display()))?;
                println!("{}: {}", path.display(), serde_json::to_string_pretty(&result)?);
            }
        }

        Command::Analyze { original, processed } => {
            let analysis = analyze_files(&original, processed.as_deref(), &config)?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }

        Command::Process {
            files,
            store,
            operator,
            api_key,
            sequential,
        } => {
            let remover = RemoveBgClient::new(&RemoveBgConfig::default().with_api_key(api_key))?;
            let store = JsonFileStore::new(store);
            let config = PipelineConfig {
                operator: operator.unwrap_or(config.operator),
                parallel: config.parallel && !sequential,
                ..config
            };
            let mut session = Session::open(&store, config)?;

            for path in files {
                let file = FileDescriptor::from_path(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                match session.stage(file) {
                    Ok(result) => println!(
                        "{}: accepted, score {} ({})",
                        path.display(),
                        result.score,
                        result.confidence.label()
                    ),
                    Err(e) => println!("{}: rejected: {}", path.display(), e),
                }
            }
            if session.staged().is_empty() {
                bail!("no files were accepted");
            }

            let outcome = session.process(&remover, &store)?;
            println!("{}", outcome.batch.summary());
            for image in &outcome.batch.outcomes {
                match image {
                    ImageOutcome::Processed { filename, choice, .. } => println!(
                        "  {}: background {} (choices: {})",
                        filename,
                        choice.default,
                        join_colors(&choice.candidates)
                    ),
                    ImageOutcome::Failed { filename, reason, .. } => {
                        println!("  {}: failed: {}", filename, reason)
                    }
                }
            }
            if let Some(remaining) = outcome.batch.credits.remaining {
                println!("credits remaining: {}", remaining);
            }
            if let Err(e) = outcome.persistence {
                eprintln!("warning: batch was not saved: {}", e);
            }
        }

        Command::History { store, json } => {
            let store = JsonFileStore::new(store);
            let session = Session::open(&store, config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(session.history())?);
            } else if session.history().is_empty() {
                println!("no batches stored");
            } else {
                for (i, batch) in session.history().iter().enumerate() {
                    println!("[{}] {}", i, batch.summary());
                    for (j, image) in batch.outcomes.iter().enumerate() {
                        match image.choice() {
                            Some(choice) => println!("    [{}] {} on {}", j, image.filename(), choice.default),
                            None => println!("    [{}] {} (failed)", j, image.filename()),
                        }
                    }
                }
            }
        }

        Command::Override {
            store,
            batch,
            image,
            color,
        } => {
            let color: ColorSwatch = color.parse()?;
            let store = JsonFileStore::new(store);
            let mut session = Session::open(&store, config)?;
            session.override_background(batch, image, color, &store)?;
            println!("batch {} image {}: default background is now {}", batch, image, color);
        }

        Command::Outline { color } => {
            let outline = adaptive_outline_for_str(&color);
            println!("{}", outline.to_css());
        }
    }

    Ok(())
}

fn join_colors(colors: &[ColorSwatch]) -> String {
    colors
        .iter()
        .map(ColorSwatch::to_hex)
        .collect::<Vec<_>>()
        .join(", ")
}
