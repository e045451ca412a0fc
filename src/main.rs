use anyhow::{Context, Result};
use bookcast::app::{BookPlan, ConvertRequest, convert, plan};
use bookcast::cli::{Cli, Commands, ConfigAction};
use bookcast::config::Config;
use bookcast::diagnostics::{check_dependencies, print_report};
use bookcast::error::BookcastError;
use bookcast::exec::{CommandExecutor, SystemCommandExecutor};
use bookcast::pipeline::RunEvent;
use clap::{CommandFactory, Parser};
use crossbeam_channel::{Sender, unbounded};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

fn main() -> Result<()> {
    let cli = Cli::parse();
    bookcast::logging::init(cli.verbose, cli.quiet);

    match cli.command {
        None => run_convert(&cli)?,
        Some(Commands::Plan {
            ref src,
            ref book,
            ref tuning,
            json,
        }) => {
            let mut config = load_config(cli.config.as_deref())?;
            tuning.apply(&mut config);
            let executor: Arc<dyn CommandExecutor> = Arc::new(SystemCommandExecutor::new());
            let book_plan = plan(&config, src, &book.overrides(), executor)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan_json(&book_plan))?);
            } else {
                print_plan(&book_plan);
            }
        }
        Some(Commands::Check) => {
            let config = load_config(cli.config.as_deref())?;
            let results = check_dependencies(&SystemCommandExecutor::new(), &config);
            if !print_report(&results) {
                std::process::exit(1);
            }
        }
        Some(Commands::Config { ref action }) => match action {
            ConfigAction::Dump => {
                let config = load_config(cli.config.as_deref())?;
                print!("{}", toml::to_string_pretty(&config)?);
            }
            ConfigAction::Path => match cli.config.clone().or_else(Config::default_path) {
                Some(path) => println!("{}", path.display()),
                None => anyhow::bail!("No configuration directory on this platform"),
            },
        },
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "bookcast",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/bookcast/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)?,
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => Config::default(),
        },
    };

    // Apply environment variable overrides
    Ok(config.with_env_overrides())
}

fn run_convert(cli: &Cli) -> Result<()> {
    let (Some(src), Some(dst)) = (cli.src.clone(), cli.dst.clone()) else {
        anyhow::bail!("--src and --dst are required");
    };
    let mut config = load_config(cli.config.as_deref())?;
    cli.apply(&mut config);

    let request = ConvertRequest {
        src,
        dst,
        overrides: cli.book.overrides(),
    };
    let executor: Arc<dyn CommandExecutor> = Arc::new(SystemCommandExecutor::new());

    let (events, progress) = if cli.quiet {
        (None, None)
    } else {
        let (tx, handle) = spawn_progress(cli.verbose);
        (Some(tx), Some(handle))
    };

    let result = convert(&config, &request, executor, events);
    if let Some(handle) = progress {
        handle.join().ok();
    }
    let conversion = result?;

    if !cli.quiet {
        let report = &conversion.report;
        println!(
            "{} {} episode(s) of {} ({}) in {}",
            "✓".green(),
            report.published.len(),
            conversion.book.title.bold(),
            humantime::format_duration(std::time::Duration::from_secs(
                report.total_duration().as_secs()
            )),
            conversion.output_dir.display()
        );
        println!("  feed:     {}", conversion.feeds.rss.display());
        println!("  playlist: {}", conversion.feeds.m3u.display());
    }

    if !conversion.report.is_success() {
        return Err(BookcastError::EpisodesFailed {
            failed: conversion.report.failed_positions(),
        }
        .into());
    }
    Ok(())
}

/// Renders pipeline events as a progress bar until the sender is dropped.
fn spawn_progress(verbosity: u8) -> (Sender<RunEvent>, JoinHandle<()>) {
    let (tx, rx) = unbounded::<RunEvent>();

    let handle = thread::spawn(move || {
        let pb = ProgressBar::new(0);
        pb.set_style(
            // SAFETY: hardcoded template string, always valid
            #[allow(clippy::expect_used)]
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} episodes ({elapsed})")
                .expect("hardcoded progress bar template")
                .progress_chars("#>-"),
        );

        for event in rx {
            match event {
                RunEvent::Planned { .. } => pb.inc_length(1),
                RunEvent::Published(episode) => {
                    pb.inc(1);
                    if verbosity > 0 {
                        pb.println(format!(
                            "  {} {} ({})",
                            "●".green(),
                            episode.file_name,
                            humantime::format_duration(std::time::Duration::from_secs(
                                episode.duration.as_secs()
                            ))
                        ));
                    }
                }
                RunEvent::Failed { position, message } => {
                    pb.println(format!("Episode {position} failed: {message}").red().to_string());
                }
            }
        }
        pb.finish_and_clear();
    });

    (tx, handle)
}

fn print_plan(book_plan: &BookPlan) {
    println!(
        "{} by {} → {} episode(s)",
        book_plan.book.title.bold(),
        book_plan.book.author,
        book_plan.episodes.len()
    );
    for episode in &book_plan.episodes {
        println!(
            "{} {:>9.3}s",
            book_plan.book.episode_file_name(episode.position).green(),
            episode.total().as_secs_f64()
        );
        for range in &episode.ranges {
            println!(
                "    {} {:.3}–{:.3}",
                range.source.path().display(),
                range.from.as_secs_f64(),
                range.to.as_secs_f64()
            );
        }
    }
}

fn plan_json(book_plan: &BookPlan) -> serde_json::Value {
    let episodes: Vec<serde_json::Value> = book_plan
        .episodes
        .iter()
        .map(|episode| {
            let ranges: Vec<serde_json::Value> = episode
                .ranges
                .iter()
                .map(|range| {
                    serde_json::json!({
                        "file": range.source.path().display().to_string(),
                        "from": range.from.as_secs_f64(),
                        "to": range.to.as_secs_f64(),
                    })
                })
                .collect();
            serde_json::json!({
                "position": episode.position,
                "file_name": book_plan.book.episode_file_name(episode.position),
                "duration": episode.total().as_secs_f64(),
                "ranges": ranges,
            })
        })
        .collect();

    serde_json::json!({
        "book": book_plan.book,
        "episodes": episodes,
    })
}
