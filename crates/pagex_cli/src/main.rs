//! pagex CLI
//!
//! Drive scripted navigations through a transition host on a deterministic
//! clock and print what would be rendered, frame by frame.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pagex_animation::ManualClock;
use pagex_core::NavigationEvent;
use pagex_transition::{ItemKeyframes, TransitionConfig, TransitionHost};
use serde_json::json;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod demo;
mod script;

use script::{Step, Trigger};

#[derive(Parser)]
#[command(name = "pagex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Page transition simulator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a navigation script and print each rendered frame
    Run {
        /// Steps: `/path`, `/path@delay_ms`, or `!/path` for a failed navigation
        #[arg(required = true)]
        steps: Vec<String>,

        /// Transition config (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Route patterns to register (defaults to the script's paths)
        #[arg(short, long = "route")]
        routes: Vec<String>,

        /// Item keyframes (JSON with `enter` and `exit` maps)
        #[arg(short, long)]
        keyframes: Option<PathBuf>,

        /// Items per page
        #[arg(long, default_value = "2")]
        items: usize,

        /// Frame interval in milliseconds
        #[arg(long, default_value = "16")]
        frame_ms: f64,

        /// Print every Nth frame
        #[arg(long, default_value = "1")]
        every: u64,

        /// Stop after this many frames
        #[arg(long, default_value = "10000")]
        max_frames: u64,

        /// Print frames as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Inspect transition configs
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective config as TOML
    Show {
        /// Config file (defaults when omitted)
        path: Option<PathBuf>,
    },

    /// Validate a config file
    Check {
        /// Config file
        path: PathBuf,
    },
}

struct RunOptions {
    frame_ms: f64,
    every: u64,
    max_frames: u64,
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            steps,
            config,
            routes,
            keyframes,
            items,
            frame_ms,
            every,
            max_frames,
            json,
        } => cmd_run(
            &steps,
            config.as_deref(),
            routes,
            keyframes.as_deref(),
            items,
            RunOptions {
                frame_ms,
                every,
                max_frames,
                json,
            },
        ),

        Commands::Config { command } => match command {
            ConfigCommands::Show { path } => cmd_config_show(path.as_deref()),
            ConfigCommands::Check { path } => cmd_config_check(&path),
        },
    }
}

fn load_config(path: Option<&Path>) -> Result<TransitionConfig> {
    match path {
        Some(path) => TransitionConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display())),
        None => Ok(TransitionConfig::default()),
    }
}

fn cmd_run(
    raw_steps: &[String],
    config_path: Option<&Path>,
    mut routes: Vec<String>,
    keyframes_path: Option<&Path>,
    items: usize,
    options: RunOptions,
) -> Result<()> {
    if !(options.frame_ms.is_finite() && options.frame_ms > 0.0) {
        anyhow::bail!("Frame interval must be positive, got {}", options.frame_ms);
    }

    let steps = script::parse(raw_steps)?;
    let config = load_config(config_path)?;

    let keyframes: ItemKeyframes = match keyframes_path {
        Some(path) => demo::load_keyframes(path)?,
        None => demo::default_keyframes(),
    };

    if routes.is_empty() {
        for step in &steps {
            if !routes.contains(&step.path) {
                routes.push(step.path.clone());
            }
        }
    }
    let table = demo::routes(&routes, &keyframes, items)?;

    info!(
        "Running {} steps over {} routes ({}ms frames)",
        steps.len(),
        routes.len(),
        options.frame_ms
    );

    let clock = ManualClock::new();
    let mut host = TransitionHost::with_time_source(table, config, clock.clone());
    let mut queue: VecDeque<Step> = steps.into();
    let mut last_step_at = 0.0;
    let mut frame: u64 = 0;

    loop {
        while let Some(step) = queue.front() {
            let due = match step.trigger {
                Trigger::Idle => host.is_idle(),
                Trigger::After(delay) => host.now_ms() - last_step_at >= delay,
            };
            if !due {
                break;
            }
            let Some(step) = queue.pop_front() else {
                break;
            };
            fire(&mut host, &step)?;
            last_step_at = host.now_ms();
        }

        if queue.is_empty() && host.is_idle() {
            break;
        }
        if frame >= options.max_frames {
            warn!("Stopped after {} frames with the host still busy", frame);
            break;
        }

        host.frame()?;
        if frame % options.every.max(1) == 0 {
            report(&host, frame, options.json);
        }
        clock.advance(options.frame_ms);
        frame += 1;
    }

    report(&host, frame, options.json);
    info!(
        "Finished at {}ms on {}",
        host.now_ms(),
        host.context().current_route().unwrap_or("-")
    );
    Ok(())
}

fn fire(host: &mut TransitionHost, step: &Step) -> Result<()> {
    let path = step.path.clone();
    if step.fails {
        host.navigate(NavigationEvent::Start(path.clone()))?;
        host.navigate(NavigationEvent::Error(path))?;
        return Ok(());
    }

    host.navigate(NavigationEvent::Start(path.clone()))?;
    let transition = host
        .navigate(NavigationEvent::Complete(path.clone()))
        .with_context(|| format!("Failed to navigate to {}", path))?;
    match transition {
        Some(transition) => info!(
            "{} at {}ms: {:?} ({} -> {})",
            path,
            host.now_ms(),
            transition.outcome,
            transition.from,
            transition.to
        ),
        None => warn!("{} matched no route", path),
    }
    Ok(())
}

fn report(host: &TransitionHost, frame: u64, as_json: bool) {
    let views = host.views();

    if as_json {
        let pages: Vec<_> = views
            .iter()
            .map(|view| {
                json!({
                    "route": view.route,
                    "role": view.role.name(),
                    "enter": view.enter_progress,
                    "exit": view.exit_progress,
                    "items": view
                        .styles()
                        .iter()
                        .map(|style| json!({
                            "transform": style.transform(),
                            "opacity": style.opacity(),
                        }))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        let line = json!({
            "frame": frame,
            "time_ms": host.now_ms(),
            "state": host.state().name(),
            "pages": pages,
        });
        println!("{}", line);
        return;
    }

    println!(
        "#{:<5} {:>7.1}ms  {}",
        frame,
        host.now_ms(),
        host.state()
    );
    for view in &views {
        let exit = view
            .exit_progress
            .map(|progress| format!("{:.3}", progress))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "    {:<16} {:<9} enter={:.3} exit={}",
            view.route,
            view.role.name(),
            view.enter_progress,
            exit
        );
        for style in view.styles() {
            println!("        {}", style);
        }
    }
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    let text = config
        .to_toml_string()
        .context("Failed to serialize config")?;
    print!("{}", text);
    Ok(())
}

fn cmd_config_check(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;
    info!(
        "{} is valid: enter {}ms, exit {}ms, throttle {}ms, {} spring overrides",
        path.display(),
        config.enter_duration_ms,
        config.exit_duration_ms,
        config.throttle_ms,
        config.springs.len()
    );
    Ok(())
}
