//! labwm - a small reparenting X11 window manager
//!
//! Click-to-focus frames with a title bar carrying close, raise/lower and
//! resize controls; move by dragging the title bar; sweep-style resize.

mod cli;
mod config;
mod launcher;
mod shared;
mod signals;
mod wm;

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Command, Overrides};
use crate::config::Config;
use crate::wm::WindowManager;
use crate::wm::display::X11Display;

fn run(overrides: Overrides) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    overrides.apply(&mut config.appearance);

    let shutdown = signals::install()?;
    let display_name = std::env::var("DISPLAY").ok();
    let conn = X11Display::connect(display_name.as_deref(), &config.appearance)?;

    let mut wm = WindowManager::new(conn, &config, shutdown)?;
    wm.run()
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "labwm=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let overrides = match cli::parse(std::env::args().skip(1)) {
        Ok(Command::Run(overrides)) => overrides,
        Ok(Command::Version) => {
            println!("labwm: version {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        Err(cli::UsageError(flag)) => {
            eprintln!("labwm: unrecognised option {:?}\n{}", flag, cli::USAGE);
            return ExitCode::from(2);
        }
    };

    info!("Starting labwm {}", env!("CARGO_PKG_VERSION"));
    match run(overrides) {
        Ok(()) => {
            info!("labwm exited cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
