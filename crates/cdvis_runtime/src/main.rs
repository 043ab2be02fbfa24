//! CDVis viewer
//!
//! Opens a window, loads a folder of CT slices and raymarches it.
//!
//! ```text
//! cdvis [--config cdvis.toml] [--folder path/to/series]
//! ```

mod app;
mod config;
mod controls;
mod error;
mod gpu;
mod input;
mod loader;
mod scene;

use std::path::PathBuf;

use crate::app::ViewerApp;
use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};
use crate::error::{AppError, Result};

/// Command line options
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    folder: Option<PathBuf>,
}

fn parse_args<I>(args: I) -> Result<Args>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "--config" => &mut parsed.config,
            "--folder" => &mut parsed.folder,
            other => return Err(AppError::Args(format!("unknown argument '{}'", other))),
        };
        let value = args
            .next()
            .ok_or_else(|| AppError::Args(format!("{} needs a path", arg)))?;
        *slot = Some(PathBuf::from(value));
    }
    Ok(parsed)
}

fn run() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = AppConfig::load(&config_path)?;
    config.print_summary();

    ViewerApp::new(config, args.folder).run()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
