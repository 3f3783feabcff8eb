//! Command-line interface.
//!
//! Flags override the corresponding config-file fields; `--show` and
//! `--version` print and exit without starting the server. The hidden
//! `--worker` flag is how the coordinator re-executes this binary as a
//! serving worker.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::Toggle;

#[derive(Debug, Parser)]
#[command(
    name = "tera-httpd",
    about = "Template-aware multi-process HTTP file server",
    disable_version_flag = true
)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "etc/config.json")]
    pub config: PathBuf,

    /// Listening port [80, 443, or 1024-65535]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Default document root
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Basic authentication gate
    #[arg(short, long, value_enum)]
    pub basic: Option<Toggle>,

    /// Access logging
    #[arg(short, long, value_enum)]
    pub log: Option<Toggle>,

    /// Directory listings for indexless directories
    #[arg(short, long, value_enum)]
    pub indexof: Option<Toggle>,

    /// JavaScript comment/whitespace stripping
    #[arg(short, long, value_enum)]
    pub escapejs: Option<Toggle>,

    /// Print the effective configuration or the definitions file and exit
    #[arg(short, long, value_enum)]
    pub show: Option<Show>,

    /// Print the configured version and exit
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    /// Run as a serving worker (spawned by the coordinator)
    #[arg(long, hide = true)]
    pub worker: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Show {
    Config,
    Define,
}
