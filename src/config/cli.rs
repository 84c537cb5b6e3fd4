use crate::config::DEFAULT_CONFIG_FILE;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "shiporder-etl")]
#[command(about = "Turns highlighted spreadsheet rows into shiporder XML files")]
pub struct CliArgs {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, help = "JSON or TOML settings file")]
    pub config: PathBuf,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log JSON lines instead of compact text")]
    pub json_logs: bool,

    #[arg(long, help = "Group orders and list the files without writing them")]
    pub dry_run: bool,
}
