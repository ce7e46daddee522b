use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "aro")]
#[command(about = "Screen recorder with pause/resume and format conversion", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Print version information
    Version,
    /// Convert a WebM recording to another format
    Convert(ConvertCliArgs),
    /// Show or change saved preferences (theme, language)
    Prefs(PrefsCliArgs),
    /// List supported output formats
    Formats,
}

#[derive(ClapArgs, Debug)]
pub struct ConvertCliArgs {
    /// WebM recording to convert
    pub input: PathBuf,
    /// Target format: webm, mp4, gif or ogv
    #[arg(short, long)]
    pub format: String,
    /// Output file (default: input path with the new extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

#[derive(ClapArgs, Debug)]
pub struct PrefsCliArgs {
    /// Dark theme
    #[arg(long, value_enum)]
    pub dark: Option<Toggle>,
    /// Interface language (ja, en, zh)
    #[arg(long)]
    pub locale: Option<String>,
}
