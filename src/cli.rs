//! Command-line interface for dreamquest
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AI-narrated interactive fiction in the terminal
#[derive(Parser, Debug)]
#[command(
    name = "dreamquest",
    version,
    about = "AI-narrated interactive fiction in the terminal"
)]
pub struct Cli {
    /// Subcommand to execute; defaults to starting a play session
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: progress notices, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Generator endpoint base URL override
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Story language code (e.g., en, de, es)
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Disable spoken narration
    #[arg(long)]
    pub no_narration: bool,

    /// Disable the ambient drone pad
    #[arg(long)]
    pub no_ambient: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start or resume an adventure (default)
    Play {
        /// Resume the saved adventure instead of starting fresh
        #[arg(long)]
        resume: bool,
    },

    /// Export the adventure log as a self-contained storybook HTML file
    ExportBook {
        /// Directory to write the storybook into
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Render the adventure log as a narrated video
    ExportVideo {
        /// Directory to write the video into
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Check system dependencies
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_command() {
        let cli = Cli::try_parse_from(["dreamquest"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
        assert!(cli.base_url.is_none());
        assert!(cli.language.is_none());
        assert!(!cli.no_narration);
        assert!(!cli.no_ambient);
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parse_verbose_levels() {
        let cli = Cli::try_parse_from(["dreamquest", "-v"]).unwrap();
        assert_eq!(cli.verbose, 1);
        let cli = Cli::try_parse_from(["dreamquest", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let cli = Cli::try_parse_from(["dreamquest", "-v", "-v"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn parse_play_resume() {
        let cli = Cli::try_parse_from(["dreamquest", "play", "--resume"]).unwrap();
        match cli.command {
            Some(Commands::Play { resume }) => assert!(resume),
            _ => panic!("Expected Play command"),
        }
    }

    #[test]
    fn parse_export_book() {
        let cli = Cli::try_parse_from(["dreamquest", "export-book", "--out", "/tmp/x"]).unwrap();
        match cli.command {
            Some(Commands::ExportBook { out }) => {
                assert_eq!(out, Some(PathBuf::from("/tmp/x")));
            }
            _ => panic!("Expected ExportBook command"),
        }
    }

    #[test]
    fn parse_export_video_without_out() {
        let cli = Cli::try_parse_from(["dreamquest", "export-video"]).unwrap();
        match cli.command {
            Some(Commands::ExportVideo { out }) => assert!(out.is_none()),
            _ => panic!("Expected ExportVideo command"),
        }
    }

    #[test]
    fn parse_check() {
        let cli = Cli::try_parse_from(["dreamquest", "check"]).unwrap();
        match cli.command {
            Some(Commands::Check) => {}
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn parse_global_config() {
        let cli =
            Cli::try_parse_from(["dreamquest", "--config", "/path/to/config.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
        assert!(cli.command.is_none());
    }

    #[test]
    fn global_options_after_command() {
        let cli =
            Cli::try_parse_from(["dreamquest", "check", "--config", "/tmp/config.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/config.toml")));
    }

    #[test]
    fn parse_quiet_short_flag() {
        let cli = Cli::try_parse_from(["dreamquest", "-q"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn parse_audio_toggles() {
        let cli = Cli::try_parse_from(["dreamquest", "--no-narration", "--no-ambient"]).unwrap();
        assert!(cli.no_narration);
        assert!(cli.no_ambient);
    }

    #[test]
    fn parse_overrides() {
        let cli = Cli::try_parse_from([
            "dreamquest",
            "--base-url",
            "http://localhost:9999",
            "--language",
            "de",
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:9999"));
        assert_eq!(cli.language.as_deref(), Some("de"));
    }

    #[test]
    fn invalid_command_returns_error() {
        let err = Cli::try_parse_from(["dreamquest", "invalid"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn help_flag() {
        let err = Cli::try_parse_from(["dreamquest", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn version_flag() {
        let err = Cli::try_parse_from(["dreamquest", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
