use anyhow::Result;
use clap::Parser;
use dreamquest::app::{run_export_book, run_export_video, run_play};
use dreamquest::cli::{Cli, Commands};
use dreamquest::config::Config;
use dreamquest::diagnostics::check_dependencies;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        None | Some(Commands::Play { resume: false }) => {
            run_play(config, cli.quiet, cli.verbose, false).await?;
        }
        Some(Commands::Play { resume: true }) => {
            run_play(config, cli.quiet, cli.verbose, true).await?;
        }
        Some(Commands::ExportBook { out }) => {
            run_export_book(&config, out)?;
        }
        Some(Commands::ExportVideo { out }) => {
            run_export_video(&config, out)?;
        }
        Some(Commands::Check) => {
            check_dependencies();
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/dreamquest/config.toml)
/// 3. Built-in defaults with environment variable overrides
/// 4. CLI flag overrides win over everything
fn load_config(cli: &Cli) -> Result<Config> {
    let config = if let Some(path) = cli.config.as_deref() {
        Config::load(path)?
    } else {
        Config::load_or_default(&Config::default_path())?
    };

    let mut config = config.with_env_overrides();
    if let Some(url) = &cli.base_url {
        config.generator.base_url = url.clone();
    }
    if let Some(language) = &cli.language {
        config.story.language = language.clone();
    }
    if cli.no_narration {
        config.audio.narration = false;
    }
    if cli.no_ambient {
        config.audio.ambient = false;
    }
    Ok(config)
}
