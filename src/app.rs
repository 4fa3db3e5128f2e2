//! Interactive play loop entry point.
//!
//! Orchestrates the complete adventure flow:
//! prompt → generate turn → show + narrate → choose → repeat
//! with save/resume and in-session export commands.

use crate::audio::{AmbientPad, AudioEngine, VoicePlayback};
use crate::config::Config;
use crate::defaults::{HP_MIN, SPEECH_SAMPLE_RATE};
use crate::error::Result;
use crate::export::storybook::export_storybook;
use crate::export::video::{RenderOutcome, VideoRenderer};
use crate::story::generator::Generators;
use crate::story::remote::RemoteGenerators;
use crate::story::save::{load_session, save_session, FileBlobStore};
use crate::story::session::{Session, SessionMeta};
use owo_colors::OwoColorize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Run an interactive play session.
///
/// `resume` loads the saved adventure instead of prompting for a new one;
/// a missing save falls through to the new-story prompt.
pub async fn run_play(config: Config, quiet: bool, verbosity: u8, resume: bool) -> Result<()> {
    let generators = build_generators(&config);
    let store = FileBlobStore::default_store()?;

    let mut session = match resume {
        true => match load_session(&store) {
            Ok(Some(session)) => {
                if !quiet {
                    eprintln!(
                        "Resuming {}'s adventure in {}.",
                        session.meta.character_name, session.meta.theme
                    );
                }
                session
            }
            Ok(None) => {
                eprintln!("No saved adventure found; starting fresh.");
                new_session(&config)?
            }
            Err(e) => {
                eprintln!("Could not load save: {}", e);
                new_session(&config)?
            }
        },
        false => new_session(&config)?,
    };

    // Audio is best-effort: a headless machine plays silently.
    let engine = AudioEngine::global();
    let audio_wanted = config.audio.narration || config.audio.ambient;
    let mut audio_live = false;
    if audio_wanted {
        match engine.start() {
            Ok(()) => audio_live = true,
            Err(e) => {
                if verbosity >= 1 {
                    eprintln!("Audio output unavailable ({}); continuing silently.", e);
                }
            }
        }
    }

    let pad = AmbientPad::new(engine.mix_rate());
    let voice = VoicePlayback::new();
    voice.set_enabled(config.audio.narration && audio_live);
    if audio_live {
        engine.add_source(pad.tap());
        engine.add_source(voice.tap());
        if config.audio.ambient {
            pad.start();
        }
    }

    if session.current_turn().is_none() {
        if !quiet {
            eprintln!("Conjuring the opening scene...");
        }
        session.begin(&generators).await;
    }

    let renderer = VideoRenderer::new();
    print_help();

    // Reprint and narrate only on a fresh scene; commands like save or
    // export leave the screen and any in-flight narration alone.
    let mut last_shown: Option<usize> = None;
    loop {
        let stamp = turn_stamp(&session);
        if last_shown != Some(stamp) {
            show_turn(&session);
            narrate_current(&session, &voice, engine);
            last_shown = Some(stamp);
        }

        if session.hp() <= HP_MIN {
            println!("\n{}", "Your strength fails. The dream ends here.".red());
            if let Err(e) = save_session(&store, &session) {
                eprintln!("Could not save the final chapter: {}", e);
            }
            break;
        }

        let input = read_command()?;
        match input.as_str() {
            "q" => {
                match save_session(&store, &session) {
                    Ok(()) => {
                        if !quiet {
                            eprintln!("Adventure saved. Until next time.");
                        }
                    }
                    Err(e) => eprintln!("Could not save: {}", e),
                }
                break;
            }
            "s" => match save_session(&store, &session) {
                Ok(()) => println!("Saved."),
                Err(e) => eprintln!("Could not save: {}", e),
            },
            "a" => {
                if pad.is_playing() {
                    pad.stop();
                    println!("Ambient pad fading out.");
                } else {
                    pad.start();
                    println!("Ambient pad fading in.");
                }
            }
            "b" => {
                let entries = session.export_log();
                match export_storybook(&entries, &session.meta, &config.output_dir()) {
                    Ok(path) => println!("Storybook saved to {}", path.display()),
                    Err(e) => eprintln!("Storybook export failed: {}", e),
                }
            }
            "v" => {
                let entries = session.export_log();
                match renderer.render(&entries, &session.meta, &config.output_dir()) {
                    Ok(RenderOutcome::Completed(path)) => {
                        println!("Video saved to {}", path.display())
                    }
                    Ok(RenderOutcome::Busy) => println!("A render is already in progress."),
                    Err(e) => eprintln!("Video export failed: {}", e),
                }
            }
            "h" | "?" => print_help(),
            other => {
                let choice_id = match resolve_choice(&session, other) {
                    Some(id) => id,
                    None => {
                        println!("Pick a choice number, or 'h' for commands.");
                        continue;
                    }
                };
                voice.clear();
                if !quiet {
                    eprintln!("The story continues...");
                }
                if !session.choose(&choice_id, &generators).await {
                    println!("That choice is no longer open.");
                }
            }
        }
    }

    if audio_live {
        pad.stop();
        voice.clear();
        engine.shutdown()?;
    }
    Ok(())
}

/// Export the saved adventure as a storybook without entering play.
pub fn run_export_book(config: &Config, out: Option<PathBuf>) -> Result<()> {
    let session = load_saved()?;
    let out_dir = out.unwrap_or_else(|| config.output_dir());
    let path = export_storybook(&session.export_log(), &session.meta, &out_dir)?;
    println!("Storybook saved to {}", path.display());
    Ok(())
}

/// Render the saved adventure as a video without entering play.
pub fn run_export_video(config: &Config, out: Option<PathBuf>) -> Result<()> {
    let session = load_saved()?;
    let out_dir = out.unwrap_or_else(|| config.output_dir());
    match VideoRenderer::new().render(&session.export_log(), &session.meta, &out_dir)? {
        RenderOutcome::Completed(path) => println!("Video saved to {}", path.display()),
        RenderOutcome::Busy => println!("A render is already in progress."),
    }
    Ok(())
}

fn load_saved() -> Result<Session> {
    let store = FileBlobStore::default_store()?;
    load_session(&store)?.ok_or_else(|| crate::error::DreamQuestError::Persistence {
        message: "No saved adventure found. Play first, then export.".to_string(),
    })
}

fn build_generators(config: &Config) -> Generators {
    let remote = Arc::new(RemoteGenerators::new(config.generator.base_url.clone()));
    Generators {
        text: remote.clone(),
        image: remote.clone(),
        speech: remote,
    }
}

fn new_session(config: &Config) -> Result<Session> {
    let character_name = prompt("Name your hero")?;
    let theme = prompt("Pick a theme (e.g. haunted forest, derelict starship)")?;
    Ok(Session::new(SessionMeta {
        character_name,
        theme,
        language: config.story.language.clone(),
    }))
}

fn prompt(label: &str) -> Result<String> {
    loop {
        print!("{}: ", label.bold());
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        let line = line.trim();
        if !line.is_empty() {
            return Ok(line.to_string());
        }
    }
}

fn read_command() -> Result<String> {
    print!("{} ", ">".cyan());
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_lowercase())
}

/// Redraw key for the play loop.
///
/// Choosing archives the current turn into the log before the next turn
/// arrives, so a grown log means a new scene to show and narrate.
fn turn_stamp(session: &Session) -> usize {
    session.log().len()
}

/// Map a numeric reply to the matching choice id of the current turn.
fn resolve_choice(session: &Session, input: &str) -> Option<String> {
    let n: usize = input.parse().ok()?;
    let turn = session.current_turn()?;
    turn.choices.get(n.checked_sub(1)?).map(|c| c.id.clone())
}

fn show_turn(session: &Session) {
    let Some(turn) = session.current_turn() else {
        return;
    };

    println!();
    println!("{}", turn.narrative);
    println!();
    println!("{} {}", "HP:".bold(), hp_bar(session.hp()));
    for (i, choice) in turn.choices.iter().enumerate() {
        println!("  {} {}", format!("[{}]", i + 1).green(), choice.text);
    }
}

fn narrate_current(session: &Session, voice: &VoicePlayback, engine: &AudioEngine) {
    if !voice.is_enabled() {
        return;
    }
    if let Some(clip) = session.current_audio() {
        let rate = match engine.mix_rate() {
            0 => SPEECH_SAMPLE_RATE,
            r => r,
        };
        if let Err(e) = voice.play_clip(clip, rate) {
            eprintln!("Narration skipped: {}", e);
        }
    }
}

fn hp_bar(hp: i32) -> String {
    let filled = (hp / 10).clamp(0, 10) as usize;
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled));
    if hp > 50 {
        format!("{} {}", bar.green(), hp)
    } else if hp > 20 {
        format!("{} {}", bar.yellow(), hp)
    } else {
        format!("{} {}", bar.red(), hp)
    }
}

fn print_help() {
    println!();
    println!("Commands: 1-4 choose, s save, b storybook, v video, a ambient, q save+quit");
}
