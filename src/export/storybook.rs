//! Storybook export: the ordered story log as one self-contained HTML file.
//!
//! Everything is inlined — scene images as data URIs, narration as embedded
//! WAV audio controls, and a small Web Audio rendition of the ambient drone
//! so the artifact plays its own soundtrack with no network dependency.

use crate::defaults::{
    DRONE_CHORD, DRONE_FADE_IN_SECS, DRONE_FADE_OUT_SECS, DRONE_GAIN, EXPORT_STEM,
};
use crate::audio::wav::wrap_raw_clip;
use crate::error::{DreamQuestError, Result};
use crate::story::session::SessionMeta;
use crate::story::types::StoryLogEntry;
use std::fs;
use std::path::{Path, PathBuf};

/// Render the storybook document.
///
/// Entries with empty narrative are skipped regardless of attached media.
/// A narration clip that fails to decode is dropped from its section; the
/// section itself still renders.
pub fn render_storybook(entries: &[StoryLogEntry], meta: &SessionMeta) -> String {
    let mut sections = String::new();

    for entry in entries {
        if entry.narrative.trim().is_empty() {
            continue;
        }

        sections.push_str("    <section class=\"scene\">\n");
        if let Some(image) = &entry.image {
            sections.push_str(&format!(
                "      <img src=\"{}\" alt=\"\">\n",
                html_escape(image)
            ));
        }
        sections.push_str(&format!(
            "      <p>{}</p>\n",
            html_escape(&entry.narrative)
        ));
        if let Some(clip) = &entry.audio {
            match wrap_raw_clip(clip, None) {
                Ok(wav_b64) => sections.push_str(&format!(
                    "      <audio controls src=\"data:audio/wav;base64,{}\"></audio>\n",
                    wav_b64
                )),
                Err(e) => {
                    eprintln!("dreamquest: skipping undecodable narration clip: {}", e);
                }
            }
        }
        sections.push_str("    </section>\n");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <style>
    body {{ background: #101018; color: #e8e4d8; font-family: Georgia, serif;
           max-width: 46rem; margin: 0 auto; padding: 2rem 1rem; }}
    h1 {{ text-align: center; font-weight: normal; letter-spacing: 0.08em; }}
    .scene {{ margin: 3rem 0; }}
    .scene img {{ width: 100%; border-radius: 6px; }}
    .scene p {{ line-height: 1.6; }}
    .scene audio {{ width: 100%; }}
    #ambient {{ position: fixed; top: 1rem; right: 1rem; background: #2a2a3a;
               color: inherit; border: none; padding: 0.5rem 1rem;
               border-radius: 4px; cursor: pointer; }}
  </style>
</head>
<body>
  <button id="ambient">ambient: off</button>
  <h1>{title}</h1>
  <main>
{sections}  </main>
  <script>
{drone_script}  </script>
</body>
</html>
"#,
        lang = html_escape(&meta.language),
        title = html_escape(&format!(
            "{}: {}",
            meta.character_name, meta.theme
        )),
        sections = sections,
        drone_script = drone_script(),
    )
}

/// Web Audio rendition of the ambient drone, generated from the same
/// constants that drive the native synthesizer.
fn drone_script() -> String {
    format!(
        r#"    (function () {{
      var freqs = [{f0}, {f1}, {f2}, {f3}];
      var ctx = null, master = null, nodes = [];
      var button = document.getElementById('ambient');
      function start() {{
        if (master) return;
        ctx = ctx || new (window.AudioContext || window.webkitAudioContext)();
        if (ctx.state === 'suspended') ctx.resume();
        master = ctx.createGain();
        master.gain.setValueAtTime(0, ctx.currentTime);
        master.gain.linearRampToValueAtTime({gain}, ctx.currentTime + {fade_in});
        master.connect(ctx.destination);
        freqs.forEach(function (f, i) {{
          var osc = ctx.createOscillator();
          osc.type = i % 2 ? 'triangle' : 'sine';
          var cents = (Math.random() * 2 - 1) * 5;
          osc.frequency.value = f * Math.pow(2, cents / 1200);
          var vca = ctx.createGain();
          var lfo = ctx.createOscillator();
          lfo.frequency.value = 0.1 + Math.random() * 0.2;
          var depth = ctx.createGain();
          depth.gain.value = 0.12;
          lfo.connect(depth).connect(vca.gain);
          osc.connect(vca).connect(master);
          osc.start(); lfo.start();
          nodes.push(osc, lfo);
        }});
      }}
      function stop() {{
        if (!master) return;
        master.gain.linearRampToValueAtTime(0, ctx.currentTime + {fade_out});
        var old = nodes; nodes = [];
        var oldMaster = master; master = null;
        setTimeout(function () {{
          old.forEach(function (n) {{ n.stop(); n.disconnect(); }});
          oldMaster.disconnect();
        }}, {fade_out} * 1000);
      }}
      button.addEventListener('click', function () {{
        if (master) {{ stop(); button.textContent = 'ambient: off'; }}
        else {{ start(); button.textContent = 'ambient: on'; }}
      }});
    }})();
"#,
        f0 = DRONE_CHORD[0],
        f1 = DRONE_CHORD[1],
        f2 = DRONE_CHORD[2],
        f3 = DRONE_CHORD[3],
        gain = DRONE_GAIN,
        fade_in = DRONE_FADE_IN_SECS,
        fade_out = DRONE_FADE_OUT_SECS,
    )
}

/// Unique storybook filename: character name plus a timestamp token.
pub fn storybook_filename(character_name: &str) -> String {
    format!(
        "{}-{}-{}.html",
        EXPORT_STEM,
        sanitize_name(character_name),
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    )
}

/// Keep filenames portable: alphanumerics pass, everything else collapses
/// to a single underscore.
pub(crate) fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep && !out.is_empty() {
            out.push('_');
            last_was_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("story");
    }
    out
}

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render and write the storybook into `out_dir`; returns the written path.
pub fn export_storybook(
    entries: &[StoryLogEntry],
    meta: &SessionMeta,
    out_dir: &Path,
) -> Result<PathBuf> {
    let html = render_storybook(entries, meta);
    let path = out_dir.join(storybook_filename(&meta.character_name));
    fs::write(&path, html).map_err(|e| DreamQuestError::Export {
        message: format!("Failed to write {}: {}", path.display(), e),
    })?;
    Ok(path)
}
