use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use keysheet::{convert, sheet};

#[derive(Parser)]
#[command(author, version, about = "MIDI to virtual-piano sheet converter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a MIDI file to a playback sheet (.txt, UTF-16LE JSON)
    Convert {
        /// Path to input MIDI file
        input: PathBuf,

        /// Path to output sheet file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Song name embedded in the sheet (defaults to the file stem)
        #[arg(long)]
        name: Option<String>,
    },
    /// Dump a MIDI file as editable per-track note JSON
    Tracks {
        /// Path to input MIDI file
        input: PathBuf,

        /// Path to output JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render editable note JSON back into a MIDI file
    Render {
        /// Path to input JSON file
        input: PathBuf,

        /// Path to output MIDI file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Strip whitespace from a sheet file in place (or to a new file)
    Compact {
        /// Path to input sheet file
        input: PathBuf,

        /// Path to output sheet file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    match Cli::parse().command {
        Command::Convert {
            input,
            output,
            name,
        } => convert_cmd(&input, output, name),
        Command::Tracks { input, output } => tracks_cmd(&input, output),
        Command::Render { input, output } => render_cmd(&input, output),
        Command::Compact { input, output } => compact_cmd(&input, output),
    }
}

fn convert_cmd(input: &Path, output: Option<PathBuf>, name: Option<String>) -> Result<()> {
    let file = convert::read_midi_file(input)
        .with_context(|| format!("failed to load {}", input.display()))?;
    let name = name.unwrap_or_else(|| file_stem(input));
    let sheet = convert::playback_sheet(&file, &name);
    log::info!(
        "{}: {} notes at {} bpm",
        name,
        sheet.song_notes.len(),
        sheet.bpm
    );

    let output = output.unwrap_or_else(|| input.with_extension("txt"));
    sheet::write_sheet_file(&output, std::slice::from_ref(&sheet))
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "{} -> {} ({} notes, {} bpm)",
        input.display(),
        output.display(),
        sheet.song_notes.len(),
        sheet.bpm
    );
    Ok(())
}

fn tracks_cmd(input: &Path, output: Option<PathBuf>) -> Result<()> {
    let file = convert::read_midi_file(input)
        .with_context(|| format!("failed to load {}", input.display()))?;
    let (song, stats) = convert::editable_from_midi(&file);
    if stats.dropped() > 0 {
        eprintln!("warning: dropped {} unpairable events", stats.dropped());
    }

    let output = output.unwrap_or_else(|| input.with_extension("json"));
    let json = serde_json::to_string_pretty(&song)?;
    fs::write(&output, json).with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "{} -> {} ({} tracks)",
        input.display(),
        output.display(),
        song.tracks.len()
    );
    Ok(())
}

fn render_cmd(input: &Path, output: Option<PathBuf>) -> Result<()> {
    let json = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let song: keysheet::EditableSong =
        serde_json::from_str(&json).with_context(|| format!("bad note json in {}", input.display()))?;
    let bytes = convert::midi_from_editable(&song)?;

    let output = output.unwrap_or_else(|| input.with_extension("mid"));
    fs::write(&output, bytes).with_context(|| format!("failed to write {}", output.display()))?;
    println!("{} -> {}", input.display(), output.display());
    Ok(())
}

fn compact_cmd(input: &Path, output: Option<PathBuf>) -> Result<()> {
    let bytes = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let text = sheet::from_utf16le_bytes(&bytes)
        .with_context(|| format!("{} is not a utf-16le sheet file", input.display()))?;
    let cleaned = sheet::compact(&text);

    let output = output.unwrap_or_else(|| input.to_path_buf());
    fs::write(&output, sheet::to_utf16le_bytes(&cleaned))
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("{} -> {}", input.display(), output.display());
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string())
}
