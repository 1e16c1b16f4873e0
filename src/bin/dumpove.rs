//! Print the event stream of an OVE file, one line per event.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use ovelib::events::decode_and_convert;
use ovelib::{score_to_json, score_to_smf, ConvertOptions, EventHandler, TrackInfo};

/// Dump the contents of an Overture score
#[derive(Parser)]
#[command(name = "dumpove")]
#[command(about = "Print the MIDI events of an Overture (.ove) file")]
struct Cli {
    /// Input .ove file
    file: PathBuf,

    /// Also print track header details
    #[arg(short, long)]
    verbose: bool,

    /// Print the decoded score as JSON instead of events
    #[arg(long)]
    json: bool,

    /// Write a Standard MIDI File
    #[arg(long, value_name = "PATH")]
    midi: Option<PathBuf>,
}

struct Printer {
    verbose: bool,
    quiet: bool,
}

impl Printer {
    fn line(&self, tick: i32, track: impl std::fmt::Display, channel: impl std::fmt::Display, name: &str, data: String) {
        if !self.quiet {
            println!("{tick:>8} {track:>3} {channel:>3} {name:<16} {data}");
        }
    }
}

impl EventHandler for Printer {
    fn header(&mut self, quarter: i32, track_count: usize) {
        if !self.quiet {
            println!("Division: {quarter}, tracks: {track_count}");
        }
    }

    fn track(&mut self, track: usize, info: &TrackInfo) {
        if self.quiet {
            return;
        }
        println!("Track {track}: {}", info.name);
        if self.verbose {
            println!(
                "    channel {}, volume {}, pan {}, patch {}",
                info.channel, info.volume, info.pan, info.patch
            );
        }
    }

    fn note_on(&mut self, track: usize, tick: i32, channel: u8, pitch: u8, velocity: u8) {
        self.line(tick, track, channel, "Note on", format!("{pitch} {velocity}"));
    }

    fn note_off(&mut self, track: usize, tick: i32, channel: u8, pitch: u8, velocity: u8) {
        self.line(tick, track, channel, "Note off", format!("{pitch} {velocity}"));
    }

    fn controller(&mut self, track: usize, tick: i32, channel: u8, controller: u8, value: u8) {
        self.line(tick, track, channel, "Control change", format!("{controller} {value}"));
    }

    fn program(&mut self, track: usize, tick: i32, channel: u8, patch: u8) {
        self.line(tick, track, channel, "Program change", patch.to_string());
    }

    fn pressure(&mut self, track: usize, tick: i32, channel: u8, pressure: u8) {
        self.line(tick, track, channel, "Chan press", pressure.to_string());
    }

    fn pitch_bend(&mut self, track: usize, tick: i32, channel: u8, value: u16) {
        self.line(tick, track, channel, "Pitch bend", value.to_string());
    }

    fn text(&mut self, track: usize, tick: i32, text: &str) {
        self.line(tick, track, "-", "Text", text.to_string());
    }

    fn time_sig(&mut self, measure: usize, tick: i32, numerator: i32, denominator: i32) {
        self.line(tick, "-", "-", "Time signature", format!("{numerator}/{denominator} (measure {measure})"));
    }

    fn key_sig(&mut self, measure: usize, tick: i32, key: i32) {
        self.line(tick, "-", "-", "Key signature", format!("{key} (measure {measure})"));
    }

    fn tempo(&mut self, tick: i32, tempo: i32) {
        self.line(tick, "-", "-", "Tempo", format!("{:.2}", f64::from(tempo) / 100.0));
    }

    fn end_of_file(&mut self) {
        if !self.quiet {
            println!("End of file");
        }
    }

    fn error(&mut self, message: &str) {
        eprintln!("*** Warning! {message}");
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let data = match std::fs::read(&cli.file) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("*** Warning! Failed to read file '{}': {e}", cli.file.display());
            return ExitCode::FAILURE;
        }
    };

    let mut printer = Printer { verbose: cli.verbose, quiet: cli.json };
    let score = match decode_and_convert(&data, &mut printer, &ConvertOptions::default()) {
        Ok(score) => score,
        Err(_) => return ExitCode::FAILURE,
    };

    if cli.json {
        match score_to_json(&score) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("*** Warning! {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    if let Some(path) = cli.midi {
        if let Err(e) = std::fs::write(&path, score_to_smf(&score)) {
            eprintln!("*** Warning! Failed to write '{}': {e}", path.display());
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
