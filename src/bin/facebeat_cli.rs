use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facebeat::audio::output;
use facebeat::config::EngineConfig;
use facebeat::engine::Engine;
use facebeat::tracking::{ExpressionSource, FeatureId, ScriptFrame, ScriptedSource};
use facebeat::trigger::{TriggerEvent, TriggerListener};

const TICK_RATE_HZ: f64 = 60.0;

#[derive(Parser, Debug)]
#[command(
    name = "facebeat_cli",
    about = "Drive the expression-to-audio trigger engine from a scripted expression timeline"
)]
struct Cli {
    /// Engine configuration file (JSON); defaults are used if absent
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a built-in demo expression script
    Demo {
        #[arg(long, default_value_t = 8.0)]
        seconds: f64,
        /// Play through the default audio output device
        #[arg(long)]
        live: bool,
    },
    /// Replay a scripted expression timeline (JSON array of frames)
    Run {
        #[arg(long)]
        script: PathBuf,
        #[arg(long)]
        live: bool,
    },
    /// Print the default configuration as JSON
    DumpConfig,
}

/// Prints every trigger event as a JSON line.
struct StdoutListener;

impl TriggerListener for StdoutListener {
    fn on_trigger(&mut self, event: &TriggerEvent) {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(err) => eprintln!("Failed to serialize event: {}", err),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path),
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Demo { seconds, live } => {
            let frames = build_demo_script(seconds);
            run_script(config, ScriptedSource::new(frames), live)
        }
        Commands::Run { script, live } => {
            let contents = fs::read_to_string(&script)
                .with_context(|| format!("reading script {}", script.display()))?;
            let frames: Vec<ScriptFrame> = serde_json::from_str(&contents)
                .with_context(|| format!("parsing script {}", script.display()))?;
            run_script(config, ScriptedSource::new(frames), live)
        }
        Commands::DumpConfig => {
            println!("{}", serde_json::to_string_pretty(&EngineConfig::default())?);
            Ok(ExitCode::from(0))
        }
    }
}

fn run_script(config: EngineConfig, mut source: ScriptedSource, live: bool) -> Result<ExitCode> {
    let tick = Duration::from_secs_f64(1.0 / TICK_RATE_HZ);
    let total_ticks = source.remaining();

    if live {
        let (sample_rate, channels) = output::probe_default_output()?;
        let (mut engine, mixer) = Engine::new(config, sample_rate, channels)?;
        engine.add_listener(Box::new(StdoutListener));

        let _handle = output::start(mixer)?;
        for _ in 0..total_ticks {
            let frame = source.next_frame();
            engine.tick(tick, frame.as_ref());
            std::thread::sleep(tick);
        }
        // Let scheduled and in-flight voices ring out before tearing down.
        std::thread::sleep(Duration::from_millis(500));
    } else {
        let sample_rate = 48_000;
        let (mut engine, mut mixer) = Engine::new(config, sample_rate, 2)?;
        engine.add_listener(Box::new(StdoutListener));

        let frames_per_tick = (sample_rate as f64 / TICK_RATE_HZ) as usize;
        let mut scratch = vec![0.0f32; frames_per_tick * 2];
        for _ in 0..total_ticks {
            let frame = source.next_frame();
            engine.tick(tick, frame.as_ref());
            mixer.render(&mut scratch);
        }
    }

    Ok(ExitCode::from(0))
}

/// Synthesize a demo timeline: periodic blinks walk the note sequence while
/// jaw and brow hits land on alternating half-beats.
fn build_demo_script(seconds: f64) -> Vec<ScriptFrame> {
    let total_ticks = (seconds * TICK_RATE_HZ) as usize;
    let mut frames = Vec::with_capacity(total_ticks);

    for tick in 0..total_ticks {
        let t = tick as f64 / TICK_RATE_HZ;
        let mut coefficients = HashMap::new();

        // Blink for ~100ms every 0.75s.
        let blink_phase = t % 0.75;
        if blink_phase < 0.1 {
            coefficients.insert(FeatureId::EyeBlinkLeft, 0.9);
            coefficients.insert(FeatureId::EyeBlinkRight, 0.9);
        }

        // Jaw open pulse every 1.5s, offset from the blinks.
        let jaw_phase = (t + 0.4) % 1.5;
        if jaw_phase < 0.15 {
            coefficients.insert(FeatureId::JawOpen, 0.8);
        }

        // Brow raise every 3s.
        let brow_phase = (t + 1.0) % 3.0;
        if brow_phase < 0.15 {
            coefficients.insert(FeatureId::BrowInnerUp, 0.7);
        }

        // One long smile near the end.
        if t > seconds * 0.7 && t < seconds * 0.7 + 1.0 {
            coefficients.insert(FeatureId::MouthSmileLeft, 0.5);
            coefficients.insert(FeatureId::MouthSmileRight, 0.5);
        }

        frames.push(ScriptFrame {
            valid: true,
            coefficients,
        });
    }

    frames
}
