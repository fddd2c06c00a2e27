//! `alt-replay` — Standalone trace replayer for the AltSound engine.
//!
//! Ingests a recorded sound-command trace and plays it through the same
//! engine the emulator uses. Authors use this to iterate on mix levels
//! and behavior files without recreating sequences on a real table; it
//! is also the quickest way to reproduce a reported problem from a
//! captured trace.
//!
//! ```text
//! alt-replay <pinmame-path> <game> <hardware-gen> <trace-file> [--mute] [--log <level>]
//! ```

mod sink;
mod trace;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use alt_common::{EngineConfig, HardwareGen};
use alt_engine::{AltSoundEngine, LogLevel};

use crate::sink::{push_buffer, CpalSink};
use crate::trace::parse_trace;

struct Args {
    pinmame_path: PathBuf,
    game: String,
    hardware_gen: HardwareGen,
    trace_file: PathBuf,
    mute: bool,
    log_level: LogLevel,
}

fn parse_args() -> Result<Args> {
    let mut positional = Vec::new();
    let mut mute = false;
    let mut log_level = LogLevel::Info;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mute" => mute = true,
            "--log" => {
                let value = args.next().context("--log needs a level")?;
                log_level = LogLevel::parse(&value);
            }
            "--help" | "-h" => {
                println!(
                    "usage: alt-replay <pinmame-path> <game> <hardware-gen> <trace-file> \
                     [--mute] [--log none|info|error|warning|debug]"
                );
                std::process::exit(0);
            }
            other if other.starts_with('-') => bail!("unknown option {other}"),
            _ => positional.push(arg),
        }
    }

    if positional.len() != 4 {
        bail!("expected 4 arguments: <pinmame-path> <game> <hardware-gen> <trace-file>");
    }
    let mut positional = positional.into_iter();
    let pinmame_path = PathBuf::from(positional.next().unwrap_or_default());
    let game = positional.next().unwrap_or_default();
    let gen_token = positional.next().unwrap_or_default();
    let trace_file = PathBuf::from(positional.next().unwrap_or_default());

    let hardware_gen = HardwareGen::parse(&gen_token);
    if hardware_gen == HardwareGen::None {
        warn!(token = gen_token.as_str(), "Unrecognized hardware generation, using pass-through framing");
    }

    Ok(Args {
        pinmame_path,
        game,
        hardware_gen,
        trace_file,
        mute,
        log_level,
    })
}

fn main() -> Result<()> {
    let args = parse_args()?;
    alt_engine::set_logger(None, args.log_level, true);

    let entries = parse_trace(&args.trace_file)?;
    info!(
        commands = entries.len(),
        duration_ms = entries.last().map(|e| e.at_ms).unwrap_or(0),
        trace = %args.trace_file.display(),
        "Trace loaded"
    );

    let config = EngineConfig::default();
    let mut engine = AltSoundEngine::new(&args.pinmame_path, &args.game, config)
        .context("initializing AltSound engine")?;
    engine.set_hardware_gen(args.hardware_gen);

    // Graceful degradation: without a device the replay still runs, so
    // the log output remains useful on headless machines.
    let audio = if args.mute {
        None
    } else {
        match CpalSink::new(config.sample_rate, config.channels) {
            Ok(sink) => Some(sink),
            Err(e) => {
                warn!(error = %e, "Audio output unavailable, replaying silently");
                None
            }
        }
    };
    if let Some(sink) = &audio {
        let sender = sink.sender();
        engine.set_audio_callback(move |samples, _rate, _channels| {
            push_buffer(&sender, samples);
        });
    }
    engine.set_stream_end_callback(|handle| {
        tracing::debug!(stream = %handle, "Stream finished");
    });

    // Replay on the recorded schedule.
    let start = Instant::now();
    let mut dispatched = 0usize;
    let mut failures = 0usize;
    for entry in &entries {
        let due = Duration::from_millis(entry.at_ms);
        let elapsed = start.elapsed();
        if due > elapsed {
            std::thread::sleep(due - elapsed);
        }
        if !engine.process_command(entry.cmd, 0) {
            failures += 1;
        }
        dispatched += 1;
    }

    // Let the tail of the mix play out before tearing down.
    while engine.active_streams() > 0 && start.elapsed() < Duration::from_secs(30) {
        std::thread::sleep(Duration::from_millis(50));
    }
    engine.shutdown();

    info!(dispatched, failures, "Replay finished");
    Ok(())
}
