//! Shared fixtures for the engine integration tests: synthesized WAV
//! files and on-disk game manifests.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use alt_engine::AltSoundEngine;

/// Write a 16-bit PCM WAV of constant amplitude at `path`.
pub fn write_wav(path: &Path, rate: u32, channels: u16, frames: u32, amplitude: f32) {
    let bytes_per_sample = 2u32;
    let data_len = frames * channels as u32 * bytes_per_sample;

    let mut f = std::fs::File::create(path).expect("create wav");
    f.write_all(b"RIFF").unwrap();
    f.write_all(&(36 + data_len).to_le_bytes()).unwrap();
    f.write_all(b"WAVEfmt ").unwrap();
    f.write_all(&16u32.to_le_bytes()).unwrap();
    f.write_all(&1u16.to_le_bytes()).unwrap();
    f.write_all(&channels.to_le_bytes()).unwrap();
    f.write_all(&rate.to_le_bytes()).unwrap();
    f.write_all(&(rate * channels as u32 * bytes_per_sample).to_le_bytes())
        .unwrap();
    f.write_all(&(channels * bytes_per_sample as u16).to_le_bytes())
        .unwrap();
    f.write_all(&16u16.to_le_bytes()).unwrap();
    f.write_all(b"data").unwrap();
    f.write_all(&data_len.to_le_bytes()).unwrap();

    let sample = (amplitude.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
    for _ in 0..frames {
        for _ in 0..channels {
            f.write_all(&sample.to_le_bytes()).unwrap();
        }
    }
}

/// One sample declaration for [`setup_game`].
pub struct WavSpec {
    pub file: &'static str,
    pub frames: u32,
    pub amplitude: f32,
}

/// Build `<base>/altsound/testgame/` with the given manifest, behavior
/// file, and mono 44.1 kHz WAV fixtures. Returns the base path.
pub fn setup_game(test: &str, csv: &str, ini: &str, wavs: &[WavSpec]) -> PathBuf {
    let base = std::env::temp_dir().join(format!("alt-it-{}-{test}", std::process::id()));
    let game_dir = base.join("altsound").join("testgame");
    std::fs::create_dir_all(&game_dir).expect("create game dir");

    std::fs::write(game_dir.join("altsound.csv"), csv).unwrap();
    if !ini.is_empty() {
        std::fs::write(game_dir.join("behavior.ini"), ini).unwrap();
    }
    for spec in wavs {
        write_wav(&game_dir.join(spec.file), 44100, 1, spec.frames, spec.amplitude);
    }
    base
}

pub type Capture = Arc<Mutex<Vec<Vec<f32>>>>;

/// Install an audio callback that copies every mixed buffer.
pub fn attach_capture(engine: &AltSoundEngine) -> Capture {
    let capture: Capture = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&capture);
    engine.set_audio_callback(move |samples, _rate, _channels| {
        sink.lock().unwrap().push(samples.to_vec());
    });
    capture
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

pub fn buffer_is_silent(buffer: &[f32]) -> bool {
    buffer.iter().all(|s| s.abs() < 1e-4)
}
