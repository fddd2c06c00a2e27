//! Test-only helpers: synthesized WAV fixtures.

use std::io::Write;
use std::path::PathBuf;

/// Shape of the generated PCM.
#[derive(Copy, Clone)]
pub(crate) enum Waveform {
    Silence,
    /// Every sample at this amplitude.
    Constant(f32),
    /// Linear ramp from 0.5 up to 0.9, for position checks.
    Ramp,
}

/// Write a 16-bit PCM WAV under a per-process temp directory and return
/// its path. `name` must be unique within one test binary.
pub(crate) fn write_wav(
    name: &str,
    rate: u32,
    channels: u16,
    frames: u32,
    waveform: Waveform,
) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("alt-engine-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join(name);

    let bytes_per_sample = 2u32;
    let data_len = frames * channels as u32 * bytes_per_sample;

    let mut f = std::fs::File::create(&path).expect("create wav");
    f.write_all(b"RIFF").unwrap();
    f.write_all(&(36 + data_len).to_le_bytes()).unwrap();
    f.write_all(b"WAVEfmt ").unwrap();
    f.write_all(&16u32.to_le_bytes()).unwrap();
    f.write_all(&1u16.to_le_bytes()).unwrap(); // PCM
    f.write_all(&channels.to_le_bytes()).unwrap();
    f.write_all(&rate.to_le_bytes()).unwrap();
    f.write_all(&(rate * channels as u32 * bytes_per_sample).to_le_bytes())
        .unwrap();
    f.write_all(&(channels * bytes_per_sample as u16).to_le_bytes())
        .unwrap();
    f.write_all(&16u16.to_le_bytes()).unwrap();
    f.write_all(b"data").unwrap();
    f.write_all(&data_len.to_le_bytes()).unwrap();

    for i in 0..frames {
        let value = match waveform {
            Waveform::Silence => 0.0,
            Waveform::Constant(a) => a,
            Waveform::Ramp => 0.5 + 0.4 * (i as f32 / frames.max(1) as f32),
        };
        let sample = (value.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        for _ in 0..channels {
            f.write_all(&sample.to_le_bytes()).unwrap();
        }
    }
    path
}
