//! The mixing worker.
//!
//! A dedicated thread wakes once per buffer period (or immediately on a
//! command notification), pulls PCM from every audible stream, sums it at
//! each stream's effective volume, and hands the mixed buffer to the host
//! sink. The mixer writes raw float sums; the sink clamps if it needs to.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use alt_common::StreamHandle;
use parking_lot::Mutex;
use tracing::debug;

use crate::behavior;
use crate::decoder::DecoderAdapter;
use crate::shared::EngineShared;

/// One stream's parameters, snapshotted for a single mix pass.
struct ActiveStream {
    handle: StreamHandle,
    decoder: Arc<Mutex<DecoderAdapter>>,
    /// gain × ducking × global × master, fixed for this pass.
    volume: f32,
    looped: bool,
    in_channels: usize,
}

/// Why a stream stopped producing frames during a mix pass.
enum EndReason {
    /// Decoder exhausted with loop off: fire the end callback.
    Eof,
    /// Looped stream that yields no frames even after a rewind
    /// (zero-length or failing source): stop it without a callback.
    Stalled,
}

/// Spawn the mixing worker. `shared.running` must already be true.
pub(crate) fn spawn(shared: Arc<EngineShared>) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("alt-mixer".to_string())
        .spawn(move || run(shared))
}

fn run(shared: Arc<EngineShared>) {
    let config = shared.config;
    let out_channels = config.channels.max(1) as usize;
    let frames = config.buffer_frames;
    let mut mix = vec![0.0f32; frames * out_channels];
    let mut temp: Vec<f32> = Vec::new();

    let period =
        Duration::from_secs_f64(frames as f64 / config.sample_rate.max(1) as f64);
    let mut next_due = Instant::now() + period;

    debug!(
        period_ms = period.as_secs_f64() * 1e3,
        frames,
        channels = out_channels,
        "Mixing worker started"
    );

    while shared.running.load(Ordering::Acquire) {
        {
            let mut guard = shared.wake_lock.lock();
            shared.wake.wait_until(&mut guard, next_due);
        }
        if !shared.running.load(Ordering::Acquire) {
            break;
        }

        mix.fill(0.0);

        // Snapshot the audible set under the table locks, then decode
        // outside them through each stream's own decoder mutex.
        let master = shared.master_vol();
        let global = shared.global_vol();
        let active: Vec<ActiveStream> = {
            let channels = shared.channels.lock();
            let streams = shared.streams.lock();
            channels
                .iter()
                .filter_map(|slot| {
                    let entry = streams.get(slot.handle)?;
                    (entry.playing && !entry.paused).then(|| ActiveStream {
                        handle: slot.handle,
                        decoder: Arc::clone(&entry.decoder),
                        volume: slot.gain * slot.ducking * global * master,
                        looped: slot.looped,
                        in_channels: entry.channels.max(1) as usize,
                    })
                })
                .collect()
        };

        for stream in &active {
            match mix_stream(stream, &mut mix, &mut temp, frames, out_channels) {
                None => {}
                Some(EndReason::Eof) => behavior::on_stream_end(&shared, stream.handle),
                Some(EndReason::Stalled) => {
                    debug!(stream = %stream.handle, "Looped stream yields no frames, stopping");
                    behavior::stop_stream(&shared, stream.handle);
                }
            }
        }

        // The mixer always delivers a buffer, silent or not.
        {
            let mut sink = shared.sink.lock();
            if let Some(cb) = sink.as_mut() {
                cb(&mix, config.sample_rate, config.channels as u32);
            }
        }

        next_due += period;
        let now = Instant::now();
        if now >= next_due {
            // Overrun: resynchronize rather than racing to catch up.
            next_due = now + period;
        }
    }

    debug!("Mixing worker stopped");
}

/// Pull up to `frames` frames from one stream and accumulate them into
/// the mix buffer. Returns the reason the stream ended, if it did.
fn mix_stream(
    stream: &ActiveStream,
    mix: &mut [f32],
    temp: &mut Vec<f32>,
    frames: usize,
    out_channels: usize,
) -> Option<EndReason> {
    let in_channels = stream.in_channels;
    temp.resize(frames * in_channels, 0.0);

    let mut decoder = stream.decoder.lock();
    let mut dst_frame = 0usize;
    let mut rewinds = 0u32;

    while dst_frame < frames {
        let want = frames - dst_frame;
        let got = decoder.read_frames(temp, want);

        if got == 0 {
            if stream.looped {
                if rewinds >= 2 {
                    return Some(EndReason::Stalled);
                }
                rewinds += 1;
                decoder.seek_to_start();
                continue;
            }
            return Some(EndReason::Eof);
        }
        rewinds = 0;

        accumulate(
            &mut mix[dst_frame * out_channels..],
            &temp[..got * in_channels],
            got,
            in_channels,
            out_channels,
            stream.volume,
        );
        dst_frame += got;

        if got < want {
            if stream.looped {
                decoder.seek_to_start();
                continue;
            }
            return Some(EndReason::Eof);
        }
    }

    None
}

/// Sum `frames` frames of `src` into `dst` at the given volume.
///
/// Channel mapping: matching counts copy per-channel; otherwise each
/// output channel takes source channel `ch % in_channels` (mono doubles
/// up, multi-channel folds down).
fn accumulate(
    dst: &mut [f32],
    src: &[f32],
    frames: usize,
    in_channels: usize,
    out_channels: usize,
    volume: f32,
) {
    if in_channels == out_channels {
        for (d, s) in dst[..frames * out_channels].iter_mut().zip(src) {
            *d += s * volume;
        }
    } else {
        for frame in 0..frames {
            for ch in 0..out_channels {
                dst[frame * out_channels + ch] +=
                    src[frame * in_channels + (ch % in_channels)] * volume;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_matching_channels() {
        let mut dst = vec![0.1f32; 4];
        let src = vec![0.5f32, 0.5, 0.5, 0.5];
        accumulate(&mut dst, &src, 2, 2, 2, 0.5);
        for &s in &dst {
            assert!((s - 0.35).abs() < 1e-6);
        }
    }

    #[test]
    fn accumulate_mono_to_stereo_duplicates() {
        let mut dst = vec![0.0f32; 4];
        let src = vec![0.25f32, 0.75];
        accumulate(&mut dst, &src, 2, 1, 2, 1.0);
        assert_eq!(dst, vec![0.25, 0.25, 0.75, 0.75]);
    }

    #[test]
    fn accumulate_quad_to_stereo_folds_by_modulo() {
        let mut dst = vec![0.0f32; 2];
        // one frame of 4-channel audio
        let src = vec![0.1f32, 0.2, 0.3, 0.4];
        accumulate(&mut dst, &src, 1, 4, 2, 1.0);
        // out ch0 <- src ch0, out ch1 <- src ch1
        assert!((dst[0] - 0.1).abs() < 1e-6);
        assert!((dst[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn accumulate_sums_multiple_sources() {
        let mut dst = vec![0.0f32; 2];
        accumulate(&mut dst, &[0.5, 0.5], 1, 2, 2, 1.0);
        accumulate(&mut dst, &[0.25, 0.25], 1, 2, 2, 1.0);
        // raw float sums: no clamping in the mixer
        assert_eq!(dst, vec![0.75, 0.75]);
    }
}
