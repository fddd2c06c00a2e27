//! CPAL playback sink for the replay tool.
//!
//! Decouples the engine's mixing worker from the audio device with a
//! bounded crossbeam channel of mixed-buffer chunks. The CPAL callback
//! keeps a small pending queue of samples: it tops the queue up from the
//! channel, pays out the device buffer from it, and covers any shortfall
//! with silence. The callback never blocks.

use std::collections::VecDeque;

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, info, warn};

/// Ring depth in buffer chunks. At 256-frame engine buffers this holds
/// roughly 370 ms of audio at 44.1 kHz.
const RING_BUFFER_CHUNKS: usize = 64;

/// Audio device sink fed by the engine's audio callback.
pub struct CpalSink {
    // Held alive for the duration of playback.
    _stream: Stream,
    sender: Sender<Vec<f32>>,
}

impl CpalSink {
    /// Open the default output device at the engine's format.
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("no audio output device found"))?;

        info!(
            device = device.name().unwrap_or_else(|_| "unknown".to_string()).as_str(),
            "Using audio output device"
        );

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (sender, receiver) = bounded::<Vec<f32>>(RING_BUFFER_CHUNKS);

        let stream = device
            .build_output_stream(
                &config,
                {
                    // Samples received but not yet paid out to the device;
                    // engine chunks and device buffers need not line up.
                    let mut pending: VecDeque<f32> = VecDeque::new();
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        pay_out(&receiver, &mut pending, data);
                    }
                },
                |err| {
                    warn!(error = %err, "Audio output stream error");
                },
                None,
            )
            .context("building audio output stream")?;

        stream.play().context("starting audio output stream")?;
        debug!(sample_rate, channels, "Audio output stream running");

        Ok(Self {
            _stream: stream,
            sender,
        })
    }

    /// Producer handle for the engine's audio callback.
    pub fn sender(&self) -> Sender<Vec<f32>> {
        self.sender.clone()
    }
}

/// Fill one device buffer from the pending queue, topping the queue up
/// from the channel first. Whatever the engine has not delivered in time
/// becomes silence.
fn pay_out(ring: &Receiver<Vec<f32>>, pending: &mut VecDeque<f32>, out: &mut [f32]) {
    while pending.len() < out.len() {
        match ring.try_recv() {
            Ok(chunk) => pending.extend(chunk),
            Err(_) => break,
        }
    }
    for slot in out.iter_mut() {
        *slot = pending.pop_front().unwrap_or(0.0);
    }
}

/// Push a mixed buffer into the ring, dropping it when the device has
/// fallen behind.
pub fn push_buffer(sender: &Sender<Vec<f32>>, samples: &[f32]) {
    match sender.try_send(samples.to_vec()) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            debug!("Audio ring buffer full, dropping buffer");
        }
        Err(TrySendError::Disconnected(_)) => {
            warn!("Audio output stream closed");
        }
    }
}
