//! Decoder adapter: Symphonia file decode with pull-based frame reads.
//!
//! Wraps Symphonia to turn an audio file into interleaved f32 frames at
//! the engine's output sample rate. The adapter preserves the file's
//! native channel count; the mixer maps channels at accumulation time.
//! Reads are pull-based so the mixing worker can fill exactly one buffer
//! period per stream per tick, and the adapter can seek back to frame
//! zero for looped samples.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::{FormatOptions, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;
use thiserror::Error;
use tracing::{debug, warn};

/// Decoder adapter error type.
#[derive(Error, Debug)]
pub enum DecoderError {
    /// Failed to open or read the audio file.
    #[error("Failed to open audio file: {0}")]
    FileOpen(String),

    /// The audio format/codec is not supported.
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// No decodable audio track in the container.
    #[error("No audio track found in file")]
    NoAudioTrack,

    /// Decoding error from Symphonia.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Pull-based audio file decoder at a fixed output rate.
pub struct DecoderAdapter {
    reader: Box<dyn symphonia::core::formats::FormatReader>,
    decoder: Box<dyn symphonia::core::codecs::Decoder>,
    track_id: u32,
    /// Channel count of the file; preserved through rate conversion.
    native_channels: u16,
    /// Sample rate of the file.
    source_rate: u32,
    /// Engine output rate that reads are converted to.
    output_rate: u32,
    /// Fractional source position within the current chunk's virtual
    /// timeline (see [`convert_rate`](Self::convert_rate)).
    rate_pos: f64,
    /// Last source frame of the previous chunk, so interpolation spans
    /// chunk boundaries without clicks.
    carry: Vec<f32>,
    /// Decoded-and-converted samples not yet handed out.
    pending: Vec<f32>,
    /// Set once the file (or an unrecoverable error) has been reached.
    finished: bool,
}

impl DecoderAdapter {
    /// Open an audio file for decoding at the given output rate.
    pub fn open(path: &Path, output_rate: u32) -> Result<Self, DecoderError> {
        let file =
            File::open(path).map_err(|e| DecoderError::FileOpen(format!("{path:?}: {e}")))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };
        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &MetadataOptions::default())
            .map_err(|e| DecoderError::UnsupportedFormat(format!("{e}")))?;

        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| {
                t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL
                    && t.codec_params.channels.is_some()
            })
            .ok_or(DecoderError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let source_rate = codec_params
            .sample_rate
            .ok_or_else(|| DecoderError::Decode("No sample rate in codec params".to_string()))?;
        let native_channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| DecoderError::Decode("No channel info in codec params".to_string()))?;

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| DecoderError::UnsupportedFormat(format!("Codec init failed: {e}")))?;

        debug!(
            path = %path.display(),
            source_rate,
            output_rate,
            channels = native_channels,
            "Opened sample file"
        );

        Ok(Self {
            reader,
            decoder,
            track_id,
            native_channels,
            source_rate,
            output_rate,
            rate_pos: 0.0,
            carry: Vec::new(),
            pending: Vec::new(),
            finished: false,
        })
    }

    /// Channel count of the decoded frames.
    pub fn channels(&self) -> u16 {
        self.native_channels
    }

    /// Read up to `frames` interleaved frames into `out`.
    ///
    /// Returns the number of whole frames written; fewer than requested
    /// (or zero) means the stream has ended. Decode failures mid-stream
    /// end the stream rather than propagating, so one bad sample never
    /// disturbs the rest of the mix.
    pub fn read_frames(&mut self, out: &mut [f32], frames: usize) -> usize {
        let ch = self.native_channels.max(1) as usize;
        let needed = frames * ch;
        debug_assert!(out.len() >= needed);

        while self.pending.len() < needed && !self.finished {
            match self.decode_next_chunk() {
                Ok(Some(samples)) => {
                    let converted = self.convert_rate(samples);
                    self.pending.extend_from_slice(&converted);
                }
                Ok(None) => self.finished = true,
                Err(e) => {
                    warn!(error = %e, "Decode failed mid-stream, ending stream");
                    self.finished = true;
                }
            }
        }

        let take = needed.min(self.pending.len()) / ch * ch;
        out[..take].copy_from_slice(&self.pending[..take]);
        self.pending.drain(..take);
        take / ch
    }

    /// Rewind to frame zero (for looped samples and restarted streams).
    pub fn seek_to_start(&mut self) {
        let seek = SeekTo::Time {
            time: Time::from(0u64),
            track_id: Some(self.track_id),
        };
        match self.reader.seek(SeekMode::Coarse, seek) {
            Ok(_) => {
                self.decoder.reset();
                self.pending.clear();
                self.rate_pos = 0.0;
                self.carry.clear();
                self.finished = false;
            }
            Err(e) => {
                // Leave `finished` set so a looped stream cannot spin.
                warn!(error = %e, "Seek to start failed");
                self.finished = true;
            }
        }
    }

    /// Sample rate of the source file.
    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    /// Decode the next packet into interleaved f32 samples at the source
    /// rate. `Ok(None)` at end of stream.
    fn decode_next_chunk(&mut self) -> Result<Option<Vec<f32>>, DecoderError> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(e) => return Err(DecoderError::Decode(format!("{e}"))),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                    warn!(error = %msg, "Skipping corrupted audio packet");
                    continue;
                }
                Err(e) => return Err(DecoderError::Decode(format!("{e}"))),
            };

            let spec = *decoded.spec();
            let num_frames = decoded.frames();
            if num_frames == 0 {
                continue;
            }

            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            return Ok(Some(sample_buf.samples().to_vec()));
        }
    }

    /// Convert one decoded chunk from the source rate to the output rate
    /// by linear interpolation.
    ///
    /// Each chunk is read as a virtual timeline whose frame 0 is the
    /// frame carried over from the previous chunk and whose frames
    /// `1..=n` are the chunk itself; `rate_pos` walks that timeline in
    /// steps of `source_rate / output_rate` and carries its remainder
    /// into the next chunk, so the conversion is gap-free across packet
    /// boundaries. Equal rates pass the chunk through untouched.
    fn convert_rate(&mut self, input: Vec<f32>) -> Vec<f32> {
        if self.source_rate == self.output_rate || input.is_empty() {
            return input;
        }
        let ch = self.native_channels.max(1) as usize;
        let in_frames = input.len() / ch;
        if in_frames == 0 {
            return input;
        }

        let carry = std::mem::take(&mut self.carry);
        // Virtual frame 0 is the carry; before any carry exists, the
        // chunk's own first frame stands in for it.
        let sample_at = |frame: usize, c: usize| -> f32 {
            if frame == 0 {
                if carry.is_empty() {
                    input[c]
                } else {
                    carry[c]
                }
            } else {
                input[(frame - 1) * ch + c]
            }
        };

        let step = self.source_rate as f64 / self.output_rate as f64;
        let mut pos = self.rate_pos;
        let mut out = Vec::with_capacity((in_frames as f64 / step).ceil() as usize * ch + ch);
        while pos < in_frames as f64 {
            let lower = pos as usize;
            let t = (pos - lower as f64) as f32;
            for c in 0..ch {
                let a = sample_at(lower, c);
                let b = sample_at(lower + 1, c);
                out.push(a + (b - a) * t);
            }
            pos += step;
        }

        self.rate_pos = pos - in_frames as f64;
        self.carry = input[(in_frames - 1) * ch..].to_vec();
        out
    }
}
