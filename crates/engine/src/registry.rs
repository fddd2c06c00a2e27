//! Stream registry: handle-keyed ownership of active decoders.
//!
//! Every active stream lives here under a monotonically allocated
//! [`StreamHandle`]. The registry entry exclusively owns the decoder;
//! channel slots refer to streams by handle only. The decoder sits behind
//! its own mutex so the mixing worker can pull frames without holding the
//! registry lock (the engine wraps the whole registry in one).

use std::collections::HashMap;
use std::sync::Arc;

use alt_common::StreamHandle;
use parking_lot::Mutex;
use tracing::debug;

use crate::decoder::DecoderAdapter;

/// Engine-wide end-of-stream hook, fired once per stream that reaches
/// its natural end.
pub type EndCallback = Arc<dyn Fn(StreamHandle) + Send + Sync>;

/// Registry entry for one active stream.
pub struct StreamEntry {
    /// Exclusively owned decoder, locked per-stream for mixing reads.
    pub decoder: Arc<Mutex<DecoderAdapter>>,
    /// Whether the stream is playing (false once ended or stopped).
    pub playing: bool,
    /// Whether the stream is paused; paused streams contribute no frames
    /// but keep their decoder position.
    pub paused: bool,
    /// Native channel count of the decoded file.
    pub channels: u16,
    /// Fired exactly once, from the mixing worker, on natural end.
    pub end_callback: Option<EndCallback>,
}

/// Handle-keyed stream table with monotonic handle allocation.
///
/// Not internally locked; the engine guards it with the registry mutex,
/// acquired after the channel-table mutex.
pub struct StreamRegistry {
    entries: HashMap<StreamHandle, StreamEntry>,
    next_handle: StreamHandle,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_handle: StreamHandle::FIRST,
        }
    }

    /// Register a decoder and allocate its handle. Streams start neither
    /// playing nor paused.
    pub fn create(&mut self, decoder: DecoderAdapter, end_callback: Option<EndCallback>) -> StreamHandle {
        let handle = self.next_handle;
        self.next_handle = self.next_handle.next();

        let channels = decoder.channels();
        self.entries.insert(
            handle,
            StreamEntry {
                decoder: Arc::new(Mutex::new(decoder)),
                playing: false,
                paused: false,
                channels,
                end_callback,
            },
        );
        debug!(stream = %handle, channels, "Stream created");
        handle
    }

    pub fn get(&self, handle: StreamHandle) -> Option<&StreamEntry> {
        self.entries.get(&handle)
    }

    pub fn contains(&self, handle: StreamHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn set_playing(&mut self, handle: StreamHandle, playing: bool) -> bool {
        match self.entries.get_mut(&handle) {
            Some(entry) => {
                entry.playing = playing;
                true
            }
            None => false,
        }
    }

    pub fn set_paused(&mut self, handle: StreamHandle, paused: bool) -> bool {
        match self.entries.get_mut(&handle) {
            Some(entry) => {
                entry.paused = paused;
                true
            }
            None => false,
        }
    }

    /// Rewind a stream's decoder to frame zero.
    pub fn seek_zero(&mut self, handle: StreamHandle) -> bool {
        match self.entries.get(&handle) {
            Some(entry) => {
                entry.decoder.lock().seek_to_start();
                true
            }
            None => false,
        }
    }

    /// Take the end callback, leaving the entry in place. Returns `None`
    /// if it was already taken, guaranteeing at-most-once invocation.
    pub fn take_end_callback(&mut self, handle: StreamHandle) -> Option<EndCallback> {
        self.entries.get_mut(&handle)?.end_callback.take()
    }

    /// Destroy a stream entry, releasing its decoder.
    pub fn free(&mut self, handle: StreamHandle) -> Option<StreamEntry> {
        let entry = self.entries.remove(&handle);
        if entry.is_some() {
            debug!(stream = %handle, "Stream freed");
        }
        entry
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}
