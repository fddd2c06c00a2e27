//! Behavior dispatch: starting, stopping, pausing, and ducking streams.
//!
//! All mutations of the channel-table/registry pair happen here, under
//! the fixed lock order (channels, then streams). Pause and ducking state
//! are recomputed from scratch after every change to the active set, so a
//! stream resumes exactly when no active sound still requires it paused.

use std::sync::atomic::Ordering;

use alt_catalog::SampleInfo;
use alt_common::{BehaviorTable, DuckingProfile, SampleCategory, SaturationPolicy, StreamHandle};
use tracing::{debug, info, warn};

use crate::channels::{ChannelSlot, ChannelTable};
use crate::decoder::DecoderAdapter;
use crate::registry::StreamRegistry;
use crate::shared::EngineShared;

/// Start playback of a sample whose decoder is already open.
///
/// Applies the category's stop/pause effects, enforces its concurrency
/// limit, allocates a channel slot, registers the stream, and recomputes
/// pause and ducking state across the table. Returns `None` when the
/// sound was dropped by policy (not an error).
pub(crate) fn start_sample(
    shared: &EngineShared,
    sample: &SampleInfo,
    decoder: DecoderAdapter,
) -> Option<StreamHandle> {
    let category = sample.category.behavior_key();
    let behavior = shared.behavior.get(category);

    let mut channels = shared.channels.lock();
    let mut streams = shared.streams.lock();
    let (channels, streams) = (&mut *channels, &mut *streams);

    // 1. Inter-category effects of the new sound.
    for target in SampleCategory::BEHAVIORAL {
        if behavior.stops.contains(target) {
            stop_category_locked(channels, streams, target);
        }
    }

    // 2. Concurrency limit for the new sound's own category.
    if channels.count_category(category) >= behavior.max_concurrent {
        match behavior.on_full {
            SaturationPolicy::Drop => {
                info!(
                    category = %category,
                    sample = %sample.name(),
                    "Category saturated, sound dropped"
                );
                return None;
            }
            SaturationPolicy::EvictOldest => {
                if let Some(victim) = channels.oldest_in_category(category) {
                    debug!(stream = %victim, category = %category, "Evicting oldest stream");
                    free_stream_locked(channels, streams, victim);
                }
            }
        }
    }

    if !channels.has_free_slot() {
        warn!(sample = %sample.name(), "Channel table full, sound dropped");
        return None;
    }

    // 3. Register the stream and allocate its slot.
    let end_callback = shared.end_hook.lock().clone();
    let handle = streams.create(decoder, end_callback);
    channels.allocate(ChannelSlot {
        handle,
        gain: sample.gain * behavior.base_gain,
        ducking: 1.0,
        looped: sample.looped,
        category,
        duck_profile: behavior.ducking_profile(&sample.profile),
        started_seq: 0, // assigned by the table
    });

    // 4. Start playback, honoring a host-wide pause.
    streams.set_playing(handle, true);
    let paused_all = shared.paused_all.load(Ordering::Relaxed);
    if paused_all {
        streams.set_paused(handle, true);
    }

    // 5. Recompute cross-stream state with the newcomer in place.
    refresh_pauses(&shared.behavior, channels, streams, paused_all);
    recompute_ducking(&shared.behavior, channels, streams);

    info!(
        stream = %handle,
        sample = %sample.name(),
        category = %category,
        gain = sample.gain * behavior.base_gain,
        looped = sample.looped,
        "Stream started"
    );
    Some(handle)
}

/// Natural end of a stream, detected by the mixing worker.
///
/// Frees the slot and registry entry, recomputes pause/ducking state,
/// then fires the stream's end callback (outside the locks).
pub(crate) fn on_stream_end(shared: &EngineShared, handle: StreamHandle) {
    let callback = {
        let mut channels = shared.channels.lock();
        let mut streams = shared.streams.lock();
        let (channels, streams) = (&mut *channels, &mut *streams);
        if !streams.contains(handle) {
            // Already stopped or evicted between snapshot and EOF.
            return;
        }
        streams.set_playing(handle, false);
        let callback = streams.take_end_callback(handle);
        free_stream_locked(channels, streams, handle);
        let paused_all = shared.paused_all.load(Ordering::Relaxed);
        refresh_pauses(&shared.behavior, channels, streams, paused_all);
        recompute_ducking(&shared.behavior, channels, streams);
        callback
    };

    debug!(stream = %handle, "Stream ended");
    if let Some(cb) = callback {
        cb(handle);
    }
}

/// Explicit stop of a single stream. No end callback fires.
pub(crate) fn stop_stream(shared: &EngineShared, handle: StreamHandle) {
    let mut channels = shared.channels.lock();
    let mut streams = shared.streams.lock();
    let (channels, streams) = (&mut *channels, &mut *streams);
    if free_stream_locked(channels, streams, handle) {
        let paused_all = shared.paused_all.load(Ordering::Relaxed);
        refresh_pauses(&shared.behavior, channels, streams, paused_all);
        recompute_ducking(&shared.behavior, channels, streams);
    }
}

/// Global "stop music" hook: terminate every music-category stream.
pub(crate) fn stop_music(shared: &EngineShared) {
    let mut channels = shared.channels.lock();
    let mut streams = shared.streams.lock();
    let (channels, streams) = (&mut *channels, &mut *streams);
    if stop_category_locked(channels, streams, SampleCategory::Music) > 0 {
        let paused_all = shared.paused_all.load(Ordering::Relaxed);
        refresh_pauses(&shared.behavior, channels, streams, paused_all);
        recompute_ducking(&shared.behavior, channels, streams);
    }
}

/// Host-wide pause or resume of every active stream.
pub(crate) fn pause_all(shared: &EngineShared, paused: bool) {
    shared.paused_all.store(paused, Ordering::Relaxed);

    let mut channels = shared.channels.lock();
    let mut streams = shared.streams.lock();
    let (channels, streams) = (&mut *channels, &mut *streams);
    let handles: Vec<StreamHandle> = channels.iter().map(|s| s.handle).collect();
    for handle in handles {
        streams.set_paused(handle, paused);
    }
    if !paused {
        // Re-apply behavior-driven pauses that survive the host resume.
        refresh_pauses(&shared.behavior, channels, streams, false);
    }
    info!("All streams {}", if paused { "paused" } else { "resumed" });
}

/// Terminate every stream in a category. Returns the number stopped.
fn stop_category_locked(
    channels: &mut ChannelTable,
    streams: &mut StreamRegistry,
    category: SampleCategory,
) -> usize {
    let handles = channels.handles_in_category(category);
    let count = handles.len();
    for handle in handles {
        debug!(stream = %handle, category = %category, "Stopping stream");
        free_stream_locked(channels, streams, handle);
    }
    count
}

/// Free a slot and its registry entry together, keeping the invariant
/// that a slot is occupied exactly while its handle is live.
fn free_stream_locked(
    channels: &mut ChannelTable,
    streams: &mut StreamRegistry,
    handle: StreamHandle,
) -> bool {
    let had_entry = streams.free(handle).is_some();
    channels.release_handle(handle);
    had_entry
}

/// Set each stream's paused flag from the declared `pauses` sets of the
/// other playing streams. Skipped entirely while the host has everything
/// paused.
fn refresh_pauses(
    behavior: &BehaviorTable,
    channels: &mut ChannelTable,
    streams: &mut StreamRegistry,
    paused_all: bool,
) {
    if paused_all {
        return;
    }

    let active: Vec<(StreamHandle, SampleCategory)> = channels
        .iter()
        .filter(|slot| streams.get(slot.handle).is_some_and(|e| e.playing))
        .map(|slot| (slot.handle, slot.category))
        .collect();

    let slots: Vec<(StreamHandle, SampleCategory)> = channels
        .iter()
        .map(|slot| (slot.handle, slot.category))
        .collect();
    for (handle, category) in slots {
        let should_pause = active.iter().any(|(other, other_cat)| {
            *other != handle && behavior.get(*other_cat).pauses.contains(category)
        });
        streams.set_paused(handle, should_pause);
    }
}

/// Recompute every slot's ducking multiplier as the product over the
/// other audible streams whose category ducks it.
fn recompute_ducking(
    behavior: &BehaviorTable,
    channels: &mut ChannelTable,
    streams: &StreamRegistry,
) {
    let duckers: Vec<(StreamHandle, SampleCategory, DuckingProfile)> = channels
        .iter()
        .filter(|slot| {
            streams
                .get(slot.handle)
                .is_some_and(|e| e.playing && !e.paused)
        })
        .map(|slot| (slot.handle, slot.category, slot.duck_profile))
        .collect();

    for slot in channels.iter_mut() {
        let mut ducking = 1.0f32;
        for (other, other_cat, profile) in &duckers {
            if *other != slot.handle && behavior.get(*other_cat).ducks.contains(slot.category) {
                ducking *= profile.volume_for(slot.category);
            }
        }
        slot.ducking = ducking;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::EngineShared;
    use crate::testutil::{write_wav, Waveform};
    use alt_common::{CategorySet, EngineConfig};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn open_decoder(name: &str) -> DecoderAdapter {
        let path = write_wav(name, 44100, 1, 2000, Waveform::Constant(0.5));
        DecoderAdapter::open(&path, 44100).unwrap()
    }

    fn sample(name: &str, category: SampleCategory, gain: f32, profile: &str) -> SampleInfo {
        SampleInfo {
            id: 0x10,
            path: std::path::PathBuf::from(name),
            category,
            gain,
            looped: true,
            profile: profile.to_string(),
        }
    }

    /// Behavior table where sfx ducks music at 0.3 and callouts pause
    /// music, without the default stop rules getting in the way.
    fn test_behavior() -> BehaviorTable {
        let mut table = BehaviorTable::default();
        table.sfx.ducks = CategorySet::EMPTY.with(SampleCategory::Music);
        table.sfx.ducking_profiles = HashMap::from([(
            "p".to_string(),
            alt_common::DuckingProfile {
                music: 0.3,
                ..alt_common::DuckingProfile::IDENTITY
            },
        )]);
        table.callout.pauses = CategorySet::EMPTY.with(SampleCategory::Music);
        table.callout.ducks = CategorySet::EMPTY;
        table
    }

    /// The channel-table referent set must always equal the live
    /// registry set.
    fn assert_tables_consistent(shared: &EngineShared) {
        let channels = shared.channels.lock();
        let streams = shared.streams.lock();
        assert_eq!(channels.len(), streams.len());
        for slot in channels.iter() {
            assert!(streams.contains(slot.handle), "dangling slot {}", slot.handle);
        }
    }

    #[test]
    fn slot_set_tracks_registry_through_lifecycle() {
        let shared = EngineShared::new(EngineConfig::default(), test_behavior());

        let h1 = start_sample(&shared, &sample("bl1.wav", SampleCategory::Sfx, 1.0, ""), open_decoder("bl1.wav")).unwrap();
        let h2 = start_sample(&shared, &sample("bl2.wav", SampleCategory::Sfx, 1.0, ""), open_decoder("bl2.wav")).unwrap();
        let h3 = start_sample(&shared, &sample("bl3.wav", SampleCategory::Music, 1.0, ""), open_decoder("bl3.wav")).unwrap();
        assert!(h1 < h2 && h2 < h3);
        assert_tables_consistent(&shared);

        stop_stream(&shared, h2);
        assert_tables_consistent(&shared);

        on_stream_end(&shared, h1);
        assert_tables_consistent(&shared);
        assert_eq!(shared.channels.lock().len(), 1);
    }

    #[test]
    fn new_music_stops_current_music() {
        let shared = EngineShared::new(EngineConfig::default(), test_behavior());

        let first = start_sample(&shared, &sample("m1.wav", SampleCategory::Music, 1.0, ""), open_decoder("m1.wav")).unwrap();
        let second = start_sample(&shared, &sample("m2.wav", SampleCategory::Music, 1.0, ""), open_decoder("m2.wav")).unwrap();

        let channels = shared.channels.lock();
        assert_eq!(channels.count_category(SampleCategory::Music), 1);
        assert!(channels.iter().all(|s| s.handle != first));
        assert!(channels.iter().any(|s| s.handle == second));
    }

    #[test]
    fn drop_policy_discards_newcomer() {
        let mut behavior = test_behavior();
        behavior.callout.max_concurrent = 1;
        behavior.callout.on_full = SaturationPolicy::Drop;
        behavior.callout.stops = CategorySet::EMPTY;
        behavior.callout.pauses = CategorySet::EMPTY;
        let shared = EngineShared::new(EngineConfig::default(), behavior);

        let first = start_sample(&shared, &sample("c1.wav", SampleCategory::Callout, 1.0, ""), open_decoder("c1.wav")).unwrap();
        let second = start_sample(&shared, &sample("c2.wav", SampleCategory::Callout, 1.0, ""), open_decoder("c2.wav"));

        assert!(second.is_none());
        let channels = shared.channels.lock();
        assert_eq!(channels.count_category(SampleCategory::Callout), 1);
        assert!(channels.iter().any(|s| s.handle == first));
    }

    #[test]
    fn evict_policy_stops_oldest() {
        let mut behavior = test_behavior();
        behavior.sfx.max_concurrent = 2;
        behavior.sfx.on_full = SaturationPolicy::EvictOldest;
        let shared = EngineShared::new(EngineConfig::default(), behavior);

        let h1 = start_sample(&shared, &sample("e1.wav", SampleCategory::Sfx, 1.0, ""), open_decoder("e1.wav")).unwrap();
        let h2 = start_sample(&shared, &sample("e2.wav", SampleCategory::Sfx, 1.0, ""), open_decoder("e2.wav")).unwrap();
        let h3 = start_sample(&shared, &sample("e3.wav", SampleCategory::Sfx, 1.0, ""), open_decoder("e3.wav")).unwrap();

        let channels = shared.channels.lock();
        assert_eq!(channels.count_category(SampleCategory::Sfx), 2);
        assert!(channels.iter().all(|s| s.handle != h1), "oldest not evicted");
        assert!(channels.iter().any(|s| s.handle == h2));
        assert!(channels.iter().any(|s| s.handle == h3));
        drop(channels);
        assert_tables_consistent(&shared);
    }

    #[test]
    fn ducking_composes_and_restores() {
        let shared = EngineShared::new(EngineConfig::default(), test_behavior());

        let music = start_sample(&shared, &sample("dm.wav", SampleCategory::Music, 1.0, ""), open_decoder("dm.wav")).unwrap();
        let ducking_of = |handle| {
            shared
                .channels
                .lock()
                .iter()
                .find(|s| s.handle == handle)
                .map(|s| s.ducking)
                .unwrap()
        };
        assert_eq!(ducking_of(music), 1.0);

        let dog = start_sample(&shared, &sample("dd.wav", SampleCategory::Sfx, 1.0, "p"), open_decoder("dd.wav")).unwrap();
        assert!((ducking_of(music) - 0.3).abs() < 1e-6);

        // A second ducker multiplies in.
        let cat = start_sample(&shared, &sample("dc.wav", SampleCategory::Sfx, 1.0, "p"), open_decoder("dc.wav")).unwrap();
        assert!((ducking_of(music) - 0.09).abs() < 1e-6);

        on_stream_end(&shared, cat);
        assert!((ducking_of(music) - 0.3).abs() < 1e-6);
        on_stream_end(&shared, dog);
        assert_eq!(ducking_of(music), 1.0);
    }

    #[test]
    fn callout_pauses_music_until_it_ends() {
        let shared = EngineShared::new(EngineConfig::default(), test_behavior());

        let music = start_sample(&shared, &sample("pm.wav", SampleCategory::Music, 1.0, ""), open_decoder("pm.wav")).unwrap();
        assert!(!shared.streams.lock().get(music).unwrap().paused);

        let callout = start_sample(&shared, &sample("pc.wav", SampleCategory::Callout, 1.0, ""), open_decoder("pc.wav")).unwrap();
        assert!(shared.streams.lock().get(music).unwrap().paused);
        assert!(!shared.streams.lock().get(callout).unwrap().paused);

        on_stream_end(&shared, callout);
        assert!(!shared.streams.lock().get(music).unwrap().paused);
    }

    #[test]
    fn host_pause_overrides_and_resume_reapplies_behavior() {
        let shared = EngineShared::new(EngineConfig::default(), test_behavior());

        let music = start_sample(&shared, &sample("hm.wav", SampleCategory::Music, 1.0, ""), open_decoder("hm.wav")).unwrap();
        let callout = start_sample(&shared, &sample("hc.wav", SampleCategory::Callout, 1.0, ""), open_decoder("hc.wav")).unwrap();

        pause_all(&shared, true);
        assert!(shared.streams.lock().get(music).unwrap().paused);
        assert!(shared.streams.lock().get(callout).unwrap().paused);

        pause_all(&shared, false);
        // The callout still pauses the music after the host resume.
        assert!(shared.streams.lock().get(music).unwrap().paused);
        assert!(!shared.streams.lock().get(callout).unwrap().paused);
    }

    #[test]
    fn end_callback_fires_once_per_stream() {
        let shared = EngineShared::new(EngineConfig::default(), test_behavior());
        let fired = Arc::new(AtomicUsize::new(0));
        {
            let fired = Arc::clone(&fired);
            *shared.end_hook.lock() = Some(Arc::new(move |_| {
                fired.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let h = start_sample(&shared, &sample("cb.wav", SampleCategory::Sfx, 1.0, ""), open_decoder("cb.wav")).unwrap();
        on_stream_end(&shared, h);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // A second end for the same handle is a no-op.
        on_stream_end(&shared, h);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_stop_does_not_fire_end_callback() {
        let shared = EngineShared::new(EngineConfig::default(), test_behavior());
        let fired = Arc::new(AtomicUsize::new(0));
        {
            let fired = Arc::clone(&fired);
            *shared.end_hook.lock() = Some(Arc::new(move |_| {
                fired.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let h = start_sample(&shared, &sample("st.wav", SampleCategory::Sfx, 1.0, ""), open_decoder("st.wav")).unwrap();
        stop_stream(&shared, h);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stop_music_clears_only_music() {
        let shared = EngineShared::new(EngineConfig::default(), test_behavior());

        start_sample(&shared, &sample("sm.wav", SampleCategory::Music, 1.0, ""), open_decoder("sm.wav")).unwrap();
        let sfx = start_sample(&shared, &sample("ss.wav", SampleCategory::Sfx, 1.0, ""), open_decoder("ss.wav")).unwrap();

        stop_music(&shared);
        let channels = shared.channels.lock();
        assert_eq!(channels.count_category(SampleCategory::Music), 0);
        assert!(channels.iter().any(|s| s.handle == sfx));
    }
}
