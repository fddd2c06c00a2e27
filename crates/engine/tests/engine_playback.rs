//! End-to-end engine tests: command bytes in, mixed buffers out.
//!
//! Every test builds its own game directory with synthesized WAV
//! fixtures, so no binary assets are committed. Timing-sensitive checks
//! poll with generous deadlines instead of asserting exact schedules.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alt_engine::{AltSoundEngine, EngineConfig, HardwareGen, SampleCategory};
use common::{attach_capture, buffer_is_silent, setup_game, wait_until, WavSpec};

fn test_config() -> EngineConfig {
    EngineConfig {
        sample_rate: 44100,
        channels: 2,
        buffer_frames: 256,
    }
}

fn make_engine(base: &std::path::Path) -> AltSoundEngine {
    AltSoundEngine::new(base, "testgame", test_config()).expect("engine init")
}

#[test]
fn init_fails_without_manifest() {
    let missing = std::env::temp_dir().join("alt-it-no-such-game");
    let result = AltSoundEngine::new(&missing, "testgame", test_config());
    assert!(result.is_err());
}

#[test]
fn silent_mix_always_delivers_full_buffers() {
    let base = setup_game("silent", "# no samples\n", "", &[]);
    let engine = make_engine(&base);
    let capture = attach_capture(&engine);

    assert!(wait_until(Duration::from_secs(2), || {
        capture.lock().unwrap().len() >= 5
    }));

    let buffers = capture.lock().unwrap();
    for buffer in buffers.iter() {
        assert_eq!(buffer.len(), 256 * 2, "mixed buffer must be full size");
        assert!(buffer_is_silent(buffer), "no streams means silence");
    }
}

#[test]
fn sfx_command_produces_audio() {
    let base = setup_game(
        "sfx-audio",
        "0x17,sfx,1.0,0,,pop.wav\n",
        "",
        &[WavSpec { file: "pop.wav", frames: 44100, amplitude: 0.5 }],
    );
    let mut engine = make_engine(&base);
    let capture = attach_capture(&engine);
    engine.set_hardware_gen(HardwareGen::Gts80a);

    assert!(engine.process_command(0x17, 0));
    assert_eq!(engine.active_streams_in(SampleCategory::Sfx), 1);

    assert!(wait_until(Duration::from_secs(2), || {
        capture
            .lock()
            .unwrap()
            .iter()
            .any(|b| b.iter().any(|s| *s > 0.4))
    }), "mixed output should carry the sample");
}

#[test]
fn unknown_command_fails_but_engine_continues() {
    let base = setup_game("unknown-cmd", "0x17,sfx,1.0,0,,pop.wav\n", "", &[WavSpec {
        file: "pop.wav",
        frames: 1024,
        amplitude: 0.5,
    }]);
    let mut engine = make_engine(&base);
    engine.set_hardware_gen(HardwareGen::Gts80a);

    assert!(!engine.process_command(0x55, 0), "unmapped command fails");
    assert!(engine.process_command(0x17, 0), "engine still dispatches");
}

#[test]
fn ducking_composes_while_sfx_plays() {
    let base = setup_game(
        "ducking",
        "0x10,music,1.0,1,,theme.wav\n0x20,sfx,1.0,0,profile1,dog.wav\n",
        "[music]\nstops = music\n\n[sfx]\nducks = music\nprofile1 = music:0.3\n",
        &[
            WavSpec { file: "theme.wav", frames: 2000, amplitude: 0.6 },
            WavSpec { file: "dog.wav", frames: 2205, amplitude: 0.4 },
        ],
    );
    let mut engine = make_engine(&base);

    // Pass-through framing: each byte is a logical command.
    assert!(engine.process_command(0x10, 0));
    let music = engine.stream_handles_in(SampleCategory::Music)[0];
    assert_eq!(engine.stream_mix_volume(music), Some(1.0));

    assert!(engine.process_command(0x20, 0));
    assert!((engine.stream_mix_volume(music).unwrap() - 0.3).abs() < 1e-6);

    // The 50 ms sfx ends; the music returns to full volume.
    assert!(wait_until(Duration::from_secs(3), || {
        engine.active_streams_in(SampleCategory::Sfx) == 0
    }));
    assert_eq!(engine.stream_mix_volume(music), Some(1.0));
    assert_eq!(engine.active_streams_in(SampleCategory::Music), 1);
}

#[test]
fn sfx_exhaustion_evicts_oldest() {
    let base = setup_game(
        "exhaustion",
        "0x30,sfx,1.0,1,,loop.wav\n",
        "[sfx]\nmax_concurrent = 16\non_full = evict_oldest\n",
        &[WavSpec { file: "loop.wav", frames: 2000, amplitude: 0.2 }],
    );
    let mut engine = make_engine(&base);

    for _ in 0..16 {
        assert!(engine.process_command(0x30, 0));
    }
    assert_eq!(engine.active_streams_in(SampleCategory::Sfx), 16);
    let before = engine.stream_handles_in(SampleCategory::Sfx);
    let oldest = *before.iter().min().unwrap();

    assert!(engine.process_command(0x30, 0));
    let after = engine.stream_handles_in(SampleCategory::Sfx);
    assert_eq!(after.len(), 16, "capacity must hold at 16");
    assert!(!after.contains(&oldest), "earliest-started sfx evicted");
}

#[test]
fn master_volume_attenuation_steps() {
    let base = setup_game("attenuation", "# empty\n", "", &[]);
    let mut engine = make_engine(&base);
    engine.set_hardware_gen(HardwareGen::Gts80a);

    // 0x00 is the GTS80A clock byte: absorbed, but attenuation applies.
    for _ in 0..5 {
        assert!(engine.process_command(0x00, -1));
    }
    let expected = 1.0f32 / 1.122_018_454f32.powi(5);
    assert!(
        (engine.master_volume() - expected).abs() < 1e-4,
        "expected {expected}, got {}",
        engine.master_volume()
    );
}

#[test]
fn dcs_rom_volume_command_sets_global_volume() {
    let base = setup_game(
        "dcs-volume",
        "# empty\n",
        "[format]\nrom_volume_ctrl = true\n",
        &[],
    );
    let mut engine = make_engine(&base);
    engine.set_hardware_gen(HardwareGen::WpcDcs);

    for byte in [0x55, 0xAA, 0x7F, 0x80] {
        assert!(engine.process_command(byte, 0));
    }

    let expected = (0.981_201_f32.powf(128.0) * 4.0).min(1.0);
    assert!((engine.global_volume() - expected).abs() < 1e-5);
    assert_eq!(engine.active_streams(), 0, "volume bytes start nothing");
}

#[test]
fn rom_volume_ignored_when_disabled() {
    let base = setup_game("dcs-volume-off", "# empty\n", "", &[]);
    let mut engine = make_engine(&base);
    engine.set_hardware_gen(HardwareGen::WpcDcs);

    for byte in [0x55, 0xAA, 0x7F, 0x80] {
        engine.process_command(byte, 0);
    }
    assert_eq!(engine.global_volume(), 1.0);
}

#[test]
fn whitestar_stop_music_hook() {
    let base = setup_game(
        "ws-stop",
        "0xFD10,music,1.0,1,,theme.wav\n",
        "",
        &[WavSpec { file: "theme.wav", frames: 2000, amplitude: 0.5 }],
    );
    let mut engine = make_engine(&base);
    engine.set_hardware_gen(HardwareGen::Ws);

    assert!(engine.process_command(0xFD, 0) && engine.process_command(0x10, 0));
    assert_eq!(engine.active_streams_in(SampleCategory::Music), 1);

    // 0x0000 is unknown to the catalog but still triggers the hook.
    engine.process_command(0x00, 0);
    engine.process_command(0x00, 0);
    assert_eq!(engine.active_streams_in(SampleCategory::Music), 0);
}

#[test]
fn pause_silences_and_resume_restores() {
    let base = setup_game(
        "pause",
        "0x10,music,1.0,1,,theme.wav\n",
        "",
        &[WavSpec { file: "theme.wav", frames: 2000, amplitude: 0.5 }],
    );
    let mut engine = make_engine(&base);
    let capture = attach_capture(&engine);

    assert!(engine.process_command(0x10, 0));
    assert!(wait_until(Duration::from_secs(2), || {
        capture.lock().unwrap().iter().any(|b| !buffer_is_silent(b))
    }));

    engine.pause(true);
    // Let in-flight buffers drain, then everything must be silence.
    std::thread::sleep(Duration::from_millis(100));
    capture.lock().unwrap().clear();
    std::thread::sleep(Duration::from_millis(100));
    {
        let buffers = capture.lock().unwrap();
        assert!(!buffers.is_empty(), "mixer keeps delivering while paused");
        assert!(buffers.iter().all(|b| buffer_is_silent(b)));
    }

    engine.pause(false);
    capture.lock().unwrap().clear();
    assert!(wait_until(Duration::from_secs(2), || {
        capture.lock().unwrap().iter().any(|b| !buffer_is_silent(b))
    }));
    assert_eq!(engine.active_streams(), 1, "pause must not destroy streams");
}

#[test]
fn looped_sample_plays_past_its_length() {
    // 100-frame file against 256-frame buffers: the mixer must rewind
    // within a single pass and keep the stream alive indefinitely.
    let base = setup_game(
        "looped",
        "0x10,music,1.0,1,,tiny.wav\n",
        "",
        &[WavSpec { file: "tiny.wav", frames: 100, amplitude: 0.5 }],
    );
    let mut engine = make_engine(&base);
    let capture = attach_capture(&engine);

    assert!(engine.process_command(0x10, 0));
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(engine.active_streams(), 1, "looped stream must not end");

    capture.lock().unwrap().clear();
    assert!(wait_until(Duration::from_secs(2), || {
        capture.lock().unwrap().iter().any(|b| !buffer_is_silent(b))
    }), "looped stream keeps producing sound");
}

#[test]
fn end_callback_fires_exactly_once() {
    let base = setup_game(
        "end-callback",
        "0x20,sfx,1.0,0,,short.wav\n",
        "",
        &[WavSpec { file: "short.wav", frames: 1024, amplitude: 0.5 }],
    );
    let mut engine = make_engine(&base);
    let fired = Arc::new(AtomicUsize::new(0));
    {
        let fired = Arc::clone(&fired);
        engine.set_stream_end_callback(move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert!(engine.process_command(0x20, 0));
    assert!(wait_until(Duration::from_secs(3), || {
        engine.active_streams() == 0
    }));
    assert!(wait_until(Duration::from_secs(1), || {
        fired.load(Ordering::SeqCst) == 1
    }));

    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(fired.load(Ordering::SeqCst), 1, "callback must fire once");
}

#[test]
fn shutdown_is_idempotent_and_stops_processing() {
    let base = setup_game(
        "shutdown",
        "0x17,sfx,1.0,0,,pop.wav\n",
        "",
        &[WavSpec { file: "pop.wav", frames: 1024, amplitude: 0.5 }],
    );
    let mut engine = make_engine(&base);
    engine.set_hardware_gen(HardwareGen::Gts80a);

    engine.shutdown();
    engine.shutdown(); // second call is a no-op

    assert!(!engine.is_running());
    assert!(!engine.process_command(0x17, 0), "commands fail after shutdown");
    assert_eq!(engine.active_streams(), 0);
}
