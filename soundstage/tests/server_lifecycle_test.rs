//! Integration test for the audio server lifecycle
//!
//! Drives a real spawned audio thread through the public API and verifies
//! that every asset ref eventually comes home to the spawning thread. The
//! audio thread runs on wall time here, so assertions poll with generous
//! deadlines instead of expecting instant effects.

use std::thread;
use std::time::{Duration, Instant};

use soundstage::{AudioConfig, AudioServer, NullBackend, SoundAsset, SoundRef};

/// Drain the delete list until `want` refs came home or the deadline hits.
fn drain_until(server: &AudioServer, want: usize, deadline_ms: u64) -> usize {
    let deadline = Instant::now() + Duration::from_millis(deadline_ms);
    let mut total = server.clear_deleted();
    while total < want && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
        total += server.clear_deleted();
    }
    total
}

fn poll_until(deadline_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(deadline_ms);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn spawn(pool_size: usize) -> AudioServer {
    let config = AudioConfig {
        pool_size,
        ..AudioConfig::default()
    };
    AudioServer::spawn(config, NullBackend::new()).expect("audio thread failed to spawn")
}

#[test]
fn test_one_shot_runs_out_and_returns_its_ref() {
    let mut server = spawn(4);
    let shot = SoundRef::new(SoundAsset::new("shot", Duration::from_millis(50)));

    server.play(&shot);
    assert_eq!(shot.ref_count(), 2);

    let drained = drain_until(&server, 1, 2_000);
    assert_eq!(drained, 1, "finished play should hand its ref back");
    assert_eq!(shot.ref_count(), 1);
}

#[test]
fn test_stop_returns_the_ref() {
    let mut server = spawn(4);
    let long = SoundRef::new(SoundAsset::new("long", Duration::from_secs(60)));

    let id = server.play(&long);
    server.stop(id);

    assert_eq!(drain_until(&server, 1, 2_000), 1);
    assert_eq!(long.ref_count(), 1);
}

#[test]
fn test_fade_out_stops_the_play() {
    let mut server = spawn(4);
    let long = SoundRef::new(SoundAsset::new("long", Duration::from_secs(60)));

    let id = server.play(&long);
    server.set_fade(id, Duration::from_millis(100));

    assert_eq!(
        drain_until(&server, 1, 2_000),
        1,
        "a completed fade-out releases the play"
    );
    assert_eq!(long.ref_count(), 1);
}

#[test]
fn test_pause_is_applied_by_the_audio_thread() {
    let server = spawn(2);
    assert!(!server.paused());

    server.set_paused(true);
    assert!(poll_until(2_000, || server.paused()), "pause never applied");

    server.set_paused(false);
    assert!(poll_until(2_000, || !server.paused()), "resume never applied");
}

#[test]
fn test_pool_exhaustion_recycles_the_oldest_slot() {
    let mut server = spawn(2);
    let a = SoundRef::new(SoundAsset::new("a", Duration::from_secs(60)));
    let b = SoundRef::new(SoundAsset::new("b", Duration::from_secs(60)));
    let c = SoundRef::new(SoundAsset::new("c", Duration::from_secs(60)));

    let id_a = server.play(&a);
    let id_b = server.play(&b);
    assert_eq!((id_a.slot(), id_a.generation()), (0, 1));
    assert_eq!((id_b.slot(), id_b.generation()), (1, 1));

    // Third play on a two-slot pool evicts the oldest, recycling its slot
    // under a fresh generation.
    let id_c = server.play(&c);
    assert_eq!((id_c.slot(), id_c.generation()), (0, 2));

    assert_eq!(drain_until(&server, 1, 2_000), 1, "the victim's ref comes home");
    assert_eq!(a.ref_count(), 1);
    assert_eq!(b.ref_count(), 2, "survivor still held by its slot");
    assert_eq!(c.ref_count(), 2);

    drop(server);
    assert_eq!(b.ref_count(), 1);
    assert_eq!(c.ref_count(), 1);
}

#[test]
fn test_unload_reclaims_every_ref_of_the_asset() {
    let mut server = spawn(4);
    let jingle = SoundRef::new(SoundAsset::new("jingle", Duration::from_secs(60)));

    server.play(&jingle);
    server.play(&jingle);
    server.unload(vec![jingle.clone()]);

    // Two slot refs plus the unload command's own ref.
    assert_eq!(drain_until(&server, 3, 2_000), 3);
    assert_eq!(jingle.ref_count(), 1);
}

#[test]
fn test_drop_under_load_returns_everything() {
    let mut server = spawn(8);
    let sounds: Vec<SoundRef> = (0..6)
        .map(|i| {
            SoundRef::new(SoundAsset::new(
                format!("sound-{i}"),
                Duration::from_secs(60),
            ))
        })
        .collect();

    for sound in &sounds {
        server.play(sound);
    }

    // Immediate teardown while everything is still playing.
    drop(server);
    for sound in &sounds {
        assert_eq!(sound.ref_count(), 1, "{} still held after shutdown", sound.name());
    }
}
