//! Soundstage - Scripted Demo
//!
//! Drives a full audio server through a scripted scenario on the null
//! backend: one-shots, streamed music, fades, the music hold, pause and
//! interruption, and deferred asset cleanup. Useful for watching the
//! server's log output without a platform mixer attached.
//!
//! # Usage
//!
//! ```bash
//! soundstage-demo
//! soundstage-demo --config audio.toml
//! soundstage-demo --step-ms 200
//! RUST_LOG=soundstage=trace soundstage-demo
//! ```

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec3;
use tracing::info;

use soundstage::{AudioConfig, AudioServer, NullBackend, SoundAsset, SoundRef};

#[derive(Parser)]
#[command(name = "soundstage-demo")]
#[command(author, version, about = "Soundstage - audio server demo")]
struct Args {
    /// Audio config file (TOML); defaults apply when omitted
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pause between script steps in milliseconds
    #[arg(long, default_value = "150")]
    step_ms: u64,

    /// Override the source pool size from the config
    #[arg(long)]
    pool_size: Option<usize>,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    if args.step_ms == 0 {
        anyhow::bail!("--step-ms must be at least 1");
    }

    let mut config = match &args.config {
        Some(path) => AudioConfig::load(path)
            .with_context(|| format!("loading audio config from {}", path.display()))?,
        None => AudioConfig::default(),
    };
    if let Some(pool_size) = args.pool_size {
        config.pool_size = pool_size;
    }

    info!("Starting soundstage demo ({} source slots)", config.pool_size);
    let step = Duration::from_millis(args.step_ms);
    let mut server = AudioServer::spawn(config, NullBackend::new())?;

    let ambience = SoundRef::new(SoundAsset::streamed(
        "ambience/wind",
        Duration::from_secs(120),
    ));
    let theme = SoundRef::new(SoundAsset::streamed(
        "music/theme",
        Duration::from_secs(90),
    ));
    let blast = SoundRef::new(SoundAsset::new("sfx/blast", Duration::from_millis(400)));

    // A positional ambience bed off to the left.
    let bed = server.play(&ambience);
    server.set_gain(bed, 0.6);
    server.set_looping(bed, true);
    server.set_positional(bed, true);
    server.set_position(bed, Vec3::new(-4.0, 0.0, 0.0));
    server.set_listener_position(Vec3::ZERO);
    server.set_listener_orientation(Vec3::NEG_Z, Vec3::Y);
    info!("Ambience bed started as {}", bed);
    thread::sleep(step);

    // Streamed music, flagged so volume and pitch policy treat it as such.
    let music = server.play(&theme);
    server.set_is_music(music, true);
    info!("Music started as {}", music);
    thread::sleep(step);

    // A burst of one-shots; ids are fire-and-forget.
    for i in 0..4 {
        let shot = server.play(&blast);
        server.set_gain(shot, 1.0 - i as f32 * 0.2);
        info!("One-shot {} fired as {}", i, shot);
        thread::sleep(step / 2);
    }

    // Everything the thread finished with comes home between steps.
    info!("Reclaimed {} finished refs", server.clear_deleted());

    // Global sound pitch; music is exempt.
    server.set_pitch(1.5);
    info!("Sound pitch raised to 1.5x");
    thread::sleep(step);
    server.set_pitch(1.0);

    // Dropping music volume to zero fades the theme into a silent hold.
    server.set_volumes(0.0, 1.0);
    info!("Music volume zeroed; theme fading into hold");
    thread::sleep(step * 3);
    server.set_volumes(1.0, 1.0);
    info!("Music volume restored; theme resumed");
    thread::sleep(step);

    // Client pause, then an OS interruption layered on top. Playback
    // resumes only after both clear.
    server.set_paused(true);
    info!("Paused (paused={})", server.paused());
    thread::sleep(step);
    server.begin_interruption();
    server.set_paused(false);
    info!("Unpaused during interruption; playback stays held (paused={})", server.paused());
    thread::sleep(step);
    server.end_interruption();
    info!("Interruption ended (paused={})", server.paused());
    thread::sleep(step);

    // Fade the ambience bed out over one second.
    server.set_fade(bed, Duration::from_secs(1));
    info!("Ambience bed fading out");
    thread::sleep(Duration::from_millis(1_200));

    // Retire the one-shot asset entirely.
    server.unload(vec![blast.clone()]);
    thread::sleep(step);
    info!("Reclaimed {} refs after unload", server.clear_deleted());

    server.stop(music);
    thread::sleep(step);
    info!("Reclaimed {} refs after stop", server.clear_deleted());

    drop(server);
    info!(
        "Demo finished; asset refs remaining: ambience={}, theme={}, blast={}",
        ambience.ref_count(),
        theme.ref_count(),
        blast.ref_count()
    );
    Ok(())
}
