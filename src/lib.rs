// Ambient-sound proximity simulator core
//
// Silence drives a simulated entity toward the radar centre; sound drives it
// away. See `session` for how the pieces are wired together.

// Enable coverage attribute on nightly for explicit exclusions
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod audio;
pub mod audio_constants;
pub mod events;
pub mod feedback;
pub mod heading;
pub mod proximity;
pub mod session;
pub mod settings;
pub mod sim;

use std::sync::Arc;
use std::time::Duration;

use events::ChannelEventEmitter;
use session::{EnginePorts, ProximitySession, SessionError};
use settings::ProximitySettings;
use sim::{logging_registry, LevelScript, LoggingVisual, SimulatedCompass, SimulatedMicrophone};

// Re-export log macros for use throughout the crate
pub use log::{debug, error, info, trace, warn};

/// Compass sweep of the demo, degrees per second
const DEMO_ROTATION_RATE: f64 = 6.0;

/// Demo entry point: runs a session against simulated ports until Ctrl-C,
/// or for the number of seconds given as the first argument.
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if cfg!(debug_assertions) {
            "debug"
        } else {
            "info"
        },
    ))
    .format_timestamp_millis()
    .init();

    info!("Setting up spectrescope...");

    let duration = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<u64>().ok())
        .map(Duration::from_secs);

    let settings = match ProximitySettings::load_resolved(None) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run_demo(settings, duration)) {
        error!("Session failed: {}", e);
        std::process::exit(1);
    }
}

/// Run a session with simulated microphone, compass and output ports
pub async fn run_demo(
    settings: ProximitySettings,
    duration: Option<Duration>,
) -> Result<(), SessionError> {
    let emitter = Arc::new(ChannelEventEmitter::new());
    let mut encounters = emitter.subscribe_encounters();

    let ports = EnginePorts {
        audio: Box::new(SimulatedMicrophone::new(LevelScript::demo())),
        heading: Some(Box::new(SimulatedCompass::new(0.0, DEMO_ROTATION_RATE))),
        sounds: logging_registry(),
        visual: Box::new(LoggingVisual::new()),
    };

    let mut session = ProximitySession::new();
    session.start(settings, ports, emitter.clone())?;

    let deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted, shutting down");
                break;
            }
            _ = &mut deadline => {
                info!("Demo duration elapsed, shutting down");
                break;
            }
            event = encounters.recv() => match event {
                Some(encounter) => info!(
                    "Encounter #{} from {:.0}°",
                    encounter.sequence,
                    encounter.angle.to_degrees()
                ),
                None => break,
            },
        }
    }

    session.shutdown().await
}
