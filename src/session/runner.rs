// Session runner: drives a ProximityEngine from a single tokio task
//
// The task selects over the tick interval, bearing events and a shutdown
// signal, so every engine mutation happens on one scheduling context.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::engine::{EnginePorts, ProximityEngine};
use super::SessionError;
use crate::events::ProximityEventEmitter;
use crate::heading::HeadingReceiver;
use crate::proximity::ProximitySnapshot;
use crate::settings::ProximitySettings;
use crate::{debug, info, warn};

struct RunningSession {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    snapshots: watch::Receiver<ProximitySnapshot>,
}

/// Handle to a proximity session running on the tokio runtime
///
/// Dropping the handle stops the session; the engine then releases the
/// capture tap, the heading subscription and every sound.
#[derive(Default)]
pub struct ProximitySession {
    running: Option<RunningSession>,
}

impl ProximitySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the session on the current tokio runtime
    pub fn start(
        &mut self,
        settings: ProximitySettings,
        ports: EnginePorts,
        emitter: Arc<dyn ProximityEventEmitter>,
    ) -> Result<(), SessionError> {
        self.start_with(settings, emitter, |settings, emitter| {
            ProximityEngine::new(settings, ports, emitter)
        })
    }

    /// Start the session with an explicit RNG for approach angles
    pub fn start_with_rng(
        &mut self,
        settings: ProximitySettings,
        ports: EnginePorts,
        emitter: Arc<dyn ProximityEventEmitter>,
        rng: StdRng,
    ) -> Result<(), SessionError> {
        self.start_with(settings, emitter, |settings, emitter| {
            ProximityEngine::with_rng(settings, ports, emitter, rng)
        })
    }

    fn start_with<F>(
        &mut self,
        settings: ProximitySettings,
        emitter: Arc<dyn ProximityEventEmitter>,
        build: F,
    ) -> Result<(), SessionError>
    where
        F: FnOnce(ProximitySettings, Arc<dyn ProximityEventEmitter>) -> ProximityEngine,
    {
        if self.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        settings.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SessionError::NoRuntime)?;

        let period = settings.tick_interval();
        let mut engine = build(settings, emitter);
        let start = engine.start();
        let (snapshot_tx, snapshots) = watch::channel(engine.snapshot());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = runtime.spawn(run_session(
            engine,
            start.headings,
            shutdown_rx,
            snapshot_tx,
            period,
        ));

        info!("[session] Session started ({} ms ticks)", period.as_millis());
        self.running = Some(RunningSession {
            shutdown_tx: Some(shutdown_tx),
            task,
            snapshots,
        });
        Ok(())
    }

    /// Stop the session and wait for its teardown to finish
    pub async fn shutdown(&mut self) -> Result<(), SessionError> {
        let mut running = self.running.take().ok_or(SessionError::NotRunning)?;
        if let Some(tx) = running.shutdown_tx.take() {
            let _ = tx.send(());
        }
        running
            .task
            .await
            .map_err(|e| SessionError::TaskFailed(e.to_string()))?;
        info!("[session] Session stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map(|r| !r.task.is_finished())
            .unwrap_or(false)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Option<ProximitySnapshot> {
        self.running.as_ref().map(|r| *r.snapshots.borrow())
    }

    /// Watch channel that receives a snapshot after every tick
    pub fn subscribe_snapshots(&self) -> Option<watch::Receiver<ProximitySnapshot>> {
        self.running.as_ref().map(|r| r.snapshots.clone())
    }
}

impl Drop for ProximitySession {
    fn drop(&mut self) {
        if let Some(mut running) = self.running.take() {
            debug!("[session] Session handle dropped, stopping");
            if let Some(tx) = running.shutdown_tx.take() {
                let _ = tx.send(());
            }
        }
    }
}

/// Scheduling loop of one session
async fn run_session(
    mut engine: ProximityEngine,
    mut headings: HeadingReceiver,
    mut shutdown_rx: oneshot::Receiver<()>,
    snapshot_tx: watch::Sender<ProximitySnapshot>,
    period: Duration,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut headings_open = true;

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            _ = ticker.tick() => {
                engine.on_tick();
                let dropped = headings.take_dropped();
                if dropped > 0 {
                    warn!("[heading] Heading channel full, dropped {} bearings", dropped);
                }
                snapshot_tx.send_replace(engine.snapshot());
            }
            bearing = headings.recv(), if headings_open => match bearing {
                Some(degrees) => engine.on_bearing(degrees),
                None => {
                    debug!("[heading] Heading stream closed");
                    headings_open = false;
                }
            },
        }
    }

    engine.shutdown();
    debug!("[session] Session loop exited after {} ticks", engine.ticks());
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
