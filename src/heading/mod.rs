// Heading module: compass port and heading-change tracking
//
// Bearing events arrive on the sensor's own callback thread. They are pushed
// through a bounded channel and only applied to the tracker on the session's
// scheduling context.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc as tokio_mpsc;

mod tracker;
pub use tracker::HeadingTracker;

/// Errors that can occur when subscribing to heading updates
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HeadingError {
    /// Device has no compass (or permission was denied)
    #[error("Heading updates are not available on this device")]
    Unavailable,
    /// The sensor stopped delivering events
    #[error("Heading sensor disconnected: {0}")]
    Disconnected(String),
}

/// Callback-side handle for delivering bearing events
///
/// `send` never blocks: when the channel is full the event is dropped and
/// counted, which is harmless because the next bearing supersedes it.
#[derive(Clone, Debug)]
pub struct HeadingSender {
    tx: tokio_mpsc::Sender<f64>,
    dropped: Arc<AtomicUsize>,
}

impl HeadingSender {
    /// Deliver a bearing in degrees; returns false if it was dropped
    pub fn send(&self, bearing_degrees: f64) -> bool {
        match self.tx.try_send(bearing_degrees) {
            Ok(()) => true,
            Err(tokio_mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(tokio_mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the receiving session is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Session-side receiver for bearing events
#[derive(Debug)]
pub struct HeadingReceiver {
    rx: tokio_mpsc::Receiver<f64>,
    dropped: Arc<AtomicUsize>,
}

impl HeadingReceiver {
    /// Wait for the next bearing
    pub async fn recv(&mut self) -> Option<f64> {
        self.rx.recv().await
    }

    /// Non-blocking receive
    pub fn try_recv(&mut self) -> Option<f64> {
        self.rx.try_recv().ok()
    }

    /// Take and reset the count of bearings dropped on a full channel
    pub fn take_dropped(&self) -> usize {
        self.dropped.swap(0, Ordering::Relaxed)
    }
}

/// Create a bounded heading channel
pub fn heading_channel(capacity: usize) -> (HeadingSender, HeadingReceiver) {
    let (tx, rx) = tokio_mpsc::channel(capacity.max(1));
    let dropped = Arc::new(AtomicUsize::new(0));
    (
        HeadingSender {
            tx,
            dropped: Arc::clone(&dropped),
        },
        HeadingReceiver { rx, dropped },
    )
}

/// Heading Port: the platform compass behind a trait
pub trait HeadingPort: Send {
    /// Whether the device can deliver heading updates at all
    fn is_available(&self) -> bool;

    /// Begin delivering bearings (degrees, 0..360) to the sender
    fn subscribe(&mut self, sender: HeadingSender) -> Result<(), HeadingError>;

    /// Stop delivering bearings
    fn unsubscribe(&mut self);
}
