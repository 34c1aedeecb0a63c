//! Periodic display of preloaded frames.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use crate::display::{DisplaySurface, FitMode};
use crate::error::Error;
use crate::tasks::preload::FrameSource;

/// Interval used until the user picks another one.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

/// Shared, runtime-adjustable slideshow interval.
#[derive(Debug, Clone)]
pub struct IntervalHandle {
    tx: Arc<watch::Sender<Duration>>,
}

impl IntervalHandle {
    /// # Errors
    /// Returns [`Error::InvalidInterval`] for a zero duration.
    pub fn new(initial: Duration) -> Result<Self, Error> {
        if initial.is_zero() {
            return Err(Error::InvalidInterval);
        }
        Ok(Self {
            tx: Arc::new(watch::Sender::new(initial)),
        })
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        *self.tx.borrow()
    }

    /// Replace the interval; a running clock restarts its wait with it.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInterval`] for a zero duration and keeps the
    /// previous value.
    pub fn set(&self, interval: Duration) -> Result<(), Error> {
        if interval.is_zero() {
            return Err(Error::InvalidInterval);
        }
        self.tx.send_replace(interval);
        Ok(())
    }

    /// Like [`set`](Self::set) but in (fractional) seconds.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInterval`] for zero, negative, or non-finite input.
    pub fn set_secs(&self, seconds: f64) -> Result<(), Error> {
        let interval = Duration::try_from_secs_f64(seconds).map_err(|_| Error::InvalidInterval)?;
        self.set(interval)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Duration> {
        self.tx.subscribe()
    }
}

impl Default for IntervalHandle {
    fn default() -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(DEFAULT_INTERVAL)),
        }
    }
}

/// Moves frames from a [`FrameSource`] to a [`DisplaySurface`] on a timer.
pub struct SlideshowClock {
    source: Arc<dyn FrameSource>,
    display: Arc<dyn DisplaySurface>,
    interval: watch::Receiver<Duration>,
    fit: watch::Receiver<FitMode>,
    current_path: Arc<watch::Sender<Option<PathBuf>>>,
}

impl SlideshowClock {
    pub fn new(
        source: Arc<dyn FrameSource>,
        display: Arc<dyn DisplaySurface>,
        interval: watch::Receiver<Duration>,
        fit: watch::Receiver<FitMode>,
        current_path: Arc<watch::Sender<Option<PathBuf>>>,
    ) -> Self {
        Self {
            source,
            display,
            interval,
            fit,
            current_path,
        }
    }

    /// Show the ready frame if there is one. Never waits for a fill.
    ///
    /// Returns whether a frame was shown.
    pub fn tick(&self) -> bool {
        let Some(frame) = self.source.take_and_refill() else {
            trace!("tick: nothing ready, skipping");
            return false;
        };
        let fit = *self.fit.borrow();
        self.display.show(&frame.image, fit);
        debug!(path = %frame.path.display(), ?fit, "tick: frame shown");
        self.current_path.send_replace(Some(frame.path));
        true
    }

    /// Tick once immediately, then once per interval until `cancel` fires.
    #[instrument(skip_all)]
    pub async fn run(mut self, cancel: CancellationToken) {
        self.tick();
        let mut period = *self.interval.borrow_and_update();
        let mut watching = true;
        info!(interval = ?period, "slideshow clock started");

        loop {
            select! {
                _ = cancel.cancelled() => break,

                changed = self.interval.changed(), if watching => {
                    if changed.is_ok() {
                        period = *self.interval.borrow_and_update();
                        info!(interval = ?period, "slideshow interval changed");
                    } else {
                        watching = false;
                    }
                }

                _ = sleep(period) => {
                    self.tick();
                }
            }
        }
        info!("slideshow clock stopped");
    }
}
