//! Single-slot background preloader.
//!
//! One fill runs at a time on the blocking pool. It keeps drawing candidates
//! until one is accepted, parks it in the slot, and stops. The clock empties
//! the slot with [`PreloadPipeline::take_and_refill`], which immediately asks
//! for the next one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::decode::ImageDecoder;
use crate::error::Error;
use crate::filter::FilterConfig;
use crate::selector::{Selected, select_one};

/// Something the clock can pull ready frames from.
pub trait FrameSource: Send + Sync {
    /// Take the ready frame, if any, and start preparing the next one.
    fn take_and_refill(&self) -> Option<Selected>;
}

struct Shared {
    catalog: Catalog,
    filter: watch::Receiver<FilterConfig>,
    decoder: Arc<dyn ImageDecoder>,
    rng: Mutex<StdRng>,
    loading: AtomicBool,
    slot: Mutex<Option<Selected>>,
}

/// Clears the in-flight flag when a fill ends, including by panic.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Preloader bound to one catalog. Build a new one when the catalog changes.
pub struct PreloadPipeline {
    shared: Arc<Shared>,
    runtime: Handle,
    cancel: CancellationToken,
    failures: mpsc::Sender<Error>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for PreloadPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreloadPipeline")
            .field("catalog_len", &self.shared.catalog.len())
            .field("loading", &self.is_loading())
            .field("ready", &self.is_ready())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PreloadPipeline {
    /// Create an idle pipeline. No fill starts until [`request_fill`] is called.
    ///
    /// Fills that fail for any reason other than cancellation are sent to
    /// `failures`. Reports that do not fit in the channel are dropped.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    ///
    /// [`request_fill`]: Self::request_fill
    pub fn new(
        catalog: Catalog,
        filter: watch::Receiver<FilterConfig>,
        decoder: Arc<dyn ImageDecoder>,
        rng: StdRng,
        failures: mpsc::Sender<Error>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                catalog,
                filter,
                decoder,
                rng: Mutex::new(rng),
                loading: AtomicBool::new(false),
                slot: Mutex::new(None),
            }),
            runtime: Handle::current(),
            cancel: CancellationToken::new(),
            failures,
            task: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.shared.catalog
    }

    /// Whether a fill is currently running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.shared.loading.load(Ordering::Acquire)
    }

    /// Whether the slot holds a frame.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        lock(&self.shared.slot).is_some()
    }

    /// Start filling the slot in the background.
    ///
    /// Does nothing and returns `false` when a fill is already running, the
    /// slot is still occupied, or the pipeline was shut down.
    pub fn request_fill(&self) -> bool {
        if self.cancel.is_cancelled() || self.is_ready() {
            return false;
        }
        if self
            .shared
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        // A fill that finished between the check above and the swap may have
        // filled the slot; we own the flag now, so nobody else can.
        if self.is_ready() {
            self.shared.loading.store(false, Ordering::Release);
            return false;
        }

        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        let failures = self.failures.clone();
        let join = self.runtime.spawn_blocking(move || run_fill(&shared, &cancel));
        let handle = self.runtime.spawn(async move {
            let err = match join.await {
                Ok(Ok(())) => return,
                Ok(Err(Error::Cancelled)) => {
                    debug!("fill cancelled");
                    return;
                }
                Ok(Err(err)) => err,
                Err(panicked) => Error::Task(panicked),
            };
            warn!("fill failed: {err}");
            report_failure(&failures, err);
        });
        *lock(&self.task) = Some(handle);
        true
    }

    /// Cancel any running fill and wait for it to wind down.
    ///
    /// The retry loop notices within one candidate; a decode already underway
    /// is allowed to finish first.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = lock(&self.task).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        lock(&self.shared.slot).take();
    }
}

impl FrameSource for PreloadPipeline {
    fn take_and_refill(&self) -> Option<Selected> {
        let taken = lock(&self.shared.slot).take();
        self.request_fill();
        taken
    }
}

impl Drop for PreloadPipeline {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Never waits on the consumer; an undrained channel drops the report.
fn report_failure(failures: &mpsc::Sender<Error>, err: Error) {
    match failures.try_send(err) {
        Ok(()) => {}
        Err(TrySendError::Full(err)) => warn!("failure channel full, dropping: {err}"),
        Err(TrySendError::Closed(_)) => debug!("failure channel closed"),
    }
}

fn run_fill(shared: &Shared, cancel: &CancellationToken) -> Result<(), Error> {
    let _guard = LoadingGuard(&shared.loading);
    let selected = {
        let mut rng = lock(&shared.rng);
        select_one(
            &shared.catalog,
            &shared.filter,
            shared.decoder.as_ref(),
            &mut *rng,
            cancel,
        )?
    };
    let mut slot = lock(&shared.slot);
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    debug!(path = %selected.path.display(), "slot filled");
    *slot = Some(selected);
    Ok(())
}
