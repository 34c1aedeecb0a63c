//! The slideshow session: folder selection, filter and timing controls, and
//! the start/stop lifecycle tying the preloader to the clock.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{self, Catalog};
use crate::decode::ImageDecoder;
use crate::display::{DisplaySurface, FitMode};
use crate::error::Error;
use crate::filter::{FilterConfig, OrientationFilter};
use crate::platform::keep_awake::{KeepAwake, NoKeepAwake};
use crate::tasks::clock::{IntervalHandle, SlideshowClock};
use crate::tasks::preload::PreloadPipeline;

/// Whether the clock is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
}

pub struct Session {
    folder: Option<PathBuf>,
    catalog: Option<Catalog>,
    filter: watch::Sender<FilterConfig>,
    interval: IntervalHandle,
    fit: watch::Sender<FitMode>,
    current_path: Arc<watch::Sender<Option<PathBuf>>>,
    decoder: Arc<dyn ImageDecoder>,
    display: Arc<dyn DisplaySurface>,
    keep_awake: Box<dyn KeepAwake>,
    seed: Option<u64>,
    pipeline: Option<Arc<PreloadPipeline>>,
    clock: Option<(CancellationToken, JoinHandle<()>)>,
    failures_tx: mpsc::Sender<Error>,
    failures_rx: Option<mpsc::Receiver<Error>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("folder", &self.folder)
            .field("catalog_len", &self.catalog_len())
            .field("state", &self.state())
            .field("filter", &*self.filter.borrow())
            .field("interval", &self.interval.get())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(decoder: Arc<dyn ImageDecoder>, display: Arc<dyn DisplaySurface>) -> Self {
        let (failures_tx, failures_rx) = mpsc::channel(16);
        Self {
            folder: None,
            catalog: None,
            filter: watch::Sender::new(FilterConfig::default()),
            interval: IntervalHandle::default(),
            fit: watch::Sender::new(FitMode::default()),
            current_path: Arc::new(watch::Sender::new(None)),
            decoder,
            display,
            keep_awake: Box::new(NoKeepAwake),
            seed: None,
            pipeline: None,
            clock: None,
            failures_tx,
            failures_rx: Some(failures_rx),
        }
    }

    #[must_use]
    pub fn with_keep_awake(mut self, keep_awake: Box<dyn KeepAwake>) -> Self {
        self.keep_awake = keep_awake;
        self
    }

    /// Make candidate selection reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Scan `path` and make it the slideshow source.
    ///
    /// Any running slideshow is stopped first and the previous catalog is
    /// dropped together with its in-flight fill. On success the first fill is
    /// requested right away.
    ///
    /// # Errors
    /// [`Error::BadDir`] if `path` is not a directory (the folder is then
    /// unset) and [`Error::EmptyCatalog`] if it holds no images (the folder
    /// stays selected, but `start` will fail until a rescan finds some).
    pub async fn select_folder(
        &mut self,
        path: impl Into<PathBuf>,
        on_progress: impl FnMut(u8) + Send + 'static,
    ) -> Result<usize, Error> {
        let path = path.into();
        self.invalidate().await;

        if !path.is_dir() {
            self.folder = None;
            return Err(Error::BadDir(path));
        }
        self.folder = Some(path.clone());

        let catalog =
            tokio::task::spawn_blocking(move || catalog::scan_with_progress(&path, on_progress))
                .await??;
        let count = catalog.len();
        info!(root = %catalog.root().display(), count, "catalog ready");

        let pipeline = self.build_pipeline(catalog.clone());
        pipeline.request_fill();
        self.catalog = Some(catalog);
        self.pipeline = Some(pipeline);
        Ok(count)
    }

    /// Rescan the currently selected folder.
    ///
    /// # Errors
    /// [`Error::NoFolderSelected`] if none is set, otherwise as
    /// [`select_folder`](Self::select_folder).
    pub async fn refresh(
        &mut self,
        on_progress: impl FnMut(u8) + Send + 'static,
    ) -> Result<usize, Error> {
        let folder = self.folder.clone().ok_or(Error::NoFolderSelected)?;
        self.select_folder(folder, on_progress).await
    }

    /// Replace the filter. Takes effect from the next candidate evaluated.
    pub fn set_filter(&self, min_width: u32, min_height: u32, orientation: OrientationFilter) {
        let filter = FilterConfig {
            min_width,
            min_height,
            orientation,
        };
        debug!(?filter, "filter updated");
        self.filter.send_replace(filter);
    }

    #[must_use]
    pub fn filter(&self) -> FilterConfig {
        *self.filter.borrow()
    }

    /// # Errors
    /// [`Error::InvalidInterval`] for a zero interval; the old one stays active.
    pub fn set_interval(&self, interval: Duration) -> Result<(), Error> {
        self.interval.set(interval).inspect_err(|_| {
            warn!(requested = ?interval, kept = ?self.interval.get(), "rejected interval");
        })
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval.get()
    }

    pub fn set_fit_mode(&self, fit: FitMode) {
        self.fit.send_replace(fit);
    }

    #[must_use]
    pub fn fit_mode(&self) -> FitMode {
        *self.fit.borrow()
    }

    /// Begin showing images; the first tick happens immediately.
    ///
    /// Calling this while already running does nothing.
    ///
    /// # Errors
    /// [`Error::NoFolderSelected`] without a valid folder and
    /// [`Error::EmptyCatalog`] when the last scan found nothing.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.clock.is_some() {
            return Ok(());
        }
        let folder = self.folder.as_deref().ok_or(Error::NoFolderSelected)?;
        if !folder.is_dir() {
            return Err(Error::NoFolderSelected);
        }
        let catalog = self.catalog.clone().ok_or(Error::EmptyCatalog)?;

        let pipeline = match self.pipeline.clone() {
            Some(p) => p,
            None => {
                let p = self.build_pipeline(catalog);
                self.pipeline = Some(Arc::clone(&p));
                p
            }
        };
        pipeline.request_fill();

        if let Err(err) = self.keep_awake.engage() {
            warn!("{err:#}");
        }

        let clock = SlideshowClock::new(
            pipeline,
            Arc::clone(&self.display),
            self.interval.subscribe(),
            self.fit.subscribe(),
            Arc::clone(&self.current_path),
        );
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(clock.run(cancel.clone()));
        self.clock = Some((cancel, handle));
        info!("slideshow started");
        Ok(())
    }

    /// Stop the clock and cancel any in-flight fill. Idempotent.
    pub async fn stop(&mut self) {
        let was_running = self.stop_clock().await;
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.shutdown().await;
        }
        if was_running {
            if let Err(err) = self.keep_awake.release() {
                warn!("{err:#}");
            }
            info!("slideshow stopped");
        }
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        if self.clock.is_some() {
            EngineState::Running
        } else {
            EngineState::Idle
        }
    }

    /// Whether a background fill is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.pipeline.as_ref().is_some_and(|p| p.is_loading())
    }

    /// Whether a preloaded frame is waiting for the next tick.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.pipeline.as_ref().is_some_and(|p| p.is_ready())
    }

    #[must_use]
    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    /// Number of catalogued images, 0 before a successful scan.
    #[must_use]
    pub fn catalog_len(&self) -> usize {
        self.catalog.as_ref().map_or(0, Catalog::len)
    }

    /// Path of the frame most recently handed to the display.
    #[must_use]
    pub fn current_path(&self) -> watch::Receiver<Option<PathBuf>> {
        self.current_path.subscribe()
    }

    /// Receiver for background fill failures; available once.
    pub fn take_failures(&mut self) -> Option<mpsc::Receiver<Error>> {
        self.failures_rx.take()
    }

    fn build_pipeline(&self, catalog: Catalog) -> Arc<PreloadPipeline> {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Arc::new(PreloadPipeline::new(
            catalog,
            self.filter.subscribe(),
            Arc::clone(&self.decoder),
            rng,
            self.failures_tx.clone(),
        ))
    }

    async fn stop_clock(&mut self) -> bool {
        let Some((cancel, handle)) = self.clock.take() else {
            return false;
        };
        cancel.cancel();
        if let Err(err) = handle.await {
            warn!("clock task failed: {err}");
        }
        true
    }

    async fn invalidate(&mut self) {
        self.stop().await;
        self.catalog = None;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some((cancel, _)) = self.clock.take() {
            cancel.cancel();
            if let Err(err) = self.keep_awake.release() {
                warn!("{err:#}");
            }
        }
    }
}
