//! Random candidate selection with rejection filtering.

use std::path::PathBuf;

use rand::Rng;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::catalog::Catalog;
use crate::decode::{DecodedImage, ImageDecoder};
use crate::error::Error;
use crate::filter::FilterConfig;

/// An accepted image together with the file it came from.
#[derive(Debug, Clone)]
pub struct Selected {
    pub path: PathBuf,
    pub image: DecodedImage,
}

/// Draw random catalog entries until one decodes and passes the filter.
///
/// Each draw is uniform and independent, so the same path may be tried more
/// than once. The filter is re-read before every evaluation, so a change made
/// while this runs applies from the next candidate on.
///
/// There is no retry limit. If no file in `catalog` can satisfy the filter this
/// only returns once `cancel` fires; the token is checked on every iteration.
///
/// # Errors
/// Returns [`Error::Cancelled`] when `cancel` is triggered.
pub fn select_one<R: Rng>(
    catalog: &Catalog,
    filter: &watch::Receiver<FilterConfig>,
    decoder: &dyn ImageDecoder,
    rng: &mut R,
    cancel: &CancellationToken,
) -> Result<Selected, Error> {
    let mut attempts: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            debug!(attempts, "selection cancelled");
            return Err(Error::Cancelled);
        }
        attempts += 1;

        let idx = rng.random_range(0..catalog.len());
        let Some(path) = catalog.get(idx) else {
            continue;
        };

        let image = match decoder.decode(path) {
            Ok(image) => image,
            Err(err) => {
                debug!(path = %path.display(), "skipping candidate: {err}");
                continue;
            }
        };

        let config = *filter.borrow();
        if config.accepts(&image) {
            debug!(path = %path.display(), attempts, "candidate accepted");
            return Ok(Selected {
                path: path.to_path_buf(),
                image,
            });
        }
        trace!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "candidate rejected by filter"
        );
    }
}
