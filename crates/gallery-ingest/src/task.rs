//! Background execution helpers

use gallery_core::{GalleryError, Result};
use std::future::Future;

/// Run blocking storage I/O on tokio's blocking pool
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| GalleryError::TaskFailed(e.to_string()))?
}

/// Run a mutation as its own task.
///
/// Dropping the returned future does not stop the mutation; it runs to
/// completion or failure either way.
pub(crate) async fn run_detached<T, Fut>(fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(fut)
        .await
        .map_err(|e| GalleryError::TaskFailed(e.to_string()))?
}
