//! Progress reporting for transfers and batch checks.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// Receives progress for named targets.
pub trait ProgressReporter: Send + Sync {
    /// Set the absolute progress of `name`.
    fn update(&self, name: &str, done: u64, total: u64);

    /// Advance `name` by `delta` units.
    fn advance(&self, name: &str, delta: u64);

    /// Mark `name` as fully complete.
    fn finish(&self, name: &str) {
        self.update(name, 1, 1);
    }
}

/// Reporter that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn update(&self, _name: &str, _done: u64, _total: u64) {}

    fn advance(&self, _name: &str, _delta: u64) {}
}

/// Reporter that emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn update(&self, name: &str, done: u64, total: u64) {
        tracing::info!(target: "driveremote::progress", "{}: {}/{}", name, done, total);
    }

    fn advance(&self, name: &str, delta: u64) {
        tracing::debug!(target: "driveremote::progress", "{}: +{}", name, delta);
    }
}

/// Reader wrapper that advances a named counter by every byte read.
pub struct TrackReadProgress<R> {
    inner: R,
    name: String,
    progress: Arc<dyn ProgressReporter>,
}

impl<R> TrackReadProgress<R> {
    /// Wrap `inner`, reporting reads under `name`.
    pub fn new(inner: R, name: impl Into<String>, progress: Arc<dyn ProgressReporter>) -> Self {
        Self {
            inner,
            name: name.into(),
            progress,
        }
    }

    /// Unwrap the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for TrackReadProgress<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);

        if let Poll::Ready(Ok(())) = &poll {
            let read = buf.filled().len() - before;
            if read > 0 {
                this.progress.advance(&this.name, read as u64);
            }
        }

        poll
    }
}
