//! Blocking convenience wrappers for callers outside an async runtime.
//!
//! Every operation in [`crate::channel::Channel`] is an `async fn`; these
//! wrappers park the calling thread on [`futures::executor::block_on`] so a
//! caller with no executor in scope can still drive a read or write to
//! completion. Timer/cancel callbacks still run on the shared background
//! timer thread, so a blocking caller gets the same deadline semantics as
//! an async one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::executor::block_on;

use crate::channel::Channel;
use crate::error::ChannelError;
use crate::request::CancelToken;

/// Blocking extension methods for [`Channel`], usable from plain threads
/// with no async runtime in scope.
pub trait BlockingChannelExt<T: Clone + Send + 'static> {
    fn write_blocking(&self, value: T) -> Result<(), ChannelError>;
    fn write_timeout(&self, value: T, timeout: Duration) -> Result<(), ChannelError>;
    fn read_blocking(&self) -> Result<T, ChannelError>;
    fn read_timeout(&self, timeout: Duration) -> Result<T, ChannelError>;
    fn read_cancellable(&self, cancel: CancelToken) -> Result<T, ChannelError>;
}

impl<T: Clone + Send + 'static> BlockingChannelExt<T> for Arc<Channel<T>> {
    fn write_blocking(&self, value: T) -> Result<(), ChannelError> {
        block_on(self.write(value))
    }

    fn write_timeout(&self, value: T, timeout: Duration) -> Result<(), ChannelError> {
        let deadline = Instant::now() + timeout;
        block_on(self.write_opts(value, None, Some(deadline), None))
    }

    fn read_blocking(&self) -> Result<T, ChannelError> {
        block_on(self.read())
    }

    fn read_timeout(&self, timeout: Duration) -> Result<T, ChannelError> {
        let deadline = Instant::now() + timeout;
        block_on(self.read_opts(None, Some(deadline), None))
    }

    fn read_cancellable(&self, cancel: CancelToken) -> Result<T, ChannelError> {
        block_on(self.read_opts(None, None, Some(cancel)))
    }
}
