//! Stream and future types produced by the conversion layer.
//!
//! [`EventStream`] is the multicast half: a `Stream` of typed payloads for
//! one event name, where creating the handle subscribes and dropping it
//! unsubscribes. [`FirstEvent`] is the one-shot half: a future resolving
//! with the first payload of an event, or never.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, oneshot};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::{debug, warn};

use crate::adapter::Registry;
use crate::transport::Payload;

/// Multicast stream of payloads for one event name.
///
/// Every handle for the same event name shares a single raw listener on the
/// transport. The stream never completes or errors on its own: payloads
/// that fail to deserialize into `T` are skipped, and a consumer that lags
/// behind the broadcast buffer skips the missed payloads. Dropping the last
/// handle for an event removes the shared raw listener; a handle created
/// after that sees only events fired from its creation onward.
pub struct EventStream<T = Payload> {
    event: String,
    inner: BroadcastStream<Payload>,
    registry: Arc<Registry>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> EventStream<T> {
    pub(crate) fn new(
        event: String,
        rx: broadcast::Receiver<Payload>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            event,
            inner: BroadcastStream::new(rx),
            registry,
            _marker: PhantomData,
        }
    }

    /// Event name this stream is attached to.
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl<T: DeserializeOwned> Stream for EventStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(payload))) => match serde_json::from_value(payload) {
                    Ok(value) => return Poll::Ready(Some(value)),
                    Err(e) => {
                        debug!("{}: skipping payload that failed to decode: {e}", this.event);
                    }
                },
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(n)))) => {
                    warn!("{}: consumer lagged, skipped {n} event(s)", this.event);
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<T> Drop for EventStream<T> {
    fn drop(&mut self) {
        self.registry.release(&self.event);
    }
}

/// Future resolving with the first occurrence of an event.
///
/// Resolves exactly once or never: if the event never fires, or its payload
/// does not deserialize into `T`, the future stays pending forever. There
/// is no timeout and no error path; dropping the future is the only way to
/// stop waiting.
pub struct FirstEvent<T = Payload> {
    rx: oneshot::Receiver<Payload>,
    done: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FirstEvent<T> {
    pub(crate) fn new(rx: oneshot::Receiver<Payload>) -> Self {
        Self {
            rx,
            done: false,
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Future for FirstEvent<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();
        if this.done {
            return Poll::Pending;
        }
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(payload)) => {
                this.done = true;
                match serde_json::from_value(payload) {
                    Ok(value) => Poll::Ready(value),
                    Err(e) => {
                        debug!("one-shot payload failed to decode, staying pending: {e}");
                        Poll::Pending
                    }
                }
            }
            // Sender dropped without firing: resolve-once-or-never contract,
            // so this future parks permanently rather than erroring.
            Poll::Ready(Err(_)) => {
                this.done = true;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
