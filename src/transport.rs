//! Transport contract consumed by the adapter.
//!
//! The adapter never touches a network itself. It drives an externally
//! supplied transport through the [`Transport`] trait, which mirrors the
//! conventional event-emitter surface of socket.io-style clients. The
//! transport owns connection lifecycle, reconnection, and framing.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{SocketError, SocketResult};

/// Raw event payload as delivered by the transport.
pub type Payload = Value;

/// Connection options forwarded verbatim to the transport factory.
pub type ConnectOptions = HashMap<String, Value>;

/// Callback registered against the transport for a single named event.
pub type Listener = Box<dyn FnMut(Payload) + Send + 'static>;

/// Catch-all callback receiving every event together with its name.
pub type AnyListener = Box<dyn FnMut(&str, Payload) + Send + 'static>;

/// Opaque identifier for a registered listener, used for targeted removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Event-emitter surface the underlying transport must provide.
///
/// Conventional semantics apply: `on` listeners fire on every occurrence of
/// their event until removed, `once` listeners fire at most once, catch-all
/// listeners fire for every event. Delivery order among listeners follows
/// registration order, with `prepend_any` jumping the catch-all queue.
pub trait Transport: Send + Sync {
    /// Switch the connection to a namespace. Side effect only; the
    /// namespace-scoped handle stays inside the transport.
    fn of(&self, namespace: &str);

    /// Register a listener for `event`.
    fn on(&self, event: &str, listener: Listener) -> ListenerId;

    /// Register a listener for the next occurrence of `event` only.
    fn once(&self, event: &str, listener: Listener) -> ListenerId;

    /// Register a catch-all listener behind any existing ones.
    fn on_any(&self, listener: AnyListener) -> ListenerId;

    /// Register a catch-all listener ahead of any existing ones.
    fn prepend_any(&self, listener: AnyListener) -> ListenerId;

    /// Remove every catch-all listener.
    fn off_any(&self);

    /// Initiate or resume the connection.
    fn connect(&self) -> SocketResult<()>;

    /// Tear the connection down.
    fn disconnect(&self) -> SocketResult<()>;

    /// Send `event` with the given arguments.
    fn emit(&self, event: &str, args: Vec<Payload>) -> SocketResult<()>;

    /// Remove one listener for `event` (all of them when `id` is `None`).
    fn remove_listener(&self, event: &str, id: Option<ListenerId>);

    /// Remove every listener for `event`, or for all events when `None`.
    fn remove_all_listeners(&self, event: Option<&str>);
}

/// Factory that opens one live connection from a url and options.
///
/// Implemented for free by any matching closure, which is the usual way to
/// hand a transport library to the adapter.
pub trait TransportFactory: Send + Sync {
    /// Create a connected (or connecting) transport handle.
    fn create(&self, url: &str, options: &ConnectOptions) -> Arc<dyn Transport>;
}

impl<F> TransportFactory for F
where
    F: Fn(&str, &ConnectOptions) -> Arc<dyn Transport> + Send + Sync,
{
    fn create(&self, url: &str, options: &ConnectOptions) -> Arc<dyn Transport> {
        self(url, options)
    }
}

/// Packaging of the transport library's connection factory.
///
/// Depending on how the library is bundled, its factory is exposed either
/// directly or nested under a `default` slot. The adapter detects which
/// form is present once, at construction time: the direct form is tried
/// first, with the `default` slot as the fallback.
pub struct TransportModule {
    direct: Option<Box<dyn TransportFactory>>,
    default: Option<Box<dyn TransportFactory>>,
}

impl TransportModule {
    /// A module exposing its factory as a direct export.
    pub fn direct(factory: impl TransportFactory + 'static) -> Self {
        Self {
            direct: Some(Box::new(factory)),
            default: None,
        }
    }

    /// A module nesting its factory under a `default` slot.
    pub fn bundled(factory: impl TransportFactory + 'static) -> Self {
        Self {
            direct: None,
            default: Some(Box::new(factory)),
        }
    }

    /// A module exposing no factory at all. Construction from such a
    /// module fails with [`SocketError::FactoryNotCallable`].
    pub fn empty() -> Self {
        Self {
            direct: None,
            default: None,
        }
    }

    /// Attach a `default`-slot factory alongside the existing shape.
    pub fn with_default(mut self, factory: impl TransportFactory + 'static) -> Self {
        self.default = Some(Box::new(factory));
        self
    }

    /// Pick the usable factory: direct export first, `default` slot second.
    pub(crate) fn resolve(&self) -> SocketResult<&dyn TransportFactory> {
        self.direct
            .as_deref()
            .or(self.default.as_deref())
            .ok_or(SocketError::FactoryNotCallable)
    }
}
