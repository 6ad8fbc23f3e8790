//! The wrapped socket adapter.
//!
//! [`WrappedSocket`] owns one transport handle for its whole lifetime and
//! layers two things on top: verbatim pass-throughs for the imperative
//! operations, and a conversion layer that turns named events into
//! multicast streams and one-shot futures. The conversion layer keeps a
//! per-instance registry so that any number of stream handles for the same
//! event name share exactly one raw listener on the transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, oneshot};
use tracing::debug;

use crate::config::SocketConfig;
use crate::error::SocketResult;
use crate::stream::{EventStream, FirstEvent};
use crate::transport::{
    AnyListener, Listener, ListenerId, Payload, Transport, TransportModule,
};

/// Buffer size of each per-event broadcast channel. Consumers that fall
/// more than this many payloads behind skip the missed ones.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One multicast channel per event name with a live raw listener.
struct EventChannel {
    tx: broadcast::Sender<Payload>,
    subscribers: usize,
    listener: ListenerId,
}

/// State shared between the adapter and every stream handle it hands out.
///
/// Invariant: an entry exists for an event name if and only if its
/// subscriber count is positive, which holds if and only if the conversion
/// layer has exactly one raw listener registered for that name. Raw
/// listeners installed through `on`/`once` live outside this registry.
pub(crate) struct Registry {
    transport: Arc<dyn Transport>,
    channels: Mutex<HashMap<String, EventChannel>>,
}

impl Registry {
    /// Subscribe to `event`, registering the single raw listener on first use.
    fn acquire(&self, event: &str) -> broadcast::Receiver<Payload> {
        let mut channels = self.channels.lock().expect("event registry poisoned");

        if let Some(chan) = channels.get_mut(event) {
            chan.subscribers += 1;
            debug!("{event}: {} stream subscriber(s)", chan.subscribers);
            return chan.tx.subscribe();
        }

        let (tx, rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let forward = tx.clone();
        let listener = self.transport.on(
            event,
            Box::new(move |payload| {
                // Send fails only when every receiver is mid-teardown.
                let _ = forward.send(payload);
            }),
        );
        debug!("{event}: raw listener registered");
        channels.insert(
            event.to_string(),
            EventChannel {
                tx,
                subscribers: 1,
                listener,
            },
        );
        rx
    }

    /// Drop one subscription; tears the raw listener down on the last one.
    pub(crate) fn release(&self, event: &str) {
        let mut channels = self.channels.lock().expect("event registry poisoned");
        let Some(chan) = channels.get_mut(event) else {
            return;
        };
        chan.subscribers -= 1;
        if chan.subscribers == 0 {
            let id = chan.listener;
            channels.remove(event);
            self.transport.remove_listener(event, Some(id));
            debug!("{event}: raw listener removed");
        } else {
            debug!("{event}: {} stream subscriber(s)", chan.subscribers);
        }
    }

    fn subscriber_count(&self, event: &str) -> usize {
        self.channels
            .lock()
            .expect("event registry poisoned")
            .get(event)
            .map(|chan| chan.subscribers)
            .unwrap_or(0)
    }
}

/// Reactive wrapper around one live transport connection.
///
/// The transport handle is created once, at construction, and never
/// recreated; reconnection lives inside the transport. All imperative
/// operations forward to the transport with no added semantics. The
/// conversion layer ([`event_stream`](Self::event_stream),
/// [`first_event`](Self::first_event)) is the only part with behavior of
/// its own: reference-counted listener multiplexing.
pub struct WrappedSocket {
    config: SocketConfig,
    registry: Arc<Registry>,
}

impl WrappedSocket {
    /// Create the adapter and open the single underlying connection.
    ///
    /// A missing configuration behaves exactly like
    /// [`SocketConfig::default`]. The url and options reach the transport
    /// factory verbatim; anything malformed is the transport's to reject.
    pub fn new(config: Option<SocketConfig>, module: TransportModule) -> SocketResult<Self> {
        let config = config.unwrap_or_default();
        let factory = module.resolve()?;
        let transport = factory.create(&config.url, &config.options);
        debug!("socket adapter created for url {:?}", config.url);
        Ok(Self {
            config,
            registry: Arc::new(Registry {
                transport,
                channels: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Url this adapter was constructed with.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn transport(&self) -> &dyn Transport {
        self.registry.transport.as_ref()
    }

    /// Switch the connection to `namespace`.
    ///
    /// Side effect only: the namespace-scoped handle the transport produces
    /// is not exposed to the caller.
    pub fn of(&self, namespace: &str) {
        self.transport().of(namespace);
    }

    /// Register a raw listener, bypassing the multicast registry.
    pub fn on(&self, event: &str, listener: Listener) -> ListenerId {
        self.transport().on(event, listener)
    }

    /// Register a raw one-shot listener, bypassing the multicast registry.
    pub fn once(&self, event: &str, listener: Listener) -> ListenerId {
        self.transport().once(event, listener)
    }

    /// Register a catch-all listener receiving every event.
    pub fn on_any(&self, listener: AnyListener) -> ListenerId {
        self.transport().on_any(listener)
    }

    /// Register a catch-all listener ahead of any existing ones.
    pub fn prepend_any(&self, listener: AnyListener) -> ListenerId {
        self.transport().prepend_any(listener)
    }

    /// Remove every catch-all listener.
    pub fn off_any(&self) {
        self.transport().off_any();
    }

    /// Initiate or resume the connection.
    pub fn connect(&self) -> SocketResult<()> {
        self.transport().connect()
    }

    /// Tear the connection down.
    pub fn disconnect(&self) -> SocketResult<()> {
        self.transport().disconnect()
    }

    /// Emit `event` with `args`, forwarded verbatim.
    pub fn emit(&self, event: &str, args: Vec<Payload>) -> SocketResult<()> {
        self.transport().emit(event, args)
    }

    /// Remove a raw listener.
    ///
    /// Operates on the transport's listener space directly and does not
    /// consult the multicast registry. Removing a listener installed by
    /// [`event_stream`](Self::event_stream) this way leaves the registry
    /// with a stale entry for that event name.
    pub fn remove_listener(&self, event: &str, id: Option<ListenerId>) {
        self.transport().remove_listener(event, id);
    }

    /// Remove every raw listener for `event`, or for all events when
    /// `None`. Same caveat as [`remove_listener`](Self::remove_listener).
    pub fn remove_all_listeners(&self, event: Option<&str>) {
        self.transport().remove_all_listeners(event);
    }

    /// Multicast stream of every `event` occurrence.
    ///
    /// The returned handle is the subscription: creating the first handle
    /// for an event name registers one raw listener on the transport,
    /// further handles share it, and dropping the last one removes it. At
    /// most one raw listener per event name ever exists through this path.
    /// After full teardown a later call starts fresh and sees only events
    /// fired from then on.
    pub fn event_stream<T: DeserializeOwned>(&self, event: &str) -> EventStream<T> {
        let rx = self.registry.acquire(event);
        EventStream::new(event.to_string(), rx, Arc::clone(&self.registry))
    }

    /// Future resolving with the payload of the next `event` occurrence.
    ///
    /// Uses the transport's one-shot registration and never touches the
    /// multicast registry. Resolves exactly once; if the event never fires
    /// the future stays pending forever.
    pub fn first_event<T: DeserializeOwned>(&self, event: &str) -> FirstEvent<T> {
        let (tx, rx) = oneshot::channel();
        let mut slot = Some(tx);
        self.transport().once(
            event,
            Box::new(move |payload| {
                if let Some(tx) = slot.take() {
                    let _ = tx.send(payload);
                }
            }),
        );
        FirstEvent::new(rx)
    }

    /// Number of live [`event_stream`](Self::event_stream) handles for `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.registry.subscriber_count(event)
    }
}
