//! In-memory transport used by unit tests.
//!
//! Records every call made through the [`Transport`] trait and lets tests
//! deliver events as a server would via [`MockTransport::fire`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::SocketResult;
use crate::transport::{AnyListener, Listener, ListenerId, Payload, Transport};

/// One call observed on the transport surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Of(String),
    On(String),
    Once(String),
    OnAny,
    PrependAny,
    OffAny,
    Connect,
    Disconnect,
    Emit(String, Vec<Payload>),
    RemoveListener(String, Option<ListenerId>),
    RemoveAllListeners(Option<String>),
}

struct RegisteredListener {
    id: ListenerId,
    callback: Listener,
    once: bool,
}

/// Event-emitter double with call recording.
#[derive(Default)]
pub struct MockTransport {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<String, Vec<RegisteredListener>>>,
    any_listeners: Mutex<Vec<(ListenerId, AnyListener)>>,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn alloc(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    /// Deliver an event to every registered listener, as the server would:
    /// catch-all listeners first, then per-event listeners in registration
    /// order, dropping one-shot listeners after they fire.
    pub fn fire(&self, event: &str, payload: Payload) {
        for (_, listener) in self.any_listeners.lock().unwrap().iter_mut() {
            listener(event, payload.clone());
        }
        let mut listeners = self.listeners.lock().unwrap();
        if let Some(entries) = listeners.get_mut(event) {
            for entry in entries.iter_mut() {
                (entry.callback)(payload.clone());
            }
            entries.retain(|entry| !entry.once);
            if entries.is_empty() {
                listeners.remove(event);
            }
        }
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .lock()
            .unwrap()
            .get(event)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    /// Number of calls to `connect` so far.
    pub fn connect_count(&self) -> usize {
        self.count_calls(|call| matches!(call, Call::Connect))
    }

    /// Snapshot of every call observed so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Count the observed calls matching a predicate.
    pub fn count_calls(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }
}

impl Transport for MockTransport {
    fn of(&self, namespace: &str) {
        self.record(Call::Of(namespace.to_string()));
    }

    fn on(&self, event: &str, listener: Listener) -> ListenerId {
        let id = self.alloc();
        self.record(Call::On(event.to_string()));
        self.listeners
            .lock()
            .unwrap()
            .entry(event.to_string())
            .or_default()
            .push(RegisteredListener {
                id,
                callback: listener,
                once: false,
            });
        id
    }

    fn once(&self, event: &str, listener: Listener) -> ListenerId {
        let id = self.alloc();
        self.record(Call::Once(event.to_string()));
        self.listeners
            .lock()
            .unwrap()
            .entry(event.to_string())
            .or_default()
            .push(RegisteredListener {
                id,
                callback: listener,
                once: true,
            });
        id
    }

    fn on_any(&self, listener: AnyListener) -> ListenerId {
        let id = self.alloc();
        self.record(Call::OnAny);
        self.any_listeners.lock().unwrap().push((id, listener));
        id
    }

    fn prepend_any(&self, listener: AnyListener) -> ListenerId {
        let id = self.alloc();
        self.record(Call::PrependAny);
        self.any_listeners.lock().unwrap().insert(0, (id, listener));
        id
    }

    fn off_any(&self) {
        self.record(Call::OffAny);
        self.any_listeners.lock().unwrap().clear();
    }

    fn connect(&self) -> SocketResult<()> {
        self.record(Call::Connect);
        Ok(())
    }

    fn disconnect(&self) -> SocketResult<()> {
        self.record(Call::Disconnect);
        Ok(())
    }

    fn emit(&self, event: &str, args: Vec<Payload>) -> SocketResult<()> {
        self.record(Call::Emit(event.to_string(), args));
        Ok(())
    }

    fn remove_listener(&self, event: &str, id: Option<ListenerId>) {
        self.record(Call::RemoveListener(event.to_string(), id));
        let mut listeners = self.listeners.lock().unwrap();
        if let Some(entries) = listeners.get_mut(event) {
            match id {
                Some(id) => entries.retain(|entry| entry.id != id),
                None => entries.clear(),
            }
            if entries.is_empty() {
                listeners.remove(event);
            }
        }
    }

    fn remove_all_listeners(&self, event: Option<&str>) {
        self.record(Call::RemoveAllListeners(event.map(str::to_string)));
        match event {
            Some(event) => {
                self.listeners.lock().unwrap().remove(event);
            }
            None => self.listeners.lock().unwrap().clear(),
        }
    }
}
