//! Reactive stream adapter over a socket.io-style real-time transport.
//!
//! This crate wraps one live transport connection and exposes:
//! - Pass-through imperative operations: `connect`, `disconnect`, `emit`,
//!   raw listener registration and removal
//! - Multicast event streams via [`WrappedSocket::event_stream`], where any
//!   number of stream handles for the same event name share exactly one raw
//!   listener on the transport
//! - One-shot event futures via [`WrappedSocket::first_event`]
//!
//! The transport itself -- socket connection, reconnection, transport
//! negotiation, message framing -- is supplied from outside through the
//! [`Transport`] trait. This crate implements none of it and forwards all
//! transport failures unchanged.

pub mod adapter;
pub mod config;
pub mod error;
pub mod stream;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapter::WrappedSocket;
pub use config::SocketConfig;
pub use error::{SocketError, SocketResult};
pub use stream::{EventStream, FirstEvent};
pub use transport::{
    AnyListener, ConnectOptions, Listener, ListenerId, Payload, Transport, TransportFactory,
    TransportModule,
};
