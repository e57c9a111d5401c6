//! # libmq - Embedded MQTT Client
//!
//! A lightweight MQTT 3.1.1 client for constrained, single-connection embedded
//! devices. The crate implements the full protocol engine: connection
//! handshake, binary packet framing and decoding, the QoS 0/1/2
//! publish/acknowledge state machines, subscribe/unsubscribe handling,
//! keep-alive supervision, and a reconnect-on-failure session wrapper.
//!
//! ## Design
//!
//! - **Blocking with timeouts**: every socket read and write is bounded by an
//!   explicit timeout. There is no async runtime and no hidden task machinery;
//!   the caller drives the client from its own loop.
//! - **`no_std` and zero-allocation**: packet framing happens in two
//!   caller-supplied byte buffers; subscription state lives in fixed-capacity
//!   [`heapless`] containers.
//! - **Transport agnostic**: the client talks to the network through the
//!   [`transport`] traits, so it runs over raw TCP sockets, TLS wrappers,
//!   cellular modem channels, or anything else that behaves like an ordered
//!   byte stream.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use libmq::client::{Client, ConnectOptions};
//! use libmq::packet::QoS;
//! # use libmq::time::Clock;
//! # use libmq::transport::{Close, Connection, Read, Write};
//! # struct TcpConnection;
//! # impl Read for TcpConnection {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8], _t: u32) -> Result<usize, ()> { Ok(0) }
//! # }
//! # impl Write for TcpConnection {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8], _t: u32) -> Result<usize, ()> { Ok(buf.len()) }
//! # }
//! # impl Close for TcpConnection {
//! #     type Error = ();
//! #     fn close(&mut self) -> Result<(), ()> { Ok(()) }
//! # }
//! # impl Connection for TcpConnection {}
//! # struct SysClock;
//! # impl Clock for SysClock {
//! #     fn now_ms(&self) -> u64 { 0 }
//! # }
//!
//! let mut send_buf = [0u8; 512];
//! let mut read_buf = [0u8; 512];
//! let conn = TcpConnection;
//!
//! let mut client: Client<'_, _, _, 8> =
//!     Client::new(conn, SysClock, &mut send_buf, &mut read_buf, 5_000);
//!
//! fn on_message(msg: &libmq::client::Message<'_>) {
//!     // handle inbound publishes
//! }
//!
//! let options = ConnectOptions::new("sensor_device_01").keep_alive(60);
//! // client.connect(&options)?;
//! // client.subscribe("commands/+", QoS::AtLeastOnce, on_message)?;
//! // client.publish("sensors/temperature", b"23.5", QoS::AtMostOnce, false)?;
//! // loop { client.process(200)?; }
//! ```
//!
//! ## Concurrency model
//!
//! Exactly one command is in flight at a time: every public operation takes
//! `&mut self`, which is the mutual exclusion the protocol relies on. A
//! firmware that shares the client between a command task and a periodic
//! polling task wraps it in the platform's mutex and holds the lock for the
//! duration of each call.
//!
//! ## Optional features
//!
//! - `std`: enable standard library support (default: disabled)
//! - `defmt`: derive `defmt::Format` on public types for embedded debugging
//! - `log`: emit `log` records at connection lifecycle and keep-alive events

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

/// Crate-wide error type covering transport, codec, and protocol failures.
pub mod error;

/// Monotonic countdown timers over a platform clock source.
pub mod time;

/// Blocking transport traits with explicit per-call timeouts.
pub mod transport;

/// Pure encode/decode between packet structures and the MQTT wire format.
pub mod packet;

/// The protocol engine, session facade, and reconnection supervisor.
pub mod client;
