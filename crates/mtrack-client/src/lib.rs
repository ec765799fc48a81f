//! Configuration-aware protocol client for the mtrack peripheral.
//!
//! Response layouts depend on configuration the client negotiated earlier
//! (per-channel data masks, stream prefix fields), so the client keeps a
//! [`ConfigState`] and decodes every payload against it. Each operation
//! returns a [`Reply`] that keeps transport, device and decode outcomes
//! apart.
//!
//! ```no_run
//! use std::cell::Cell;
//!
//! use mtrack_client::{Client, SessionConfig, SimulatedDevice};
//!
//! let mut client = Client::new(SimulatedDevice::new());
//! let version = client.get_version().into_result()?;
//! println!("firmware {version}");
//!
//! client.set_stream_period(160).into_result()?;
//! let seen = Cell::new(0);
//! let report = client.read_stream(&SessionConfig::default(), || seen.get() >= 10, |sample| {
//!     seen.set(seen.get() + 1);
//!     println!("{sample:?}");
//! });
//! println!("stopped: {}", report.stop);
//! # Ok::<(), mtrack_client::ClientError>(())
//! ```

pub mod client;
pub mod cursor;
pub mod decode;
pub mod error;
pub mod reply;
pub mod sample;
pub mod sim;
pub mod state;
pub mod stream;

pub use client::Client;
pub use cursor::PayloadCursor;
pub use error::{ClientError, DecodeError, DecodeResult, Result};
pub use reply::Reply;
pub use sample::{MotionSample, MotionStatus, StreamSample};
pub use sim::{SimulatedDevice, SIM_VERSION};
pub use state::ConfigState;
pub use stream::{
    SessionConfig, StopReason, StreamFault, StreamReport, StreamState, DEFAULT_IDLE_BACKOFF,
    DEFAULT_STALENESS,
};
