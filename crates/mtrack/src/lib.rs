//! Host-side client for the mtrack motion-sensing peripheral.
//!
//! The peripheral speaks a command/response protocol over SPI with a
//! separate ready line. Response layouts depend on per-channel data masks
//! the host configured earlier, so decoding is stateful.
//!
//! # Crate Structure
//!
//! - [`link`]: the `Link` trait, the `embedded-hal` link and its Linux spidev binding
//! - [`packet`]: opcodes, wire types, request encoding and the ready-line codec
//! - [`client`]: configuration-aware client, stream session and a simulated
//!   device (behind the `client` feature)

/// Re-export link types.
pub mod link {
    pub use mtrack_link::*;
}

/// Re-export packet types.
pub mod packet {
    pub use mtrack_packet::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use mtrack_client::*;
}
