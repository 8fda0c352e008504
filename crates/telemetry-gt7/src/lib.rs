//! Gran Turismo 7 telemetry protocol.
//!
//! The console broadcasts Salsa20-encrypted datagrams on UDP port 33740 to
//! any host that keeps sending a one-byte heartbeat to port 33739.
//!
//! - [`cipher`]: keystream derivation and the packet variants (`A`, `B`, `~`)
//! - [`packet`]: the decoded [`TelemetryPacket`] and its byte layout
//! - [`listener`]: the blocking receive thread and heartbeat

#![deny(static_mut_refs)]

pub mod cipher;
pub mod listener;
pub mod packet;

pub use cipher::{MAX_PACKET_SIZE, PACKET_SIZE, PacketCipher, PacketType};
pub use listener::{
    DatagramHandler, HEARTBEAT_PORT, HeartbeatConfig, ListenerConfig, ListenerExit, UdpListener,
};
pub use packet::{
    ExtendedData, MAGIC, PacketDecoder, PacketFlags, Quaternion, TelemetryPacket, Vec3, decode,
};

/// Port the console broadcasts telemetry to.
pub const TELEMETRY_PORT: u16 = gt7_telemetry_core::DEFAULT_PORT;
