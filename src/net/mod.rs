//! Wire protocol and connection handling: codec primitives, handshake
//! obfuscation, packet formats, per-client sessions, and the server harness.

pub mod codec;
pub mod crypto;
pub mod protocol;
pub mod server;
pub mod session;
