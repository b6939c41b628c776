//! Rolling-key XOR obfuscation and the connection handshake preamble.
//!
//! This is wire obfuscation, not encryption: the keystream is a 64-bit
//! avalanche hash chained from the previous key, and every pass is its own
//! inverse. It deters casual packet inspection and nothing more.

use crate::net::codec::{Reader, Writer};

/// 64-bit finalizer-style avalanche hash; also the per-packet key rotation
#[inline]
pub fn hash64(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51afd7ed558ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ceb9fe1a85ec53);
    x ^= x >> 33;
    x
}

/// XOR the buffer against the rolling keystream seeded by `key`.
/// Self-inverse: applying it twice with the same key is the identity.
pub fn xor_crypt(data: &mut [u8], mut key: u64) {
    for byte in data {
        key = hash64(key);
        *byte ^= key as u8;
    }
}

/// Size of the scrambled handshake preamble
pub const HANDSHAKE_SIZE: usize = 1024;

/// The five fixed scramble passes applied to the preamble: (length, key).
/// The client applies the same sequence to unscramble; XOR passes commute,
/// so the order only matters for the lengths.
pub const HANDSHAKE_PASSES: [(usize, u64); 5] = [
    (1024, 21094093777837637),
    (8, 1),
    (1024, 59731158950470853),
    (1024, 64709235936361169),
    (1024, 59013169977270713),
];

/// Session keys issued to one connection in the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeKeys {
    pub verification: u64,
    pub clientbound_key: u64,
    pub serverbound_key: u64,
}

/// Build the scrambled first packet: nonce u64, 4 padding bytes, then the
/// clientbound and serverbound keys, in a fixed-size buffer
pub fn encode_handshake(keys: &HandshakeKeys) -> Vec<u8> {
    let mut writer = Writer::with_capacity(HANDSHAKE_SIZE);
    writer.write_u64(keys.verification);
    writer.write_u32(0);
    writer.write_u64(keys.clientbound_key);
    writer.write_u64(keys.serverbound_key);
    let mut buffer = writer.into_vec();
    buffer.resize(HANDSHAKE_SIZE, 0);
    for (len, key) in HANDSHAKE_PASSES {
        xor_crypt(&mut buffer[..len], key);
    }
    buffer
}

/// Unscramble a handshake preamble and read back the keys
pub fn decode_handshake(buffer: &mut [u8]) -> Option<HandshakeKeys> {
    if buffer.len() != HANDSHAKE_SIZE {
        return None;
    }
    for (len, key) in HANDSHAKE_PASSES {
        xor_crypt(&mut buffer[..len], key);
    }
    let mut reader = Reader::new(buffer);
    let verification = reader.read_u64().ok()?;
    reader.read_u32().ok()?;
    let clientbound_key = reader.read_u64().ok()?;
    let serverbound_key = reader.read_u64().ok()?;
    Some(HandshakeKeys {
        verification,
        clientbound_key,
        serverbound_key,
    })
}
