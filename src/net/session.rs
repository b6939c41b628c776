//! Per-connection state: handshake verification, rolling keys, and the
//! decode-then-buffer path for inbound packets.
//!
//! The first frame the server sends is the scrambled handshake preamble.
//! The first frame the client sends back must echo the verification nonce;
//! anything else closes the connection. After that, both directions rotate
//! their key before crypting every packet.

use rand::Rng;
use tracing::warn;
use uuid::Uuid;

use crate::game::entity::EntityId;
use crate::net::codec::{CodecError, Reader};
use crate::net::crypto::{self, HandshakeKeys};
use crate::net::protocol::{self, ProtocolError, Serverbound};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Handshake verification mismatch")]
    VerificationMismatch,
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingVerification,
    Established,
}

/// One connected client
pub struct ClientSession {
    pub id: Uuid,
    pub state: SessionState,
    keys: HandshakeKeys,
    clientbound_key: u64,
    serverbound_key: u64,
    /// Player-info entity backing this connection
    pub player_info: EntityId,
    /// Commands decoded this frame, applied at the start of the next tick
    pub pending: Vec<Serverbound>,
    pub token: String,
    pub client_uuid: String,
}

/// `hash64` fixes 0, and a zero key makes the keystream all-zero
fn random_key(rng: &mut impl Rng) -> u64 {
    loop {
        let key = rng.gen();
        if key != 0 {
            return key;
        }
    }
}

impl ClientSession {
    pub fn new(rng: &mut impl Rng, player_info: EntityId) -> Self {
        let keys = HandshakeKeys {
            verification: rng.gen(),
            clientbound_key: random_key(rng),
            serverbound_key: random_key(rng),
        };
        Self {
            id: Uuid::new_v4(),
            state: SessionState::AwaitingVerification,
            keys,
            clientbound_key: keys.clientbound_key,
            serverbound_key: keys.serverbound_key,
            player_info,
            pending: Vec::new(),
            token: String::new(),
            client_uuid: String::new(),
        }
    }

    /// The scrambled preamble sent as the first frame of the connection
    pub fn handshake_packet(&self) -> Vec<u8> {
        crypto::encode_handshake(&self.keys)
    }

    /// Process one inbound frame. The verify reply arrives in the clear;
    /// every later frame is decrypted with the rotated serverbound key.
    /// Any error before the session is established is fatal to the
    /// connection; after that an error means the frame was dropped.
    pub fn handle_frame(&mut self, frame: &mut [u8]) -> Result<(), SessionError> {
        match self.state {
            SessionState::AwaitingVerification => self.handle_verification(frame),
            SessionState::Established => {
                self.serverbound_key = crypto::hash64(self.serverbound_key);
                crypto::xor_crypt(frame, self.serverbound_key);
                match protocol::parse_serverbound(frame) {
                    Ok(packet) => {
                        self.pending.push(packet);
                        Ok(())
                    }
                    Err(err) => {
                        warn!(session = %self.id, %err, "dropping malformed packet");
                        Err(err.into())
                    }
                }
            }
        }
    }

    fn handle_verification(&mut self, frame: &[u8]) -> Result<(), SessionError> {
        let mut reader = Reader::new(frame);
        reader.read_u64()?; // client-side junk
        let echoed = reader.read_u64()?;
        if echoed != self.keys.verification {
            warn!(session = %self.id, "handshake verification mismatch");
            return Err(SessionError::VerificationMismatch);
        }
        let token_len = reader.read_varuint()? as usize;
        let uuid_len = reader.read_varuint()? as usize;
        let token = reader.read_bytes(token_len)?;
        let uuid = reader.read_bytes(uuid_len)?;
        self.token = String::from_utf8_lossy(token).into_owned();
        self.client_uuid = String::from_utf8_lossy(uuid).into_owned();
        self.state = SessionState::Established;
        Ok(())
    }

    /// Crypt a clientbound packet in place with the rotated key
    pub fn encrypt_outbound(&mut self, packet: &mut [u8]) {
        self.clientbound_key = crypto::hash64(self.clientbound_key);
        crypto::xor_crypt(packet, self.clientbound_key);
    }

    /// Take the commands buffered since the last tick
    pub fn drain_pending(&mut self) -> Vec<Serverbound> {
        std::mem::take(&mut self.pending)
    }
}
