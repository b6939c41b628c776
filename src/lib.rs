//! Petal Royale Server Library
//!
//! An authoritative simulation server for a petal-arena multiplayer game:
//! a fixed-rate tick loop over component tables, spatial-hash collision
//! detection, mob AI, petal orbits, loot drops, and an obfuscated binary
//! wire protocol.

pub mod config;
pub mod game;
pub mod net;
pub mod util;
