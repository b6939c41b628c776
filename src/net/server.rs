//! Server harness: owns the simulation and every client session, applies
//! buffered commands at tick boundaries, and hands encrypted frames to the
//! transport.
//!
//! The transport itself lives outside this crate; it calls `on_connect`,
//! `apply_inbound`, and `collect_outbound`, and forwards the returned frames.

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::game::components::LoadoutEntry;
use crate::game::constants::{sim, squad, team};
use crate::game::data::{MobId, Rarity};
use crate::game::entity::{ComponentKind, EntityId};
use crate::game::simulation::Simulation;
use crate::net::protocol::{self, Serverbound};
use crate::net::session::{ClientSession, SessionState};
use crate::util::vec2::Vec2;

pub struct GameServer {
    pub simulation: Simulation,
    sessions: FxHashMap<Uuid, ClientSession>,
    config: ServerConfig,
}

impl GameServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            simulation: Simulation::new(),
            sessions: FxHashMap::default(),
            config,
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Accept a connection: allocate a squad slot and a player-info entity,
    /// and return the connection id with the handshake preamble to send.
    /// Returns None when the server is full.
    pub fn on_connect(&mut self) -> Option<(Uuid, Vec<u8>)> {
        if self.sessions.len() >= self.config.max_clients {
            warn!("Rejecting connection: server full ({} clients)", self.sessions.len());
            return None;
        }
        let (squad, squad_pos) = self.allocate_squad_slot()?;
        let player_info = self.simulation.spawn_player_info(squad, squad_pos);
        if player_info.is_null() {
            warn!("Rejecting connection: entity store full");
            return None;
        }
        let session = ClientSession::new(&mut self.simulation.rng, player_info);
        let id = session.id;
        let preamble = session.handshake_packet();
        info!("Client {} connected (squad {} slot {})", id, squad, squad_pos);
        self.sessions.insert(id, session);
        Some((id, preamble))
    }

    /// Lowest free (squad, position) pair
    fn allocate_squad_slot(&self) -> Option<(u8, u8)> {
        let mut taken = [[false; squad::MEMBER_COUNT]; squad::COUNT];
        for session in self.sessions.values() {
            let info = &self.simulation.player_info[session.player_info.index()];
            taken[info.squad as usize][info.squad_pos as usize] = true;
        }
        for (s, slots) in taken.iter().enumerate() {
            for (p, used) in slots.iter().enumerate() {
                if !used {
                    return Some((s as u8, p as u8));
                }
            }
        }
        None
    }

    /// Tear down a connection's entities. Orphaned petals clean themselves
    /// up on the next orbit pass.
    pub fn on_disconnect(&mut self, id: Uuid) {
        let Some(session) = self.sessions.remove(&id) else {
            return;
        };
        let player = session.player_info;
        let flower = self.simulation.player_info[player.index()].flower_id;
        self.simulation.store.request_deletion(flower);
        self.simulation.store.request_deletion(player);
        info!("Client {} disconnected", id);
    }

    /// Feed one inbound frame to its session. Any error during the handshake
    /// closes the connection; errors on established sessions drop the frame.
    pub fn apply_inbound(&mut self, id: Uuid, frame: &mut [u8]) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        let verifying = session.state == SessionState::AwaitingVerification;
        match session.handle_frame(frame) {
            Ok(()) => {}
            Err(err) if verifying => {
                warn!("Client {}: handshake failed: {}", id, err);
                self.on_disconnect(id);
            }
            Err(err) => debug!("Client {}: dropped frame: {}", id, err),
        }
    }

    /// Encode and encrypt the per-tick state update for one connection
    pub fn collect_outbound(&mut self, id: Uuid) -> Option<Vec<u8>> {
        let session = self.sessions.get_mut(&id)?;
        let mut frame = protocol::encode_state_update(&mut self.simulation, session.player_info);
        session.encrypt_outbound(&mut frame);
        Some(frame)
    }

    /// Encode and encrypt the squad roster packet for one connection
    pub fn collect_squad_update(&mut self, id: Uuid, countdown: u8) -> Option<Vec<u8>> {
        let session = self.sessions.get(&id)?;
        let player = session.player_info;
        let own_squad = self.simulation.player_info[player.index()].squad;

        let mut members = [crate::game::entity::NULL_ENTITY; squad::MEMBER_COUNT];
        for other in self.sessions.values() {
            let info = &self.simulation.player_info[other.player_info.index()];
            if info.squad == own_squad {
                members[info.squad_pos as usize] = other.player_info;
            }
        }
        let mut frame = protocol::encode_squad_update(&self.simulation, countdown, &members);
        let session = self.sessions.get_mut(&id)?;
        session.encrypt_outbound(&mut frame);
        Some(frame)
    }

    /// Run one server tick: apply every buffered command, feed player
    /// movement into the flowers, step the simulation, then refresh cameras.
    pub fn tick(&mut self) {
        let ids: Vec<Uuid> = self.sessions.keys().copied().collect();
        for id in ids {
            let Some(session) = self.sessions.get_mut(&id) else {
                continue;
            };
            let player = session.player_info;
            for command in session.drain_pending() {
                apply_command(&mut self.simulation, player, command);
            }
        }

        for session in self.sessions.values() {
            let player = session.player_info;
            let info = &self.simulation.player_info[player.index()];
            let flower = info.flower_id;
            let movement = info.movement;
            if self.simulation.store.has(flower, ComponentKind::Flower) {
                let physical = self.simulation.physical_mut(flower);
                physical.acceleration = movement;
                if movement.length_sq() > 0.0 {
                    physical.angle = movement.angle();
                }
            }
        }

        self.simulation.tick();

        for session in self.sessions.values() {
            let player = session.player_info;
            let flower = self.simulation.player_info[player.index()].flower_id;
            if self.simulation.store.has(flower, ComponentKind::Flower) {
                let position = self.simulation.physical(flower).position;
                self.simulation.player_info[player.index()].camera = position;
            }
        }
    }
}

fn apply_command(sim: &mut Simulation, player: EntityId, command: Serverbound) {
    match command {
        Serverbound::Input { flags, .. } => {
            let info = &mut sim.player_info[player.index()];
            info.input = (flags >> 4) & 7;
            info.movement = protocol::movement_direction(flags & 0x0f);
        }
        Serverbound::Spawn => {
            if sim.player_info[player.index()].flower_id.is_null() {
                sim.spawn_flower(player);
            }
        }
        Serverbound::PetalSwitch(slots) => {
            for slot in slots {
                let info = &sim.player_info[player.index()];
                let primary = LoadoutEntry {
                    id: info.slots[slot].id,
                    rarity: info.slots[slot].rarity,
                };
                let secondary = info.secondary[slot];
                sim.set_loadout_slot(player, slot, secondary.id, secondary.rarity);
                sim.player_info[player.index()].secondary[slot] = primary;
            }
        }
        Serverbound::Cheat { cheat_type } => match cheat_type {
            // dev summon: a mob at the player's camera
            1 => {
                let at = sim.player_info[player.index()].camera + Vec2::new(200.0, 0.0);
                sim.spawn_mob(MobId::BabyAnt, Rarity::Common, at, team::MOBS, false);
            }
            other => debug!("Unhandled cheat type {}", other),
        },
        Serverbound::Loadout(changes) => {
            for change in changes {
                if change.pos < crate::game::constants::petal::MAX_SLOTS {
                    sim.set_loadout_slot(player, change.pos, change.id, change.rarity);
                } else {
                    let idx = change.pos - crate::game::constants::petal::MAX_SLOTS;
                    sim.player_info[player.index()].secondary[idx] = LoadoutEntry {
                        id: change.id,
                        rarity: change.rarity,
                    };
                }
            }
        }
    }
}

/// Frames the tick loop wants the transport to deliver
pub type OutboundFrame = (Uuid, Vec<u8>);

/// Start the fixed-rate tick loop. Each tick steps the server and pushes one
/// encrypted state update per connection into the outbound channel.
pub fn start_tick_loop(
    server: Arc<RwLock<GameServer>>,
    outbound: mpsc::Sender<OutboundFrame>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let tick_duration_ms = server.read().await.config.tick_duration_ms;
        let mut ticker = interval(Duration::from_millis(tick_duration_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Tick loop started at {} ms per tick", tick_duration_ms);

        let mut tick_count: u64 = 0;
        loop {
            ticker.tick().await;
            tick_count += 1;

            let mut server = server.write().await;
            server.tick();

            let ids: Vec<Uuid> = server.sessions.keys().copied().collect();
            for id in ids {
                if let Some(frame) = server.collect_outbound(id) {
                    if outbound.send((id, frame)).await.is_err() {
                        info!("Outbound channel closed, stopping tick loop");
                        return;
                    }
                }
            }

            // periodic stats, once every 30 seconds
            if tick_count % (sim::TICK_RATE as u64 * 30) == 0 {
                info!(
                    "Tick {}: {} clients, {} entities",
                    server.simulation.tick,
                    server.session_count(),
                    server.simulation.store.live_count()
                );
            }
        }
    })
}
