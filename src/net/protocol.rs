//! Packet formats: serverbound parsing and clientbound encoding.
//!
//! Every packet starts with a one-byte kind. Serverbound packets are
//! validated strictly; a malformed packet is an error the session layer logs
//! and drops without touching simulation state.

use smallvec::SmallVec;

use crate::game::constants::{petal, squad};
use crate::game::data::{PetalId, Rarity};
use crate::game::entity::{ComponentKind, EntityId};
use crate::game::simulation::Simulation;
use crate::game::systems::collision::{classify, CollisionClass};
use crate::net::codec::{CodecError, Reader, Writer};
use crate::util::vec2::Vec2;

/// Packet kind bytes shared with the client
pub mod kind {
    /// Serverbound input; clientbound world state
    pub const UPDATE: u8 = 0;
    pub const SPAWN: u8 = 1;
    pub const PETAL_SWITCH: u8 = 2;
    pub const CHEAT: u8 = 3;
    pub const SQUAD_UPDATE: u8 = 69;
    pub const LOADOUT: u8 = 70;
}

/// Exact size of an input packet: kind, movement type, flags, mouse x, mouse y
pub const INPUT_PACKET_SIZE: usize = 11;

/// Half-extent of the view box streamed around each camera
pub const VIEW_HALF_EXTENT: f32 = 1024.0;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("Unknown serverbound packet kind {0}")]
    UnknownKind(u8),
    #[error("Input packet is {0} bytes, expected {INPUT_PACKET_SIZE}")]
    BadInputSize(usize),
    #[error("Unsupported movement type {0}")]
    BadMovementType(u8),
    #[error("Loadout position {0} out of range")]
    BadLoadoutPosition(u8),
    #[error("Petal switch slot {0} out of range")]
    BadSwitchSlot(u8),
}

/// One slot change from a loadout packet. Positions are zero-based after
/// parsing: `0..MAX_SLOTS` is the primary row, the rest the secondary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadoutChange {
    pub pos: usize,
    pub id: PetalId,
    pub rarity: Rarity,
}

/// A validated client packet
#[derive(Debug, Clone, PartialEq)]
pub enum Serverbound {
    Input {
        /// Bits 0-3: up/left/down/right. Bits 4-5: petal extend/retract.
        flags: u8,
        mouse: Vec2,
    },
    Spawn,
    /// Zero-based primary slots to swap with their secondary entries
    PetalSwitch(SmallVec<[usize; petal::MAX_SLOTS]>),
    Cheat {
        cheat_type: u8,
    },
    Loadout(Vec<LoadoutChange>),
}

pub fn parse_serverbound(data: &[u8]) -> Result<Serverbound, ProtocolError> {
    let mut reader = Reader::new(data);
    match reader.read_u8()? {
        kind::UPDATE => {
            if data.len() != INPUT_PACKET_SIZE {
                return Err(ProtocolError::BadInputSize(data.len()));
            }
            let movement_type = reader.read_u8()?;
            if movement_type != 0 {
                return Err(ProtocolError::BadMovementType(movement_type));
            }
            let flags = reader.read_u8()?;
            let mouse = Vec2::new(reader.read_f32()?, reader.read_f32()?);
            Ok(Serverbound::Input { flags, mouse })
        }
        kind::SPAWN => Ok(Serverbound::Spawn),
        kind::PETAL_SWITCH => {
            let mut slots = SmallVec::new();
            loop {
                let raw = reader.read_u8()?;
                if raw == 0 {
                    return Ok(Serverbound::PetalSwitch(slots));
                }
                if raw as usize > petal::MAX_SLOTS {
                    return Err(ProtocolError::BadSwitchSlot(raw));
                }
                slots.push(raw as usize - 1);
            }
        }
        kind::CHEAT => Ok(Serverbound::Cheat {
            cheat_type: reader.read_u8()?,
        }),
        kind::LOADOUT => {
            let mut changes = Vec::new();
            loop {
                let raw = reader.read_u8()?;
                if raw == 0 {
                    return Ok(Serverbound::Loadout(changes));
                }
                if raw as usize > 2 * petal::MAX_SLOTS {
                    return Err(ProtocolError::BadLoadoutPosition(raw));
                }
                changes.push(LoadoutChange {
                    pos: raw as usize - 1,
                    id: PetalId::from_u8(reader.read_u8()?),
                    rarity: Rarity::from_u8(reader.read_u8()?),
                });
            }
        }
        other => Err(ProtocolError::UnknownKind(other)),
    }
}

/// Unit movement intent from input flag bits 0-3. Opposing bits cancel.
pub fn movement_direction(flags: u8) -> Vec2 {
    let mut dir = Vec2::ZERO;
    if flags & 1 != 0 {
        dir.y -= 1.0;
    }
    if flags & 2 != 0 {
        dir.x -= 1.0;
    }
    if flags & 4 != 0 {
        dir.y += 1.0;
    }
    if flags & 8 != 0 {
        dir.x += 1.0;
    }
    if dir.length_sq() == 0.0 {
        return Vec2::ZERO;
    }
    dir.normalize()
}

/// Encode the per-tick world state for one player: header, visible bodies
/// from the spatial hash around the camera, drop pickups credited this tick,
/// and the full loot table when it changed.
pub fn encode_state_update(sim: &mut Simulation, player: EntityId) -> Vec<u8> {
    let info = &sim.player_info[player.index()];
    let camera = info.camera;
    let flower = info.flower_id;

    let mut writer = Writer::new();
    writer.write_u8(kind::UPDATE);
    writer.write_varuint(sim.tick);
    writer.write_f32(camera.x);
    writer.write_f32(camera.y);
    writer.write_u16(flower.0);

    let mut visible: Vec<EntityId> = Vec::new();
    sim.spatial
        .query(camera, VIEW_HALF_EXTENT, VIEW_HALF_EXTENT, |entry| {
            visible.push(entry.entity);
        });
    visible.sort_unstable_by_key(|e| e.0);
    visible.dedup();

    writer.write_varuint(visible.len() as u64);
    for e in visible {
        write_entity(sim, &mut writer, e);
    }

    let info = &mut sim.player_info[player.index()];
    let notices = std::mem::take(&mut info.drops_this_tick);
    writer.write_varuint(notices.len() as u64);
    for notice in notices {
        writer.write_u8(notice.id as u8);
        writer.write_u8(notice.rarity as u8);
    }

    if info.loot_dirty {
        writer.write_u8(1);
        for per_id in &info.collected {
            for &count in per_id {
                writer.write_varuint(u64::from(count));
            }
        }
        info.loot_dirty = false;
    } else {
        writer.write_u8(0);
    }
    writer.into_vec()
}

fn write_entity(sim: &Simulation, writer: &mut Writer, e: EntityId) {
    let class = classify(&sim.store, e);
    let physical = sim.physical(e);
    writer.write_u16(e.0);
    writer.write_u8(class as u8);
    writer.write_f32(physical.position.x);
    writer.write_f32(physical.position.y);
    writer.write_f32(physical.angle);
    writer.write_f32(physical.radius);
    match class {
        CollisionClass::Mob => {
            let mob = &sim.mob[e.index()];
            writer.write_u8(mob.id as u8);
            writer.write_u8(mob.rarity as u8);
            writer.write_u8(health_ratio(sim, e));
        }
        CollisionClass::Petal => {
            let petal = &sim.petal[e.index()];
            writer.write_u8(petal.id as u8);
            writer.write_u8(petal.rarity as u8);
        }
        CollisionClass::Drop => {
            let drop = &sim.drop[e.index()];
            writer.write_u8(drop.id as u8);
            writer.write_u8(drop.rarity as u8);
        }
        CollisionClass::Flower => {
            writer.write_u8(health_ratio(sim, e));
        }
        CollisionClass::Arena | CollisionClass::Body => {}
    }
}

fn health_ratio(sim: &Simulation, e: EntityId) -> u8 {
    if !sim.store.has(e, ComponentKind::Health) {
        return 255;
    }
    let health = &sim.health[e.index()];
    if health.max_health <= 0.0 {
        return 0;
    }
    (health.health / health.max_health * 255.0).clamp(0.0, 255.0) as u8
}

/// Encode the squad roster: countdown, then for each of the four member
/// slots an in-use byte, a ready byte, and twenty (id, rarity) loadout pairs
/// covering the primary and secondary rows.
pub fn encode_squad_update(
    sim: &Simulation,
    countdown: u8,
    members: &[EntityId; squad::MEMBER_COUNT],
) -> Vec<u8> {
    let mut writer = Writer::new();
    writer.write_u8(kind::SQUAD_UPDATE);
    writer.write_u8(countdown);
    for &member in members {
        if !sim.store.has(member, ComponentKind::PlayerInfo) {
            writer.write_u8(0);
            writer.write_u8(0);
            for _ in 0..2 * petal::MAX_SLOTS {
                writer.write_u8(0);
                writer.write_u8(0);
            }
            continue;
        }
        let info = &sim.player_info[member.index()];
        writer.write_u8(1);
        writer.write_u8(u8::from(!info.flower_id.is_null()));
        for slot in &info.slots {
            writer.write_u8(slot.id as u8);
            writer.write_u8(slot.rarity as u8);
        }
        for entry in &info.secondary {
            writer.write_u8(entry.id as u8);
            writer.write_u8(entry.rarity as u8);
        }
    }
    writer.into_vec()
}

/// Byte length of a squad update: kind, countdown, four members of
/// (in_use, ready, 20 loadout pairs)
pub const SQUAD_UPDATE_SIZE: usize = 2 + squad::MEMBER_COUNT * (2 + 4 * petal::MAX_SLOTS);

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::game::data::{MobId, PETAL_ID_COUNT, RARITY_COUNT};

    fn input_packet(movement_type: u8, flags: u8, mouse: Vec2) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_u8(kind::UPDATE);
        w.write_u8(movement_type);
        w.write_u8(flags);
        w.write_f32(mouse.x);
        w.write_f32(mouse.y);
        w.into_vec()
    }

    #[test]
    fn test_parse_input_packet() {
        let data = input_packet(0, 0b0001_0101, Vec2::new(3.0, -4.0));
        assert_eq!(data.len(), INPUT_PACKET_SIZE);
        let parsed = parse_serverbound(&data).unwrap();
        assert_eq!(
            parsed,
            Serverbound::Input {
                flags: 0b0001_0101,
                mouse: Vec2::new(3.0, -4.0),
            }
        );
    }

    #[test]
    fn test_input_packet_size_is_strict() {
        let mut data = input_packet(0, 0, Vec2::ZERO);
        data.push(0xff);
        assert!(matches!(
            parse_serverbound(&data),
            Err(ProtocolError::BadInputSize(12))
        ));
    }

    #[test]
    fn test_input_rejects_unknown_movement_type() {
        let data = input_packet(1, 0, Vec2::ZERO);
        assert!(matches!(
            parse_serverbound(&data),
            Err(ProtocolError::BadMovementType(1))
        ));
    }

    #[test]
    fn test_parse_petal_switch() {
        let parsed = parse_serverbound(&[kind::PETAL_SWITCH, 2, 10, 1, 0]).unwrap();
        let Serverbound::PetalSwitch(slots) = parsed else {
            panic!("wrong variant");
        };
        assert_eq!(slots.as_slice(), &[1, 9, 0]);
    }

    #[test]
    fn test_petal_switch_rejects_out_of_range_slot() {
        assert!(matches!(
            parse_serverbound(&[kind::PETAL_SWITCH, 11, 0]),
            Err(ProtocolError::BadSwitchSlot(11))
        ));
    }

    #[test]
    fn test_parse_loadout() {
        let data = [kind::LOADOUT, 1, 1, 0, 12, 2, 3, 0];
        let parsed = parse_serverbound(&data).unwrap();
        let Serverbound::Loadout(changes) = parsed else {
            panic!("wrong variant");
        };
        assert_eq!(
            changes,
            vec![
                LoadoutChange {
                    pos: 0,
                    id: PetalId::Basic,
                    rarity: Rarity::Common,
                },
                LoadoutChange {
                    pos: 11,
                    id: PetalId::Light,
                    rarity: Rarity::Epic,
                },
            ]
        );
    }

    #[test]
    fn test_loadout_rejects_out_of_range_position() {
        assert!(matches!(
            parse_serverbound(&[kind::LOADOUT, 21, 1, 0, 0]),
            Err(ProtocolError::BadLoadoutPosition(21))
        ));
    }

    #[test]
    fn test_truncated_loadout_errors() {
        assert!(parse_serverbound(&[kind::LOADOUT, 1, 1]).is_err());
    }

    #[test]
    fn test_unknown_kind_errors() {
        assert!(matches!(
            parse_serverbound(&[200]),
            Err(ProtocolError::UnknownKind(200))
        ));
    }

    #[test]
    fn test_movement_direction_cardinal_and_diagonal() {
        assert!(movement_direction(0b0001).approx_eq(Vec2::new(0.0, -1.0), 1e-6));
        assert!(movement_direction(0b1000).approx_eq(Vec2::new(1.0, 0.0), 1e-6));
        let diagonal = movement_direction(0b1001);
        assert!((diagonal.length() - 1.0).abs() < 1e-6);
        assert!(diagonal.x > 0.0 && diagonal.y < 0.0);
    }

    #[test]
    fn test_movement_direction_opposing_bits_cancel() {
        assert_eq!(movement_direction(0), Vec2::ZERO);
        assert_eq!(movement_direction(0b0101), Vec2::ZERO);
        assert_eq!(movement_direction(0b1111), Vec2::ZERO);
    }

    #[test]
    fn test_state_update_header_and_visible_flower() {
        let mut sim = Simulation::with_rng(StdRng::seed_from_u64(3));
        let player = sim.spawn_player_info(0, 0);
        let flower = sim.spawn_flower(player);
        let camera = sim.player_info[player.index()].camera;
        sim.spawn_mob(MobId::BabyAnt, Rarity::Rare, camera + Vec2::new(80.0, 0.0), 0, false);
        // populate the spatial hash
        sim.tick();

        let data = encode_state_update(&mut sim, player);
        let mut r = Reader::new(&data);
        assert_eq!(r.read_u8().unwrap(), kind::UPDATE);
        assert_eq!(r.read_varuint().unwrap(), sim.tick);
        r.read_f32().unwrap();
        r.read_f32().unwrap();
        assert_eq!(r.read_u16().unwrap(), flower.0);
        let count = r.read_varuint().unwrap();
        assert!(count >= 2, "flower and mob should both be in view");

        let mut saw_flower = false;
        let mut saw_mob = false;
        for _ in 0..count {
            let id = r.read_u16().unwrap();
            let class = r.read_u8().unwrap();
            r.read_f32().unwrap();
            r.read_f32().unwrap();
            r.read_f32().unwrap();
            r.read_f32().unwrap();
            if class == CollisionClass::Flower as u8 {
                saw_flower |= id == flower.0;
                assert_eq!(r.read_u8().unwrap(), 255);
            } else if class == CollisionClass::Mob as u8 {
                saw_mob = true;
                assert_eq!(r.read_u8().unwrap(), MobId::BabyAnt as u8);
                assert_eq!(r.read_u8().unwrap(), Rarity::Rare as u8);
                r.read_u8().unwrap();
            } else if class == CollisionClass::Petal as u8 || class == CollisionClass::Drop as u8 {
                r.read_u8().unwrap();
                r.read_u8().unwrap();
            }
        }
        assert!(saw_flower);
        assert!(saw_mob);
    }

    #[test]
    fn test_state_update_flushes_loot_once() {
        let mut sim = Simulation::with_rng(StdRng::seed_from_u64(4));
        let player = sim.spawn_player_info(0, 0);
        {
            let info = &mut sim.player_info[player.index()];
            info.collected[PetalId::Basic as usize][Rarity::Common as usize] = 3;
            info.loot_dirty = true;
        }

        let first = encode_state_update(&mut sim, player);
        let second = encode_state_update(&mut sim, player);
        // dirty flag byte sits right after the empty entity and notice lists
        assert!(first.len() > second.len());
        assert!(!sim.player_info[player.index()].loot_dirty);

        let mut r = Reader::new(&second);
        r.read_u8().unwrap();
        r.read_varuint().unwrap();
        r.read_f32().unwrap();
        r.read_f32().unwrap();
        r.read_u16().unwrap();
        assert_eq!(r.read_varuint().unwrap(), 0);
        assert_eq!(r.read_varuint().unwrap(), 0);
        assert_eq!(r.read_u8().unwrap(), 0);
        assert_eq!(r.remaining(), 0);

        // the dirty encoding carries the full table, one varuint per cell
        assert_eq!(first.len(), second.len() + PETAL_ID_COUNT * RARITY_COUNT);
    }

    #[test]
    fn test_state_update_drains_drop_notices() {
        let mut sim = Simulation::with_rng(StdRng::seed_from_u64(5));
        let player = sim.spawn_player_info(0, 0);
        sim.player_info[player.index()]
            .drops_this_tick
            .push(crate::game::components::DropNotice {
                id: PetalId::Faster,
                rarity: Rarity::Unusual,
            });

        let data = encode_state_update(&mut sim, player);
        assert!(sim.player_info[player.index()].drops_this_tick.is_empty());

        let mut r = Reader::new(&data);
        r.read_u8().unwrap();
        r.read_varuint().unwrap();
        r.read_f32().unwrap();
        r.read_f32().unwrap();
        r.read_u16().unwrap();
        assert_eq!(r.read_varuint().unwrap(), 0);
        assert_eq!(r.read_varuint().unwrap(), 1);
        assert_eq!(r.read_u8().unwrap(), PetalId::Faster as u8);
        assert_eq!(r.read_u8().unwrap(), Rarity::Unusual as u8);
    }

    #[test]
    fn test_squad_update_layout() {
        let mut sim = Simulation::with_rng(StdRng::seed_from_u64(6));
        let p0 = sim.spawn_player_info(0, 0);
        sim.spawn_flower(p0);
        sim.player_info[p0.index()].slots[0].id = PetalId::Basic;
        sim.player_info[p0.index()].slots[0].rarity = Rarity::Rare;

        let members = [
            p0,
            crate::game::entity::NULL_ENTITY,
            crate::game::entity::NULL_ENTITY,
            crate::game::entity::NULL_ENTITY,
        ];
        let data = encode_squad_update(&sim, 12, &members);
        assert_eq!(data.len(), SQUAD_UPDATE_SIZE);

        let mut r = Reader::new(&data);
        assert_eq!(r.read_u8().unwrap(), kind::SQUAD_UPDATE);
        assert_eq!(r.read_u8().unwrap(), 12);
        // first member: in use, ready, loadout starts with the bound slot
        assert_eq!(r.read_u8().unwrap(), 1);
        assert_eq!(r.read_u8().unwrap(), 1);
        assert_eq!(r.read_u8().unwrap(), PetalId::Basic as u8);
        assert_eq!(r.read_u8().unwrap(), Rarity::Rare as u8);
    }
}
