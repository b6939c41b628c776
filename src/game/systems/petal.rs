//! Petal lifecycle: the reload pass respawns destroyed petals from loadout
//! slots, the movement pass steers live petals toward their orbit targets.
//!
//! Rotation positions are handed out anew every reload pass so the ring
//! re-spaces itself whenever petals are added or destroyed. Slots whose kind
//! clumps (nonzero clump radius) share one ring position and spread their
//! members on a faster secondary orbit.

use std::f32::consts::TAU;

use crate::game::constants::petal::{
    CHASE_STIFFNESS, CLUMP_ANGLE_RATE, FRICTION, HOLD_RADIUS, HOLD_RADIUS_EXTENDED,
    HOLD_RADIUS_RETRACTED, MAX_CLUMP, MAX_SLOTS, RADIUS, ROTATION_INCREMENT,
};
use crate::game::constants::team;
use crate::game::data::{self, PetalId, Rarity};
use crate::game::entity::{ComponentKind, EntityId};
use crate::game::simulation::Simulation;
use crate::util::vec2::Vec2;

pub fn tick(sim: &mut Simulation) {
    for player in sim.store.entities_with(ComponentKind::PlayerInfo) {
        reload(sim, player);
    }
    for petal in sim.store.entities_with(ComponentKind::Petal) {
        steer(sim, petal);
    }
}

struct SpawnRequest {
    outer: usize,
    inner: usize,
    rotation_pos: u32,
    id: PetalId,
    rarity: Rarity,
}

/// Walk the loadout, ticking cooldowns and respawning missing petals
fn reload(sim: &mut Simulation, player: EntityId) {
    if sim.player_info[player.index()].flower_id.is_null() {
        return;
    }

    let mut spawns: Vec<SpawnRequest> = Vec::new();
    let mut rotation_pos = 0u32;
    {
        let info = &mut sim.player_info[player.index()];
        for outer in 0..MAX_SLOTS {
            let slot = &mut info.slots[outer];
            let stats = data::petal_data(slot.id);
            let count = (stats.count[slot.rarity as usize] as usize).min(MAX_CLUMP);
            for inner in 0..count {
                if inner == 0 || stats.clump_radius == 0.0 {
                    rotation_pos += 1;
                }
                let bound = &mut slot.petals[inner];
                if bound.entity.is_null() {
                    bound.cooldown_ticks -= 1;
                    if bound.cooldown_ticks <= 0 {
                        spawns.push(SpawnRequest {
                            outer,
                            inner,
                            rotation_pos,
                            id: slot.id,
                            rarity: slot.rarity,
                        });
                    }
                }
            }
        }
        info.rotation_count = rotation_pos;
        info.global_rotation += ROTATION_INCREMENT;
    }

    for request in spawns {
        spawn_petal(sim, player, request);
    }
}

fn spawn_petal(sim: &mut Simulation, player: EntityId, request: SpawnRequest) {
    let e = sim.store.alloc();
    if e.is_null() {
        return;
    }
    let camera = sim.player_info[player.index()].camera;
    let base_arena = sim.base_arena;
    let stats = data::petal_data(request.id);

    let physical = sim.add_physical(e);
    physical.position = camera;
    physical.radius = RADIUS;
    physical.friction = FRICTION;
    physical.arena = base_arena;
    let relations = sim.add_relations(e);
    relations.owner = player;
    relations.root_owner = player;
    relations.team = team::PLAYERS;
    let health = sim.add_health(e);
    health.max_health = stats.health;
    health.health = stats.health;
    health.damage = stats.damage;
    let petal = sim.add_petal(e);
    petal.id = request.id;
    petal.rarity = request.rarity;
    petal.outer_pos = request.outer;
    petal.inner_pos = request.inner;
    petal.rotation_pos = request.rotation_pos;

    sim.player_info[player.index()].slots[request.outer].petals[request.inner].entity = e;
}

/// Aim a live petal at its orbit target; orphans are deleted instead
fn steer(sim: &mut Simulation, e: EntityId) {
    let idx = e.index();
    let owner = sim.relations[idx].owner;
    if !sim.store.exists(owner) || !sim.store.has(owner, ComponentKind::PlayerInfo) {
        sim.store.request_deletion(e);
        return;
    }
    let flower = sim.player_info[owner.index()].flower_id;
    if flower.is_null() {
        sim.store.request_deletion(e);
        return;
    }
    if sim.petal[idx].detached {
        return;
    }

    let info = &sim.player_info[owner.index()];
    let hold_radius = if info.input & 1 != 0 {
        HOLD_RADIUS_EXTENDED
    } else if info.input & 2 != 0 {
        HOLD_RADIUS_RETRACTED
    } else {
        HOLD_RADIUS
    };
    let rotation_count = info.rotation_count.max(1);
    let petal = &sim.petal[idx];
    let angle = info.global_rotation + petal.rotation_pos as f32 * TAU / rotation_count as f32;

    let flower_position = sim.physical[flower.index()].position;
    let mut chase =
        flower_position + Vec2::from_polar(hold_radius, angle) - sim.physical[idx].position;

    let stats = data::petal_data(petal.id);
    if stats.clump_radius != 0.0 {
        let members = stats.count[petal.rarity as usize].max(1);
        chase += Vec2::from_polar(
            stats.clump_radius,
            CLUMP_ANGLE_RATE * angle + TAU * petal.inner_pos as f32 / members as f32,
        );
    }
    sim.physical[idx].acceleration = chase * CHASE_STIFFNESS;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_sim() -> Simulation {
        Simulation::with_rng(StdRng::seed_from_u64(9))
    }

    fn player_with_flower(sim: &mut Simulation) -> (EntityId, EntityId) {
        let player = sim.spawn_player_info(0, 0);
        let flower = sim.spawn_flower(player);
        (player, flower)
    }

    fn live_petals(sim: &Simulation) -> Vec<EntityId> {
        sim.store.entities_with(ComponentKind::Petal)
    }

    #[test]
    fn test_reload_spawns_petals_for_bound_slots() {
        let mut sim = test_sim();
        let (player, _) = player_with_flower(&mut sim);
        sim.set_loadout_slot(player, 0, PetalId::Basic, Rarity::Common);
        sim.set_loadout_slot(player, 1, PetalId::Light, Rarity::Unusual);

        tick(&mut sim);

        // basic spawns 1 petal, unusual light spawns 2
        assert_eq!(live_petals(&sim).len(), 3);
        let info = &sim.player_info[player.index()];
        assert_eq!(info.rotation_count, 3);
        assert!(info.global_rotation > 0.0);
        for e in live_petals(&sim) {
            let physical = sim.physical(e);
            assert_eq!(physical.radius, RADIUS);
            assert_eq!(physical.friction, FRICTION);
            assert_eq!(sim.relations(e).owner, player);
        }
    }

    #[test]
    fn test_clump_slot_shares_one_rotation_position() {
        let mut sim = test_sim();
        let (player, _) = player_with_flower(&mut sim);
        // epic faster clumps 6 petals on a single ring position
        sim.set_loadout_slot(player, 0, PetalId::Faster, Rarity::Epic);
        sim.set_loadout_slot(player, 1, PetalId::Basic, Rarity::Common);

        tick(&mut sim);

        assert_eq!(live_petals(&sim).len(), 7);
        assert_eq!(sim.player_info[player.index()].rotation_count, 2);
        let faster: Vec<_> = live_petals(&sim)
            .into_iter()
            .filter(|&e| sim.petal[e.index()].id == PetalId::Faster)
            .collect();
        assert!(faster.iter().all(|&e| sim.petal[e.index()].rotation_pos == 1));
    }

    #[test]
    fn test_no_flower_means_no_reload() {
        let mut sim = test_sim();
        let player = sim.spawn_player_info(0, 0);
        sim.set_loadout_slot(player, 0, PetalId::Basic, Rarity::Common);

        tick(&mut sim);
        assert!(live_petals(&sim).is_empty());
    }

    #[test]
    fn test_destroyed_petal_waits_out_cooldown() {
        let mut sim = test_sim();
        let (player, _) = player_with_flower(&mut sim);
        sim.set_loadout_slot(player, 0, PetalId::Basic, Rarity::Common);
        tick(&mut sim);
        let petal = live_petals(&sim)[0];

        sim.store.request_deletion(petal);
        sim.flush_deletions();
        let cooldown = data::petal_data(PetalId::Basic).cooldown;
        assert_eq!(
            sim.player_info[player.index()].slots[0].petals[0].cooldown_ticks,
            cooldown as i32
        );

        // one tick short of the cooldown: still empty
        for _ in 0..cooldown - 1 {
            tick(&mut sim);
        }
        assert!(live_petals(&sim).is_empty());
        tick(&mut sim);
        assert_eq!(live_petals(&sim).len(), 1);
    }

    #[test]
    fn test_orphaned_petal_is_deleted() {
        let mut sim = test_sim();
        let (player, flower) = player_with_flower(&mut sim);
        sim.set_loadout_slot(player, 0, PetalId::Basic, Rarity::Common);
        tick(&mut sim);
        assert_eq!(live_petals(&sim).len(), 1);

        sim.store.request_deletion(flower);
        sim.flush_deletions();
        tick(&mut sim);
        sim.flush_deletions();
        assert!(live_petals(&sim).is_empty());
    }

    #[test]
    fn test_petal_accelerates_toward_orbit_target() {
        let mut sim = test_sim();
        let (player, flower) = player_with_flower(&mut sim);
        sim.physical_mut(flower).position = Vec2::ZERO;
        sim.player_info[player.index()].camera = Vec2::ZERO;
        sim.set_loadout_slot(player, 0, PetalId::Basic, Rarity::Common);
        tick(&mut sim);
        let petal = live_petals(&sim)[0];

        tick(&mut sim);

        // spawned at the flower, so the pull is straight out to the ring
        let accel = sim.physical(petal).acceleration;
        assert!((accel.length() - CHASE_STIFFNESS * HOLD_RADIUS).abs() < 1.0);
    }

    #[test]
    fn test_input_changes_holding_radius() {
        let mut sim = test_sim();
        let (player, flower) = player_with_flower(&mut sim);
        sim.physical_mut(flower).position = Vec2::ZERO;
        sim.player_info[player.index()].camera = Vec2::ZERO;
        sim.set_loadout_slot(player, 0, PetalId::Basic, Rarity::Common);
        tick(&mut sim);
        let petal = live_petals(&sim)[0];

        sim.player_info[player.index()].input = 1;
        tick(&mut sim);
        let extended = sim.physical(petal).acceleration.length();

        sim.physical_mut(petal).position = Vec2::ZERO;
        sim.player_info[player.index()].input = 2;
        tick(&mut sim);
        let retracted = sim.physical(petal).acceleration.length();

        assert!(extended > retracted);
    }
}
