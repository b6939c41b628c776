//! Contact resolution: positional correction, knockback, and the special
//! cases (arena entry, web slowdown, infinite-mass bodies).

use rand::Rng;

use crate::game::constants::collision::{KNOCKBACK, PUSHABLE_MOB_MASS_RATIO};
use crate::game::entity::{ComponentKind, EntityId};
use crate::game::simulation::Simulation;
use crate::game::systems::collision::{classify, exclusion_table, CollisionClass, CLASS_COUNT};
use crate::util::vec2::Vec2;

/// Pairs that register contact but are never pushed apart
static NEVER_PUSH: [[bool; CLASS_COUNT]; CLASS_COUNT] = exclusion_table(&[
    (CollisionClass::Drop, CollisionClass::Petal),
    (CollisionClass::Drop, CollisionClass::Flower),
    (CollisionClass::Arena, CollisionClass::Petal),
    (CollisionClass::Arena, CollisionClass::Mob),
]);

pub fn tick(sim: &mut Simulation) {
    for e in sim.store.entities_with(ComponentKind::Physical) {
        sim.physical[e.index()].collision_velocity = Vec2::ZERO;
    }
    let contacts = std::mem::take(&mut sim.contacts);
    for &(a, b) in &contacts {
        resolve_pair(sim, a, b);
    }
    sim.contacts = contacts;
}

fn resolve_pair(sim: &mut Simulation, a: EntityId, b: EntityId) {
    let ca = classify(&sim.store, a);
    let cb = classify(&sim.store, b);
    if NEVER_PUSH[ca as usize][cb as usize] {
        return;
    }

    if ca == CollisionClass::Arena && cb == CollisionClass::Flower {
        return enter_arena(sim, a, b);
    }
    if cb == CollisionClass::Arena && ca == CollisionClass::Flower {
        return enter_arena(sim, b, a);
    }
    if sim.store.has(a, ComponentKind::Web) {
        return web_logic(sim, a, b);
    }
    if sim.store.has(b, ComponentKind::Web) {
        return web_logic(sim, b, a);
    }

    let delta = sim.physical[b.index()].position - sim.physical[a.index()].position;
    let distance = delta.length();
    if distance == 0.0 {
        return;
    }

    let same_team = sim.relations[a.index()].team == sim.relations[b.index()].team;
    let mut mass_a = sim.physical[a.index()].mass;
    let mut mass_b = sim.physical[b.index()].mass;

    // a flower can shove its own player-spawned mob aside without being
    // pushed back; the mob's apparent mass scales with its rarity
    let pushable_b = ca == CollisionClass::Flower && cb == CollisionClass::Mob && same_team;
    let pushable_a = cb == CollisionClass::Flower && ca == CollisionClass::Mob && same_team;
    let inf_a = sim.store.has(a, ComponentKind::Nest)
        || (pushable_b && sim.mob[b.index()].player_spawned);
    let inf_b = sim.store.has(b, ComponentKind::Nest)
        || (pushable_a && sim.mob[a.index()].player_spawned);
    if pushable_b {
        mass_b = mass_a * PUSHABLE_MOB_MASS_RATIO * (sim.mob[b.index()].rarity as u8 as f32 + 1.0);
    }
    if pushable_a {
        mass_a = mass_b * PUSHABLE_MOB_MASS_RATIO * (sim.mob[a.index()].rarity as u8 as f32 + 1.0);
    }

    let (v1_coeff, v2_coeff) = match (inf_a, inf_b) {
        (true, true) => (0.5, 0.5),
        (true, false) => (0.0, 1.0),
        (false, true) => (1.0, 0.0),
        (false, false) => (mass_b / (mass_a + mass_b), mass_a / (mass_a + mass_b)),
    };

    let axis = delta * (1.0 / distance);
    let (pa, pb) = sim.physical_pair_mut(a, b);
    let overlap = distance - pa.radius - pb.radius;

    pa.collision_velocity += axis * (overlap * v1_coeff);
    pb.collision_velocity -= axis * (overlap * v2_coeff);

    // knockback scale is the scale of whoever deals the hit
    pa.acceleration -= axis * (v1_coeff * KNOCKBACK * pb.knockback_scale);
    pb.acceleration -= axis * ((v1_coeff - 1.0) * KNOCKBACK * pa.knockback_scale);
}

/// Teleport a flower touching an arena body into its respawn zone
fn enter_arena(sim: &mut Simulation, arena: EntityId, flower: EntityId) {
    let zone = sim.arena[arena.index()].respawn_zone;
    let rx: f32 = sim.rng.gen();
    let ry: f32 = sim.rng.gen();
    let physical = &mut sim.physical[flower.index()];
    physical.arena = arena;
    physical.position = Vec2::new(
        zone.x + 2.0 * zone.grid_size * rx,
        zone.y + 2.0 * zone.grid_size * ry,
    );
    physical.velocity = Vec2::ZERO;
    physical.collision_velocity = Vec2::ZERO;

    let root = sim.relations[flower.index()].root_owner;
    if sim.store.has(root, ComponentKind::PlayerInfo) {
        let squad = sim.player_info[root.index()].squad;
        let arena = &mut sim.arena[arena.index()];
        arena.first_squad_to_enter = squad;
        arena.player_entered = true;
    }
}

/// Webs slow enemy mobs and flowers instead of pushing them
fn web_logic(sim: &mut Simulation, web: EntityId, victim: EntityId) {
    if sim.relations[web.index()].team == sim.relations[victim.index()].team {
        return;
    }
    let is_flower = sim.store.has(victim, ComponentKind::Flower);
    if !is_flower && !sim.store.has(victim, ComponentKind::Mob) {
        return;
    }
    let mut slow = sim.web[web.index()].slow_factor;
    if is_flower {
        slow = 0.2 + 0.8 * slow;
    }
    sim.physical[victim.index()].web_slowdown *= slow;
}
