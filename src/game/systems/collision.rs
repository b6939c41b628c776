//! Broad + narrow phase collision detection.
//!
//! Rebuilds the spatial hash from live bodies, filters candidate pairs
//! through the circle test and the static exclusion tables, and records the
//! survivors both as this tick's contact pairs and in each body's bounded
//! contact list.

use tracing::warn;

use crate::game::constants::collision::MAX_CONTACTS;
use crate::game::entity::{ComponentKind, EntityId, EntityStore};
use crate::game::simulation::Simulation;

/// Coarse class used to index the pairwise exclusion tables. Entities carry
/// at most one of these marker components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum CollisionClass {
    Drop = 0,
    Petal,
    Flower,
    Mob,
    Arena,
    Body,
}

pub const CLASS_COUNT: usize = 6;

pub fn classify(store: &EntityStore, e: EntityId) -> CollisionClass {
    if store.has(e, ComponentKind::Drop) {
        CollisionClass::Drop
    } else if store.has(e, ComponentKind::Petal) {
        CollisionClass::Petal
    } else if store.has(e, ComponentKind::Flower) {
        CollisionClass::Flower
    } else if store.has(e, ComponentKind::Mob) {
        CollisionClass::Mob
    } else if store.has(e, ComponentKind::Arena) {
        CollisionClass::Arena
    } else {
        CollisionClass::Body
    }
}

pub const fn exclusion_table(
    pairs: &[(CollisionClass, CollisionClass)],
) -> [[bool; CLASS_COUNT]; CLASS_COUNT] {
    let mut table = [[false; CLASS_COUNT]; CLASS_COUNT];
    let mut i = 0;
    while i < pairs.len() {
        let a = pairs[i].0 as usize;
        let b = pairs[i].1 as usize;
        table[a][b] = true;
        table[b][a] = true;
        i += 1;
    }
    table
}

/// Pairs that never touch, regardless of team
static EXCLUDE_ANY_TEAM: [[bool; CLASS_COUNT]; CLASS_COUNT] = exclusion_table(&[
    (CollisionClass::Drop, CollisionClass::Drop),
    (CollisionClass::Drop, CollisionClass::Mob),
]);

/// Pairs additionally excluded between same-team entities
static EXCLUDE_SAME_TEAM: [[bool; CLASS_COUNT]; CLASS_COUNT] = exclusion_table(&[
    (CollisionClass::Petal, CollisionClass::Petal),
    (CollisionClass::Petal, CollisionClass::Flower),
    (CollisionClass::Petal, CollisionClass::Mob),
    (CollisionClass::Flower, CollisionClass::Mob),
]);

pub fn tick(sim: &mut Simulation) {
    sim.spatial.reset();
    let entities = sim.store.entities_with(ComponentKind::Physical);
    for &e in &entities {
        sim.physical[e.index()].colliding_with.clear();
    }
    for &e in &entities {
        // dead bodies stay out of the grid until the deletion flush
        if sim.store.has(e, ComponentKind::Health) && sim.health[e.index()].health <= 0.0 {
            continue;
        }
        let physical = &sim.physical[e.index()];
        sim.spatial.insert(e, physical.position, physical.radius);
    }

    sim.contacts.clear();
    let Simulation {
        spatial,
        store,
        relations,
        mob,
        contacts,
        ..
    } = sim;
    spatial.find_possible_collisions(|a, b| {
        let delta = a.position - b.position;
        let radius_sum = a.radius + b.radius;
        if delta.length_sq() >= radius_sum * radius_sum {
            return;
        }

        let ca = classify(store, a.entity);
        let cb = classify(store, b.entity);
        if EXCLUDE_ANY_TEAM[ca as usize][cb as usize] {
            return;
        }
        if relations[a.entity.index()].team == relations[b.entity.index()].team
            && EXCLUDE_SAME_TEAM[ca as usize][cb as usize]
        {
            // a player-spawned mob stays touchable by its own team's
            // flower so the flower can push it around
            let flower_mob = matches!(
                (ca, cb),
                (CollisionClass::Flower, CollisionClass::Mob)
                    | (CollisionClass::Mob, CollisionClass::Flower)
            );
            if !flower_mob {
                return;
            }
            let the_mob = if ca == CollisionClass::Mob { a.entity } else { b.entity };
            if !mob[the_mob.index()].player_spawned {
                return;
            }
        }
        contacts.push((a.entity, b.entity));
    });

    // record contacts on both bodies; a full list drops the pair entirely
    let mut i = 0;
    while i < sim.contacts.len() {
        let (a, b) = sim.contacts[i];
        if sim.physical[a.index()].colliding_with.len() >= MAX_CONTACTS
            || sim.physical[b.index()].colliding_with.len() >= MAX_CONTACTS
        {
            warn!(a = a.0, b = b.0, "contact list full, pair dropped");
            sim.contacts.swap_remove(i);
            continue;
        }
        sim.physical[a.index()].colliding_with.push(b);
        sim.physical[b.index()].colliding_with.push(a);
        i += 1;
    }
}
