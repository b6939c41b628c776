//! Drop lifecycle: despawn countdown and pickup crediting.
//!
//! A drop can be credited once per squad member. Crediting never clears a
//! bit, so a player cannot double-collect, and each player is capped at 8
//! pickups per tick. The drop body stays in the world until its countdown
//! runs out even when everyone eligible has collected it.

use tracing::debug;

use crate::game::components::{Drop, DropNotice};
use crate::game::constants::drops::{PICKUPS_PER_TICK, PICKUP_DELAY};
use crate::game::data::RARITY_NAMES;
use crate::game::entity::{ComponentKind, EntityId};
use crate::game::simulation::Simulation;

pub fn tick(sim: &mut Simulation) {
    let flowers = sim.store.entities_with(ComponentKind::Flower);
    for e in sim.store.entities_with(ComponentKind::Drop) {
        let drop = &mut sim.drop[e.index()];
        if drop.ticks_until_despawn == 0 {
            sim.store.request_deletion(e);
            continue;
        }
        drop.ticks_until_despawn -= 1;
        // fresh drops cannot be scooped up before they are even visible
        if drop.ticks_until_despawn > Drop::lifetime(drop.rarity) - PICKUP_DELAY {
            continue;
        }
        for &flower in &flowers {
            try_pick_up(sim, e, flower);
        }
    }
}

fn try_pick_up(sim: &mut Simulation, drop_id: EntityId, flower: EntityId) {
    let owner = sim.relations[flower.index()].owner;
    if !sim.store.exists(owner) || !sim.store.has(owner, ComponentKind::PlayerInfo) {
        return;
    }
    let info = &sim.player_info[owner.index()];
    let squad = info.squad as usize;
    let member_bit = info.pickup_bit();

    let drop = &sim.drop[drop_id.index()];
    if !drop.can_be_picked_up_by[squad] {
        return;
    }
    if drop.picked_up_by[member_bit] {
        return;
    }
    let delta = sim.physical[drop_id.index()].position - sim.physical[flower.index()].position;
    let reach = sim.physical[drop_id.index()].radius + info.modifiers.drop_pickup_radius;
    if delta.length() > reach {
        return;
    }
    if info.drops_this_tick.len() >= PICKUPS_PER_TICK {
        return;
    }

    let (id, rarity) = {
        let drop = &mut sim.drop[drop_id.index()];
        drop.picked_up_by.set(member_bit, true);
        (drop.id, drop.rarity)
    };
    let info = &mut sim.player_info[owner.index()];
    info.collected[id as usize][rarity as usize] += 1;
    info.loot_dirty = true;
    info.drops_this_tick.push(DropNotice { id, rarity });
    debug!(
        "player {} picked up {} {:?}",
        owner.0,
        RARITY_NAMES[rarity as usize],
        id
    );
}
