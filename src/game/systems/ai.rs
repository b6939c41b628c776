//! Mob AI: a small per-entity state machine driven by countdowns.
//!
//! States: idle (stand still), idle_moving (wander along a random heading),
//! spin2team (spin in place after losing a target), attacking (chase).
//! Aggressive mobs scan for the nearest enemy whenever they are not already
//! attacking.

use rand::Rng;

use crate::game::components::{AiAggroType, AiState, AiType};
use crate::game::constants::ai::{
    CHASE_ACCELERATION, DETECTION_RANGE, HORNET_STANDOFF, IDLE_TICKS_MAX, IDLE_TICKS_MIN,
    SPIN2TEAM_TICKS, SPIN_INCREMENT, WANDER_ACCELERATION, WANDER_TICKS_MAX, WANDER_TICKS_MIN,
};
use crate::game::entity::{ComponentKind, EntityId, NULL_ENTITY};
use crate::game::simulation::Simulation;
use crate::util::vec2::Vec2;

pub fn tick(sim: &mut Simulation) {
    for e in sim.store.entities_with(ComponentKind::Ai) {
        step(sim, e);
    }
}

fn step(sim: &mut Simulation, e: EntityId) {
    let idx = e.index();

    if sim.ai[idx].ai_type == AiType::Aggressive && sim.ai[idx].ai_state != AiState::Attacking {
        let target = sim.find_nearest_enemy(e, DETECTION_RANGE);
        if !target.is_null() {
            let ai = &mut sim.ai[idx];
            ai.ai_state = AiState::Attacking;
            ai.target_entity = target;
        }
    }

    match sim.ai[idx].ai_state {
        AiState::Idle => {}
        AiState::IdleMoving => {
            let physical = &mut sim.physical[idx];
            let heading = physical.angle;
            physical.acceleration += Vec2::from_polar(WANDER_ACCELERATION, heading);
        }
        AiState::Spin2Team => {
            sim.physical[idx].angle += SPIN_INCREMENT;
        }
        AiState::Attacking => {
            // refreshed every tick so the post-attack pause starts full
            sim.ai[idx].ticks_until_next_action =
                sim.rng.gen_range(IDLE_TICKS_MIN..=IDLE_TICKS_MAX);
            let target = sim.ai[idx].target_entity;
            if !sim.store.exists(target) {
                let ai = &mut sim.ai[idx];
                ai.ai_state = AiState::Spin2Team;
                ai.target_entity = NULL_ENTITY;
                ai.ticks_until_next_action = SPIN2TEAM_TICKS;
            } else {
                let delta = sim.physical[target.index()].position - sim.physical[idx].position;
                sim.physical[idx].angle = delta.angle();
                let standoff = sim.ai[idx].aggro_type == AiAggroType::Hornet
                    && delta.length_sq() <= HORNET_STANDOFF * HORNET_STANDOFF;
                if !standoff {
                    sim.physical[idx].acceleration += delta.with_magnitude(CHASE_ACCELERATION);
                }
            }
        }
    }

    let ai = &mut sim.ai[idx];
    if ai.ticks_until_next_action == 0 {
        match ai.ai_state {
            AiState::IdleMoving => {
                ai.ai_state = AiState::Idle;
                ai.ticks_until_next_action = sim.rng.gen_range(IDLE_TICKS_MIN..=IDLE_TICKS_MAX);
            }
            AiState::Idle => {
                ai.ai_state = AiState::IdleMoving;
                ai.ticks_until_next_action =
                    sim.rng.gen_range(WANDER_TICKS_MIN..=WANDER_TICKS_MAX);
                sim.physical[idx].angle = sim.rng.gen::<f32>() * std::f32::consts::TAU;
            }
            AiState::Spin2Team => {
                ai.ai_state = AiState::Idle;
                ai.ticks_until_next_action = sim.rng.gen_range(IDLE_TICKS_MIN..=IDLE_TICKS_MAX);
            }
            AiState::Attacking => {}
        }
    }
    sim.ai[idx].ticks_until_next_action = sim.ai[idx].ticks_until_next_action.saturating_sub(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::game::constants::team;
    use crate::game::data::{MobId, Rarity};

    fn test_sim() -> Simulation {
        Simulation::with_rng(StdRng::seed_from_u64(5))
    }

    fn aggressive_mob(sim: &mut Simulation, pos: Vec2) -> EntityId {
        let mob = sim.spawn_mob(MobId::BabyAnt, Rarity::Common, pos, team::MOBS, false);
        sim.ai[mob.index()].ai_type = AiType::Aggressive;
        mob
    }

    #[test]
    fn test_aggressive_mob_acquires_nearby_flower() {
        let mut sim = test_sim();
        let player = sim.spawn_player_info(0, 0);
        let flower = sim.spawn_flower(player);
        sim.physical_mut(flower).position = Vec2::new(200.0, 0.0);
        let mob = aggressive_mob(&mut sim, Vec2::ZERO);

        tick(&mut sim);

        let ai = &sim.ai[mob.index()];
        assert_eq!(ai.ai_state, AiState::Attacking);
        assert_eq!(ai.target_entity, flower);
        assert!(sim.physical(mob).acceleration.x > 0.0);
    }

    #[test]
    fn test_out_of_range_flower_is_ignored() {
        let mut sim = test_sim();
        let player = sim.spawn_player_info(0, 0);
        let flower = sim.spawn_flower(player);
        sim.physical_mut(flower).position = Vec2::new(DETECTION_RANGE + 100.0, 0.0);
        let mob = aggressive_mob(&mut sim, Vec2::ZERO);

        tick(&mut sim);
        assert_ne!(sim.ai[mob.index()].ai_state, AiState::Attacking);
    }

    #[test]
    fn test_hornet_holds_standoff_distance() {
        let mut sim = test_sim();
        let player = sim.spawn_player_info(0, 0);
        let flower = sim.spawn_flower(player);
        sim.physical_mut(flower).position = Vec2::new(300.0, 0.0);
        let mob = aggressive_mob(&mut sim, Vec2::ZERO);
        sim.ai[mob.index()].aggro_type = AiAggroType::Hornet;

        tick(&mut sim);

        let physical = sim.physical(mob);
        assert_eq!(sim.ai[mob.index()].ai_state, AiState::Attacking);
        // aims at the target but does not close in
        assert!(physical.acceleration == Vec2::ZERO);
        assert!((physical.angle - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_lost_target_falls_back_to_spin2team() {
        let mut sim = test_sim();
        let player = sim.spawn_player_info(0, 0);
        let flower = sim.spawn_flower(player);
        sim.physical_mut(flower).position = Vec2::new(200.0, 0.0);
        let mob = aggressive_mob(&mut sim, Vec2::ZERO);

        tick(&mut sim);
        assert_eq!(sim.ai[mob.index()].ai_state, AiState::Attacking);

        sim.store.request_deletion(flower);
        sim.flush_deletions();
        tick(&mut sim);

        let ai = &sim.ai[mob.index()];
        assert_eq!(ai.ai_state, AiState::Spin2Team);
        assert!(ai.target_entity.is_null());
        // fixed countdown assigned on entry, minus this tick's decrement
        assert_eq!(ai.ticks_until_next_action, SPIN2TEAM_TICKS - 1);
    }

    #[test]
    fn test_spin2team_spins_then_settles_to_idle() {
        let mut sim = test_sim();
        let mob = sim.spawn_mob(MobId::BabyAnt, Rarity::Common, Vec2::ZERO, team::MOBS, false);
        {
            let ai = &mut sim.ai[mob.index()];
            ai.ai_state = AiState::Spin2Team;
            ai.ticks_until_next_action = SPIN2TEAM_TICKS;
        }
        let start_angle = sim.physical(mob).angle;

        for _ in 0..SPIN2TEAM_TICKS + 1 {
            tick(&mut sim);
        }

        let ai = &sim.ai[mob.index()];
        assert_eq!(ai.ai_state, AiState::Idle);
        assert!(
            (IDLE_TICKS_MIN - 1..IDLE_TICKS_MAX).contains(&ai.ticks_until_next_action),
            "countdown {} outside idle window",
            ai.ticks_until_next_action
        );
        assert!(sim.physical(mob).angle > start_angle);
    }

    #[test]
    fn test_idle_wander_cycle_countdowns() {
        let mut sim = test_sim();
        let mob = sim.spawn_mob(MobId::BabyAnt, Rarity::Common, Vec2::ZERO, team::MOBS, false);
        sim.ai[mob.index()].ticks_until_next_action = 1;

        // idle countdown expires: mob picks a heading and wanders
        tick(&mut sim);
        tick(&mut sim);
        tick(&mut sim);
        let ai = &sim.ai[mob.index()];
        assert_eq!(ai.ai_state, AiState::IdleMoving);
        assert!(
            (WANDER_TICKS_MIN - 3..WANDER_TICKS_MAX).contains(&ai.ticks_until_next_action),
            "countdown {} outside wander window",
            ai.ticks_until_next_action
        );
        assert!(sim.physical(mob).acceleration.length() > 0.0);
    }
}
