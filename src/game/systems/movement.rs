//! Velocity integration.
//!
//! Runs after AI and petal steering have written accelerations and before
//! collision detection, so detection always sees post-move positions.
//! `collision_velocity` written by last tick's resolution is applied here and
//! cleared at the start of the next resolution pass.

use crate::game::entity::ComponentKind;
use crate::game::simulation::Simulation;
use crate::util::vec2::Vec2;

pub fn tick(sim: &mut Simulation) {
    for e in sim.store.entities_with(ComponentKind::Physical) {
        let physical = sim.physical_mut(e);
        let slowdown = physical.web_slowdown;
        physical.velocity += physical.acceleration * slowdown;
        physical.velocity *= physical.friction;
        physical.position += physical.velocity + physical.collision_velocity;
        physical.acceleration = Vec2::ZERO;
        physical.web_slowdown = 1.0;
    }
}
