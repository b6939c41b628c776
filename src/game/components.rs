//! Fixed-layout component records, one table slot per possible entity handle.
//!
//! All cross-entity references are weak, index-based handles; consumers
//! re-check existence before dereferencing. The only owning relationship is
//! the entity store's row ownership, released through deferred deletion.

use bitvec::prelude::*;
use smallvec::SmallVec;

use crate::game::constants::{collision, drops, petal, squad};
use crate::game::data::{MobId, PetalId, Rarity, PETAL_ID_COUNT, RARITY_COUNT};
use crate::game::entity::{EntityId, NULL_ENTITY};
use crate::util::vec2::Vec2;

/// Position, motion, and collision state
#[derive(Debug, Clone)]
pub struct Physical {
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    /// Positional correction accumulated by collision resolution this tick,
    /// consumed by the next integration step
    pub collision_velocity: Vec2,
    pub angle: f32,
    pub radius: f32,
    pub mass: f32,
    /// Multiplicative velocity retention per tick
    pub friction: f32,
    /// Scales the knockback this entity deals to whatever it hits
    pub knockback_scale: f32,
    /// Multiplicative acceleration damping from web contacts; reset to 1
    /// each integration step
    pub web_slowdown: f32,
    /// Bounded contact list rebuilt by collision detection each tick
    pub colliding_with: SmallVec<[EntityId; collision::MAX_CONTACTS]>,
    /// Arena zone this entity currently occupies
    pub arena: EntityId,
}

impl Default for Physical {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            collision_velocity: Vec2::ZERO,
            angle: 0.0,
            radius: 1.0,
            mass: 1.0,
            friction: 1.0,
            knockback_scale: 1.0,
            web_slowdown: 1.0,
            colliding_with: SmallVec::new(),
            arena: NULL_ENTITY,
        }
    }
}

/// Ownership and team links; all weak, re-checked on every access
#[derive(Debug, Clone, Default)]
pub struct Relations {
    pub owner: EntityId,
    pub root_owner: EntityId,
    pub team: u8,
}

#[derive(Debug, Clone, Default)]
pub struct Health {
    pub health: f32,
    pub max_health: f32,
    pub damage: f32,
}

/// AI behavior category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiType {
    #[default]
    Passive,
    Aggressive,
}

/// AI finite-state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiState {
    #[default]
    Idle,
    IdleMoving,
    Spin2Team,
    Attacking,
}

/// Aggro sub-type; hornets keep a standoff distance while attacking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiAggroType {
    #[default]
    Melee,
    Hornet,
}

#[derive(Debug, Clone, Default)]
pub struct Ai {
    pub ai_type: AiType,
    pub ai_state: AiState,
    pub aggro_type: AiAggroType,
    /// Weak target reference, re-validated every tick
    pub target_entity: EntityId,
    pub ticks_until_next_action: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Petal {
    pub id: PetalId,
    pub rarity: Rarity,
    /// Loadout slot indices in the owning player info
    pub outer_pos: usize,
    pub inner_pos: usize,
    /// Position in the shared orbit ring
    pub rotation_pos: u32,
    /// Detached petals (e.g. fired missiles) stop orbiting and no longer
    /// re-arm their slot on destruction
    pub detached: bool,
}

#[derive(Debug, Clone)]
pub struct Drop {
    pub id: PetalId,
    pub rarity: Rarity,
    pub ticks_until_despawn: u32,
    /// One bit per squad member: squad * MEMBER_COUNT + squad_pos.
    /// A set bit is never cleared, preventing double-credit.
    pub picked_up_by: BitArr!(for squad::COUNT * squad::MEMBER_COUNT),
    /// One bit per squad allowed to pick this drop up at all
    pub can_be_picked_up_by: BitArr!(for squad::COUNT),
}

impl Default for Drop {
    fn default() -> Self {
        Self {
            id: PetalId::None,
            rarity: Rarity::Common,
            ticks_until_despawn: 0,
            picked_up_by: BitArray::ZERO,
            can_be_picked_up_by: BitArray::ZERO,
        }
    }
}

impl Drop {
    /// Total lifetime in ticks for a drop of the given rarity
    pub fn lifetime(rarity: Rarity) -> u32 {
        drops::LIFETIME_PER_RARITY * (rarity as u32 + 1)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mob {
    pub id: MobId,
    pub rarity: Rarity,
    /// Spawned by a player (e.g. from an egg); pushable by the owning
    /// team's flower with an overridden mass
    pub player_spawned: bool,
}

#[derive(Debug, Clone)]
pub struct Web {
    /// Multiplier applied to a victim's acceleration while in contact
    pub slow_factor: f32,
}

impl Default for Web {
    fn default() -> Self {
        Self { slow_factor: 1.0 }
    }
}

/// Axis-aligned region flowers respawn into when entering an arena
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnZone {
    pub x: f32,
    pub y: f32,
    pub grid_size: f32,
}

/// A bounded zone a flower can enter, with its own respawn region
#[derive(Debug, Clone, Default)]
pub struct Arena {
    pub radius: f32,
    pub respawn_zone: SpawnZone,
    pub first_squad_to_enter: u8,
    pub player_entered: bool,
}

/// One live petal binding within a loadout slot
#[derive(Debug, Clone, Copy)]
pub struct SlotPetal {
    pub entity: EntityId,
    pub cooldown_ticks: i32,
}

impl Default for SlotPetal {
    fn default() -> Self {
        Self {
            entity: NULL_ENTITY,
            cooldown_ticks: 0,
        }
    }
}

/// A loadout position holding up to count[rarity] petals of one kind
#[derive(Debug, Clone, Default)]
pub struct PetalSlot {
    pub id: PetalId,
    pub rarity: Rarity,
    pub petals: [SlotPetal; petal::MAX_CLUMP],
}

/// A loadout entry not currently deployed (secondary row)
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadoutEntry {
    pub id: PetalId,
    pub rarity: Rarity,
}

/// Per-player pickup/stat modifiers sourced from the loadout
#[derive(Debug, Clone)]
pub struct PlayerModifiers {
    pub drop_pickup_radius: f32,
}

impl Default for PlayerModifiers {
    fn default() -> Self {
        Self {
            drop_pickup_radius: drops::BASE_PICKUP_RADIUS,
        }
    }
}

/// A drop credited to a player this tick, queued for protocol encoding
#[derive(Debug, Clone, Copy)]
pub struct DropNotice {
    pub id: PetalId,
    pub rarity: Rarity,
}

/// Per-connection player state: loadout, camera, squad, input, loot
#[derive(Debug, Clone)]
pub struct PlayerInfo {
    /// Flower entity handle; null until the client requests a spawn
    pub flower_id: EntityId,
    pub camera: Vec2,
    pub squad: u8,
    pub squad_pos: u8,
    /// Input flags: bit 0 holds petals farther, bit 1 holds them closer
    pub input: u8,
    /// Unit movement intent decoded from the latest input packet
    pub movement: Vec2,
    pub global_rotation: f32,
    /// Rotation positions handed out by the latest reload pass
    pub rotation_count: u32,
    pub slots: [PetalSlot; petal::MAX_SLOTS],
    pub secondary: [LoadoutEntry; petal::MAX_SLOTS],
    pub modifiers: PlayerModifiers,
    /// Lifetime collected-loot counters indexed by (petal id, rarity)
    pub collected: [[u32; RARITY_COUNT]; PETAL_ID_COUNT],
    pub drops_this_tick: SmallVec<[DropNotice; drops::PICKUPS_PER_TICK]>,
    /// Set when collected counters change; cleared after encoding
    pub loot_dirty: bool,
}

impl Default for PlayerInfo {
    fn default() -> Self {
        Self {
            flower_id: NULL_ENTITY,
            camera: Vec2::ZERO,
            squad: 0,
            squad_pos: 0,
            input: 0,
            movement: Vec2::ZERO,
            global_rotation: 0.0,
            rotation_count: 0,
            slots: Default::default(),
            secondary: Default::default(),
            modifiers: PlayerModifiers::default(),
            collected: [[0; RARITY_COUNT]; PETAL_ID_COUNT],
            drops_this_tick: SmallVec::new(),
            loot_dirty: false,
        }
    }
}

impl PlayerInfo {
    /// Index into a drop's picked_up_by bitset for this player
    pub fn pickup_bit(&self) -> usize {
        self.squad as usize * squad::MEMBER_COUNT + self.squad_pos as usize
    }
}
