/// Tick loop constants
pub mod sim {
    /// Tick period in milliseconds
    pub const TICK_DURATION_MS: u64 = 40;
    /// Ticks per second
    pub const TICK_RATE: u32 = 1000 / TICK_DURATION_MS as u32;
    /// Fixed capacity of the entity store (handle 0 is the null handle)
    pub const MAX_ENTITIES: usize = 4096;
}

/// Spatial hash constants
pub mod spatial {
    /// Cell size in world units
    ///
    /// Must be at least the largest entity radius so that inserting an
    /// entity's bounding box covers every cell it can overlap.
    pub const CELL_SIZE: f32 = 64.0;
    /// Initial capacity for the cell hashmap
    pub const GRID_INITIAL_CAPACITY: usize = 256;
    /// Initial capacity for entity vectors within cells
    pub const CELL_INITIAL_CAPACITY: usize = 8;
}

/// Collision constants
pub mod collision {
    /// Knockback acceleration along the contact normal
    pub const KNOCKBACK: f32 = 8.0 / 2.0;
    /// Per-entity contact list capacity; overflow is logged, not fatal
    pub const MAX_CONTACTS: usize = 16;
    /// Mass seen by a flower pushing its own player-spawned mob,
    /// as a fraction of the flower's mass per rarity step
    pub const PUSHABLE_MOB_MASS_RATIO: f32 = 0.4;
}

/// Mob AI constants
pub mod ai {
    /// Detection range for aggressive mobs (world units)
    pub const DETECTION_RANGE: f32 = 1500.0;
    /// Hornets stop closing once within this distance of their target
    pub const HORNET_STANDOFF: f32 = 500.0;
    /// Acceleration while chasing a target
    pub const CHASE_ACCELERATION: f32 = 0.75;
    /// Acceleration while wandering
    pub const WANDER_ACCELERATION: f32 = 0.5;
    /// Heading increment per tick in the spin2team state (radians)
    pub const SPIN_INCREMENT: f32 = 1.0;
    /// Fixed countdown assigned on entry to spin2team
    pub const SPIN2TEAM_TICKS: u32 = 50;
    /// Idle countdown range (inclusive)
    pub const IDLE_TICKS_MIN: u32 = 25;
    pub const IDLE_TICKS_MAX: u32 = 34;
    /// Idle-moving countdown range (inclusive)
    pub const WANDER_TICKS_MIN: u32 = 75;
    pub const WANDER_TICKS_MAX: u32 = 84;
}

/// Petal orbit constants
pub mod petal {
    /// Default orbit radius around the flower
    pub const HOLD_RADIUS: f32 = 75.0;
    /// Orbit radius while the attack input is held
    pub const HOLD_RADIUS_EXTENDED: f32 = 150.0;
    /// Orbit radius while the defend input is held
    pub const HOLD_RADIUS_RETRACTED: f32 = 45.0;
    /// Global rotation advance per tick (radians)
    pub const ROTATION_INCREMENT: f32 = 0.1;
    /// Acceleration per unit of displacement toward the orbit target
    pub const CHASE_STIFFNESS: f32 = 0.6;
    /// Clump sub-orbit spins at this multiple of the global angle
    pub const CLUMP_ANGLE_RATE: f32 = 1.333;
    /// Newly spawned petal radius and friction
    pub const RADIUS: f32 = 10.0;
    pub const FRICTION: f32 = 0.75;
    /// Loadout slots per row (primary and secondary rows)
    pub const MAX_SLOTS: usize = 10;
    /// Most petals a single slot can hold at any rarity
    pub const MAX_CLUMP: usize = 6;
}

/// Drop lifecycle constants
pub mod drops {
    /// Lifetime in ticks per rarity step: 250 * (rarity + 1)
    pub const LIFETIME_PER_RARITY: u32 = 250;
    /// Drops cannot be picked up for this many ticks after spawning
    pub const PICKUP_DELAY: u32 = 10;
    /// Pickups credited to one player per tick
    pub const PICKUPS_PER_TICK: usize = 8;
    /// Base pickup reach added to the drop's radius
    pub const BASE_PICKUP_RADIUS: f32 = 25.0;
}

/// Squad constants
pub mod squad {
    /// Squads per arena
    pub const COUNT: usize = 16;
    /// Players per squad
    pub const MEMBER_COUNT: usize = 4;
}

/// Spawn constants
pub mod spawn {
    /// Flower body radius
    pub const FLOWER_RADIUS: f32 = 25.0;
    /// Flower friction coefficient
    pub const FLOWER_FRICTION: f32 = 0.9;
    /// Flower starting health
    pub const FLOWER_HEALTH: f32 = 1000.0;
    /// Flower contact damage
    pub const FLOWER_DAMAGE: f32 = 10.0;
    /// Main arena radius; flowers spawn uniformly inside this disc
    pub const ARENA_RADIUS: f32 = 1650.0;
}

/// Teams
pub mod team {
    pub const MOBS: u8 = 0;
    pub const PLAYERS: u8 = 1;
}
