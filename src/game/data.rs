//! Static game-balance tables: petal stats, mob stats, rarity scaling.
//!
//! The simulation treats these as read-only data indexed by small integer
//! ids. Unknown ids resolve to a zeroed default row rather than a hard fault.

/// Petal kind ids; id 0 is the empty slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PetalId {
    #[default]
    None = 0,
    Basic = 1,
    Light = 2,
    Stinger = 3,
    Faster = 4,
    Missile = 5,
}

pub const PETAL_ID_COUNT: usize = 6;

impl PetalId {
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            1 => PetalId::Basic,
            2 => PetalId::Light,
            3 => PetalId::Stinger,
            4 => PetalId::Faster,
            5 => PetalId::Missile,
            _ => PetalId::None,
        }
    }
}

/// Mob kind ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MobId {
    #[default]
    BabyAnt = 0,
    WorkerAnt = 1,
    CentipedeHead = 2,
    CentipedeBody = 3,
}

pub const MOB_ID_COUNT: usize = 4;

/// Rarity tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum Rarity {
    #[default]
    Common = 0,
    Unusual = 1,
    Rare = 2,
    Epic = 3,
}

pub const RARITY_COUNT: usize = 4;

impl Rarity {
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Rarity::Unusual,
            2 => Rarity::Rare,
            3 => Rarity::Epic,
            _ => Rarity::Common,
        }
    }
}

pub const RARITY_NAMES: [&str; RARITY_COUNT] = ["Common", "Unusual", "Rare", "Epic"];

/// Static stats for one petal kind
#[derive(Debug, Clone, Copy, Default)]
pub struct PetalData {
    pub id: PetalId,
    pub damage: f32,
    pub health: f32,
    /// Nonzero marks a clump petal: slot members share one rotation
    /// position and spread on a secondary orbit of this radius
    pub clump_radius: f32,
    /// Reload ticks after a petal of this kind is destroyed
    pub cooldown: u32,
    /// Petals per slot, indexed by rarity
    pub count: [u32; RARITY_COUNT],
}

const PETAL_DATA: [PetalData; PETAL_ID_COUNT] = [
    PetalData {
        id: PetalId::None,
        damage: 0.0,
        health: 0.0,
        clump_radius: 0.0,
        cooldown: 0,
        count: [0, 0, 0, 0],
    },
    PetalData {
        id: PetalId::Basic,
        damage: 10.0,
        health: 10.0,
        clump_radius: 0.0,
        cooldown: 37,
        count: [1, 1, 1, 1],
    },
    PetalData {
        id: PetalId::Light,
        damage: 13.0,
        health: 5.0,
        clump_radius: 0.0,
        cooldown: 12,
        count: [1, 2, 2, 3],
    },
    PetalData {
        id: PetalId::Stinger,
        damage: 45.0,
        health: 2.0,
        clump_radius: 10.0,
        cooldown: 100,
        count: [1, 1, 1, 3],
    },
    PetalData {
        id: PetalId::Faster,
        damage: 10.0,
        health: 5.0,
        clump_radius: 25.0,
        cooldown: 25,
        count: [1, 1, 1, 6],
    },
    PetalData {
        id: PetalId::Missile,
        damage: 75.0,
        health: 5.0,
        clump_radius: 15.0,
        cooldown: 100,
        count: [1, 1, 1, 3],
    },
];

/// Look up a petal row; out-of-range ids get the zeroed default row
pub fn petal_data(id: PetalId) -> &'static PetalData {
    &PETAL_DATA[id as usize]
}

/// Static stats for one mob kind
#[derive(Debug, Clone, Copy, Default)]
pub struct MobData {
    pub id: MobId,
    pub health: f32,
    pub damage: f32,
    pub radius: f32,
}

const MOB_DATA: [MobData; MOB_ID_COUNT] = [
    MobData {
        id: MobId::BabyAnt,
        health: 1.0,
        damage: 1.0,
        radius: 17.5,
    },
    MobData {
        id: MobId::WorkerAnt,
        health: 1.0,
        damage: 1.0,
        radius: 17.5,
    },
    MobData {
        id: MobId::CentipedeHead,
        health: 10.0,
        damage: 1.0,
        radius: 35.0,
    },
    MobData {
        id: MobId::CentipedeBody,
        health: 10.0,
        damage: 1.0,
        radius: 35.0,
    },
];

pub fn mob_data(id: MobId) -> &'static MobData {
    &MOB_DATA[id as usize]
}

/// Per-rarity stat multipliers for mobs
#[derive(Debug, Clone, Copy)]
pub struct MobRarityScale {
    pub health: f32,
    pub damage: f32,
    pub radius: f32,
}

const MOB_RARITY_SCALING: [MobRarityScale; RARITY_COUNT] = [
    MobRarityScale {
        health: 1.0,
        damage: 1.0,
        radius: 1.0,
    },
    MobRarityScale {
        health: 2.0,
        damage: 2.0,
        radius: 1.1,
    },
    MobRarityScale {
        health: 6.0,
        damage: 6.0,
        radius: 1.3,
    },
    MobRarityScale {
        health: 15.0,
        damage: 15.0,
        radius: 1.6,
    },
];

pub fn mob_rarity_scale(rarity: Rarity) -> &'static MobRarityScale {
    &MOB_RARITY_SCALING[rarity as usize]
}

/// Cumulative drop-roll thresholds per rarity, normalized to (last == 1.0)
///
/// Built from the raw per-tier weights 1, 2.5, 10, 15: each weight is first
/// expressed relative to the previous tier, then normalized into a running
/// cumulative sum. A uniform roll in [0,1) maps to the first tier whose
/// threshold exceeds it.
pub fn drop_rarity_thresholds() -> [f64; RARITY_COUNT + 1] {
    let mut coeff = [0.0, 1.0, 2.5, 10.0, 15.0];
    let mut sum = 1.0;
    for a in 2..=RARITY_COUNT {
        coeff[a] /= coeff[a - 1];
        sum += coeff[a];
    }
    for a in 1..=RARITY_COUNT {
        coeff[a] = coeff[a] / sum + coeff[a - 1];
    }
    coeff
}
