//! Simulation state and the fixed per-tick system schedule.
//!
//! One `Simulation` owns one arena: the entity store, every component table,
//! the spatial hash, and the tick counter. All mutation happens on the tick
//! thread; the network layer talks to it through the server harness.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::game::components::{
    Ai, Arena, Drop, Health, Mob, Petal, PetalSlot, Physical, PlayerInfo, Relations, SlotPetal,
    SpawnZone, Web,
};
use crate::game::constants::{drops, sim, spawn, team};
use crate::game::data::{self, MobId, PetalId, Rarity};
use crate::game::entity::{ComponentKind, EntityId, EntityStore, NULL_ENTITY};
use crate::game::spatial::SpatialHash;
use crate::game::systems;
use crate::util::vec2::Vec2;

/// All mutable state for one arena
pub struct Simulation {
    pub store: EntityStore,
    pub physical: Vec<Physical>,
    pub relations: Vec<Relations>,
    pub health: Vec<Health>,
    pub ai: Vec<Ai>,
    pub petal: Vec<Petal>,
    pub drop: Vec<Drop>,
    pub mob: Vec<Mob>,
    pub web: Vec<Web>,
    pub arena: Vec<Arena>,
    pub player_info: Vec<PlayerInfo>,
    pub spatial: SpatialHash,
    /// Narrow-phase contact pairs for this tick, each unordered pair once
    pub contacts: Vec<(EntityId, EntityId)>,
    pub rng: StdRng,
    pub tick: u64,
    /// Entity holding the base arena component
    pub base_arena: EntityId,
}

impl Simulation {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic constructor for tests
    pub fn with_rng(rng: StdRng) -> Self {
        let mut this = Self {
            store: EntityStore::new(),
            physical: vec![Physical::default(); sim::MAX_ENTITIES],
            relations: vec![Relations::default(); sim::MAX_ENTITIES],
            health: vec![Health::default(); sim::MAX_ENTITIES],
            ai: vec![Ai::default(); sim::MAX_ENTITIES],
            petal: vec![Petal::default(); sim::MAX_ENTITIES],
            drop: vec![Drop::default(); sim::MAX_ENTITIES],
            mob: vec![Mob::default(); sim::MAX_ENTITIES],
            web: vec![Web::default(); sim::MAX_ENTITIES],
            arena: vec![Arena::default(); sim::MAX_ENTITIES],
            player_info: vec![PlayerInfo::default(); sim::MAX_ENTITIES],
            spatial: SpatialHash::default(),
            contacts: Vec::new(),
            rng,
            tick: 0,
            base_arena: NULL_ENTITY,
        };
        this.base_arena = this.spawn_base_arena();
        this
    }

    /// Run one 40 ms step: AI, petals, integration, broad + narrow phase,
    /// resolution, drops, then the deferred-deletion flush
    pub fn tick(&mut self) {
        systems::ai::tick(self);
        systems::petal::tick(self);
        systems::movement::tick(self);
        systems::collision::tick(self);
        systems::resolution::tick(self);
        systems::drops::tick(self);
        self.flush_deletions();
        self.tick += 1;
        trace!(tick = self.tick, entities = self.store.live_count(), "tick complete");
    }

    // --- component access -------------------------------------------------

    #[inline]
    pub fn physical(&self, e: EntityId) -> &Physical {
        &self.physical[e.index()]
    }

    #[inline]
    pub fn physical_mut(&mut self, e: EntityId) -> &mut Physical {
        &mut self.physical[e.index()]
    }

    /// Disjoint mutable access to two physicals of one contact pair
    pub fn physical_pair_mut(
        &mut self,
        a: EntityId,
        b: EntityId,
    ) -> (&mut Physical, &mut Physical) {
        let (ia, ib) = (a.index(), b.index());
        debug_assert_ne!(ia, ib);
        if ia < ib {
            let (lo, hi) = self.physical.split_at_mut(ib);
            (&mut lo[ia], &mut hi[0])
        } else {
            let (lo, hi) = self.physical.split_at_mut(ia);
            (&mut hi[0], &mut lo[ib])
        }
    }

    #[inline]
    pub fn relations(&self, e: EntityId) -> &Relations {
        &self.relations[e.index()]
    }

    pub fn add_physical(&mut self, e: EntityId) -> &mut Physical {
        self.store.attach(e, ComponentKind::Physical);
        self.physical[e.index()] = Physical::default();
        &mut self.physical[e.index()]
    }

    pub fn add_relations(&mut self, e: EntityId) -> &mut Relations {
        self.store.attach(e, ComponentKind::Relations);
        self.relations[e.index()] = Relations::default();
        &mut self.relations[e.index()]
    }

    pub fn add_health(&mut self, e: EntityId) -> &mut Health {
        self.store.attach(e, ComponentKind::Health);
        self.health[e.index()] = Health::default();
        &mut self.health[e.index()]
    }

    pub fn add_ai(&mut self, e: EntityId) -> &mut Ai {
        self.store.attach(e, ComponentKind::Ai);
        self.ai[e.index()] = Ai::default();
        &mut self.ai[e.index()]
    }

    pub fn add_petal(&mut self, e: EntityId) -> &mut Petal {
        self.store.attach(e, ComponentKind::Petal);
        self.petal[e.index()] = Petal::default();
        &mut self.petal[e.index()]
    }

    pub fn add_drop(&mut self, e: EntityId) -> &mut Drop {
        self.store.attach(e, ComponentKind::Drop);
        self.drop[e.index()] = Drop::default();
        &mut self.drop[e.index()]
    }

    pub fn add_mob(&mut self, e: EntityId) -> &mut Mob {
        self.store.attach(e, ComponentKind::Mob);
        self.mob[e.index()] = Mob::default();
        &mut self.mob[e.index()]
    }

    pub fn add_web(&mut self, e: EntityId) -> &mut Web {
        self.store.attach(e, ComponentKind::Web);
        self.web[e.index()] = Web::default();
        &mut self.web[e.index()]
    }

    pub fn add_arena(&mut self, e: EntityId) -> &mut Arena {
        self.store.attach(e, ComponentKind::Arena);
        self.arena[e.index()] = Arena::default();
        &mut self.arena[e.index()]
    }

    pub fn add_player_info(&mut self, e: EntityId) -> &mut PlayerInfo {
        self.store.attach(e, ComponentKind::PlayerInfo);
        self.player_info[e.index()] = PlayerInfo::default();
        &mut self.player_info[e.index()]
    }

    // --- spawning ---------------------------------------------------------

    /// The base arena: no physical body, just the spawn disc
    fn spawn_base_arena(&mut self) -> EntityId {
        let e = self.store.alloc();
        let arena = self.add_arena(e);
        arena.radius = spawn::ARENA_RADIUS;
        e
    }

    /// Player-info entity backing one connection
    pub fn spawn_player_info(&mut self, squad: u8, squad_pos: u8) -> EntityId {
        let e = self.store.alloc();
        if e.is_null() {
            return e;
        }
        let info = self.add_player_info(e);
        info.squad = squad;
        info.squad_pos = squad_pos;
        debug!(entity = e.0, squad, squad_pos, "player info spawned");
        e
    }

    /// Spawn a flower for the given player-info entity at a uniform random
    /// point inside the arena disc
    pub fn spawn_flower(&mut self, player: EntityId) -> EntityId {
        let e = self.store.alloc();
        if e.is_null() {
            return e;
        }
        let r = spawn::ARENA_RADIUS * self.rng.gen::<f32>().sqrt();
        let theta = self.rng.gen::<f32>() * std::f32::consts::TAU;
        let position = Vec2::from_polar(r, theta);
        let base_arena = self.base_arena;

        let physical = self.add_physical(e);
        physical.position = position;
        physical.radius = spawn::FLOWER_RADIUS;
        physical.friction = spawn::FLOWER_FRICTION;
        physical.arena = base_arena;
        let relations = self.add_relations(e);
        relations.owner = player;
        relations.root_owner = player;
        relations.team = team::PLAYERS;
        let health = self.add_health(e);
        health.max_health = spawn::FLOWER_HEALTH;
        health.health = spawn::FLOWER_HEALTH;
        health.damage = spawn::FLOWER_DAMAGE;
        self.store.attach(e, ComponentKind::Flower);

        let info = &mut self.player_info[player.index()];
        info.flower_id = e;
        info.camera = position;
        debug!(entity = e.0, player = player.0, "flower spawned");
        e
    }

    pub fn spawn_mob(
        &mut self,
        id: MobId,
        rarity: Rarity,
        position: Vec2,
        mob_team: u8,
        player_spawned: bool,
    ) -> EntityId {
        let e = self.store.alloc();
        if e.is_null() {
            return e;
        }
        let base = data::mob_data(id);
        let scale = data::mob_rarity_scale(rarity);
        let base_arena = self.base_arena;

        let physical = self.add_physical(e);
        physical.position = position;
        physical.radius = base.radius * scale.radius;
        physical.friction = 0.75;
        physical.mass = physical.radius;
        physical.arena = base_arena;
        let relations = self.add_relations(e);
        relations.team = mob_team;
        let health = self.add_health(e);
        health.max_health = base.health * scale.health;
        health.health = health.max_health;
        health.damage = base.damage * scale.damage;
        let mob = self.add_mob(e);
        mob.id = id;
        mob.rarity = rarity;
        mob.player_spawned = player_spawned;
        let ai = self.add_ai(e);
        ai.ticks_until_next_action = 1;
        e
    }

    /// Roll a drop rarity from the cumulative threshold table
    pub fn roll_drop_rarity(&mut self) -> Rarity {
        let thresholds = data::drop_rarity_thresholds();
        let roll: f64 = self.rng.gen();
        for (tier, window) in thresholds.windows(2).enumerate() {
            if roll < window[1] {
                return Rarity::from_u8(tier as u8);
            }
        }
        Rarity::from_u8((data::RARITY_COUNT - 1) as u8)
    }

    pub fn spawn_drop(
        &mut self,
        id: PetalId,
        rarity: Rarity,
        position: Vec2,
        squads: &[u8],
    ) -> EntityId {
        let e = self.store.alloc();
        if e.is_null() {
            return e;
        }
        let base_arena = self.base_arena;
        let physical = self.add_physical(e);
        physical.position = position;
        physical.radius = drops::BASE_PICKUP_RADIUS;
        physical.arena = base_arena;
        self.add_relations(e);
        let drop = self.add_drop(e);
        drop.id = id;
        drop.rarity = rarity;
        drop.ticks_until_despawn = Drop::lifetime(rarity);
        for &squad in squads {
            drop.can_be_picked_up_by.set(squad as usize, true);
        }
        e
    }

    /// A portal arena with a physical body; flowers touching it are
    /// teleported into its respawn zone
    pub fn spawn_portal_arena(&mut self, position: Vec2, radius: f32, zone: SpawnZone) -> EntityId {
        let e = self.store.alloc();
        if e.is_null() {
            return e;
        }
        let physical = self.add_physical(e);
        physical.position = position;
        physical.radius = radius;
        self.add_relations(e);
        let arena = self.add_arena(e);
        arena.radius = radius;
        arena.respawn_zone = zone;
        e
    }

    pub fn spawn_web(&mut self, position: Vec2, radius: f32, web_team: u8, slow: f32) -> EntityId {
        let e = self.store.alloc();
        if e.is_null() {
            return e;
        }
        let physical = self.add_physical(e);
        physical.position = position;
        physical.radius = radius;
        let relations = self.add_relations(e);
        relations.team = web_team;
        let web = self.add_web(e);
        web.slow_factor = slow;
        e
    }

    /// Nests never move when collided with
    pub fn spawn_nest(&mut self, position: Vec2, radius: f32, nest_team: u8) -> EntityId {
        let e = self.store.alloc();
        if e.is_null() {
            return e;
        }
        let physical = self.add_physical(e);
        physical.position = position;
        physical.radius = radius;
        physical.mass = radius;
        let relations = self.add_relations(e);
        relations.team = nest_team;
        self.store.attach(e, ComponentKind::Nest);
        e
    }

    // --- queries ----------------------------------------------------------

    /// Nearest living enemy of `entity` within `range`: the flower list is
    /// scanned first, then the spatial hash for anything else with health
    pub fn find_nearest_enemy(&self, entity: EntityId, range: f32) -> EntityId {
        let own_team = self.relations(entity).team;
        let position = self.physical(entity).position;
        let mut best = NULL_ENTITY;
        let mut best_dist_sq = range * range;

        for flower in self.store.entities_with(ComponentKind::Flower) {
            if self.relations(flower).team == own_team {
                continue;
            }
            let d = position.distance_sq_to(self.physical(flower).position);
            if d < best_dist_sq {
                best = flower;
                best_dist_sq = d;
            }
        }

        // a closer non-flower enemy can still beat the flower result
        self.spatial.query(position, range, range, |entry| {
            if entry.entity == entity {
                return;
            }
            if !self.store.has(entry.entity, ComponentKind::Health) {
                return;
            }
            if self.relations(entry.entity).team == own_team {
                return;
            }
            let d = position.distance_sq_to(entry.position);
            if d < best_dist_sq {
                best = entry.entity;
                best_dist_sq = d;
            }
        });
        best
    }

    // --- deletion ---------------------------------------------------------

    /// Free every entity marked during this tick. Non-detached petals re-arm
    /// their loadout slot's cooldown; flowers unlink from their player info.
    pub fn flush_deletions(&mut self) {
        for e in self.store.take_pending() {
            if self.store.has(e, ComponentKind::Petal) {
                self.release_petal_slot(e);
            }
            if self.store.has(e, ComponentKind::Flower) {
                let owner = self.relations[e.index()].owner;
                if self.store.has(owner, ComponentKind::PlayerInfo) {
                    let info = &mut self.player_info[owner.index()];
                    if info.flower_id == e {
                        info.flower_id = NULL_ENTITY;
                    }
                }
            }
            self.store.free(e);
        }
    }

    fn release_petal_slot(&mut self, e: EntityId) {
        let petal = self.petal[e.index()].clone();
        let owner = self.relations[e.index()].owner;
        if !self.store.has(owner, ComponentKind::PlayerInfo) {
            return;
        }
        let info = &mut self.player_info[owner.index()];
        let Some(slot) = info.slots.get_mut(petal.outer_pos) else {
            return;
        };
        let Some(bound) = slot.petals.get_mut(petal.inner_pos) else {
            return;
        };
        if bound.entity != e {
            return;
        }
        bound.entity = NULL_ENTITY;
        if !petal.detached {
            bound.cooldown_ticks = data::petal_data(petal.id).cooldown as i32;
        }
    }

    /// Bind a loadout slot, despawning any live petals it held
    pub fn set_loadout_slot(&mut self, player: EntityId, outer: usize, id: PetalId, rarity: Rarity) {
        let info = &mut self.player_info[player.index()];
        let Some(slot) = info.slots.get_mut(outer) else {
            return;
        };
        let old: Vec<EntityId> = slot
            .petals
            .iter()
            .map(|p| p.entity)
            .filter(|p| !p.is_null())
            .collect();
        *slot = PetalSlot {
            id,
            rarity,
            petals: [SlotPetal::default(); crate::game::constants::petal::MAX_CLUMP],
        };
        for e in old {
            if self.store.exists(e) {
                self.petal[e.index()].detached = true;
                self.store.request_deletion(e);
            }
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}
