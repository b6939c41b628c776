//! Entity handles, component-presence bitsets, and deferred deletion.
//!
//! An entity is an opaque index into fixed-capacity component tables.
//! Validity is determined solely by the presence bitsets - systems holding a
//! stale handle re-check `exists` before dereferencing. Deletion is deferred:
//! `request_deletion` marks a handle and the simulation frees every marked
//! handle in one pass at the end of the tick, after all systems have finished
//! iterating, so a handle never vanishes mid-iteration.

use bitvec::prelude::*;
use tracing::warn;

use crate::game::constants::sim::MAX_ENTITIES;

/// Opaque entity handle; 0 is the null handle and is never allocated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntityId(pub u16);

pub const NULL_ENTITY: EntityId = EntityId(0);

impl EntityId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Component kinds tracked by presence bitsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum ComponentKind {
    Physical = 0,
    Relations,
    Health,
    Ai,
    Petal,
    Drop,
    Mob,
    Flower,
    Nest,
    Web,
    Arena,
    PlayerInfo,
}

pub const COMPONENT_KIND_COUNT: usize = 12;

/// Allocates and frees entity handles; tracks which components each holds
pub struct EntityStore {
    alive: BitVec,
    pending_deletion: BitVec,
    presence: [BitVec; COMPONENT_KIND_COUNT],
    /// Lowest slot that might be free; scan starts here
    next_free_hint: usize,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            alive: bitvec![0; MAX_ENTITIES],
            pending_deletion: bitvec![0; MAX_ENTITIES],
            presence: std::array::from_fn(|_| bitvec![0; MAX_ENTITIES]),
            next_free_hint: 1,
        }
    }

    /// Allocate the lowest free handle. Returns the null handle if the store
    /// is full; callers treat that as a capacity error, not a fault.
    pub fn alloc(&mut self) -> EntityId {
        for idx in self.next_free_hint..MAX_ENTITIES {
            if !self.alive[idx] {
                self.alive.set(idx, true);
                self.next_free_hint = idx + 1;
                return EntityId(idx as u16);
            }
        }
        warn!("entity store full ({} slots)", MAX_ENTITIES);
        NULL_ENTITY
    }

    #[inline]
    pub fn exists(&self, entity: EntityId) -> bool {
        !entity.is_null() && self.alive[entity.index()]
    }

    #[inline]
    pub fn has(&self, entity: EntityId, kind: ComponentKind) -> bool {
        !entity.is_null() && self.presence[kind as usize][entity.index()]
    }

    pub fn attach(&mut self, entity: EntityId, kind: ComponentKind) {
        debug_assert!(self.exists(entity));
        self.presence[kind as usize].set(entity.index(), true);
    }

    /// Mark a handle for removal at the end of the tick. Idempotent; a null
    /// or already-freed handle is ignored.
    pub fn request_deletion(&mut self, entity: EntityId) {
        if self.exists(entity) {
            self.pending_deletion.set(entity.index(), true);
        }
    }

    pub fn is_pending_deletion(&self, entity: EntityId) -> bool {
        !entity.is_null() && self.pending_deletion[entity.index()]
    }

    /// Collect the handles marked for deletion, in handle order
    pub fn take_pending(&mut self) -> Vec<EntityId> {
        let pending: Vec<EntityId> = self
            .pending_deletion
            .iter_ones()
            .map(|idx| EntityId(idx as u16))
            .collect();
        self.pending_deletion.fill(false);
        pending
    }

    /// Free a handle and clear its component presence. Only the simulation's
    /// end-of-tick flush calls this.
    pub fn free(&mut self, entity: EntityId) {
        debug_assert!(self.exists(entity));
        let idx = entity.index();
        self.alive.set(idx, false);
        for presence in &mut self.presence {
            presence.set(idx, false);
        }
        if idx < self.next_free_hint {
            self.next_free_hint = idx;
        }
    }

    /// Live handles carrying the given component, in handle order
    pub fn entities_with(&self, kind: ComponentKind) -> Vec<EntityId> {
        self.presence[kind as usize]
            .iter_ones()
            .map(|idx| EntityId(idx as u16))
            .collect()
    }

    pub fn count_with(&self, kind: ComponentKind) -> usize {
        self.presence[kind as usize].count_ones()
    }

    pub fn live_count(&self) -> usize {
        self.alive.count_ones()
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
