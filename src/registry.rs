//! Fixed-capacity slot registry with stable positional identifiers.
//!
//! Controllers, actuators and sensors each live in their own
//! [`SlotRegistry`].  The slot index *is* the public identifier: it is
//! persisted as part of record keys ("C0", "A12"), embedded in labels and
//! stored in actuator back-references.  The registry therefore never
//! compacts or renumbers, and a slot id stays valid for as long as the
//! slot is occupied.
//!
//! ```text
//!   id:    0      1      2      3      4      5      6      7
//!        ┌──────┬──────┬──────┬──────┬──────┬──────┬──────┬──────┐
//!        │ None │ None │ Some │ None │ None │ Some │ None │ Some │
//!        └──────┴──────┴──────┴──────┴──────┴──────┴──────┴──────┘
//!   cursor walks 2 → 5 → 7 → exhausted
//! ```

use core::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════
//  Slot identifier
// ═══════════════════════════════════════════════════════════════

/// Positional slot identifier.  `-1` ([`SlotId::UNASSIGNED`]) means
/// "unassigned / not found"; anything else is a 0-based registry index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i8", into = "i8")]
pub struct SlotId(i8);

impl From<i8> for SlotId {
    fn from(raw: i8) -> Self {
        Self::new(raw)
    }
}

impl From<SlotId> for i8 {
    fn from(id: SlotId) -> Self {
        id.0
    }
}

impl SlotId {
    /// The "no slot" sentinel.
    pub const UNASSIGNED: Self = Self(-1);

    /// Wrap a raw persisted value.  Any negative value collapses to
    /// [`SlotId::UNASSIGNED`].
    pub const fn new(raw: i8) -> Self {
        if raw < 0 { Self::UNASSIGNED } else { Self(raw) }
    }

    /// Build an id from a registry index.  Indices beyond `i8::MAX`
    /// cannot be represented and map to [`SlotId::UNASSIGNED`].
    pub fn from_index(idx: usize) -> Self {
        i8::try_from(idx).map_or(Self::UNASSIGNED, Self)
    }

    /// Raw persisted value (`-1` when unassigned).
    pub const fn raw(self) -> i8 {
        self.0
    }

    /// Registry index, or `None` for the unassigned sentinel.
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    pub const fn is_assigned(self) -> bool {
        self.0 >= 0
    }
}

impl Default for SlotId {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Registry
// ═══════════════════════════════════════════════════════════════

/// Sparse, fixed-capacity arena of `N` optional occupants.
///
/// Occupants are exclusively owned by the registry once added.
/// The built-in cursor ([`reset_iterator`](Self::reset_iterator) /
/// [`get_next`](Self::get_next)) is not safe against mutation between
/// calls; there is only ever one control cycle in flight.
pub struct SlotRegistry<T, const N: usize> {
    slots: [Option<T>; N],
    cursor: usize,
}

impl<T, const N: usize> SlotRegistry<T, N> {
    const CAPACITY_FITS_SLOT_ID: () = assert!(N <= i8::MAX as usize, "capacity exceeds SlotId range");

    pub fn new() -> Self {
        let () = Self::CAPACITY_FITS_SLOT_ID;
        Self {
            slots: core::array::from_fn(|_| None),
            cursor: 0,
        }
    }

    /// Fixed capacity chosen at construction.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Place `item` in the lowest free slot.  Returns `None` when full;
    /// the item is dropped in that case.
    pub fn add(&mut self, item: T) -> Option<SlotId> {
        let idx = self.slots.iter().position(Option::is_none)?;
        self.slots[idx] = Some(item);
        debug!("Registry: occupied slot {}", idx);
        Some(SlotId::from_index(idx))
    }

    /// Occupant of `id`, or `None` for out-of-range, unassigned or empty ids.
    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots.get(id.index()?)?.as_ref()
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots.get_mut(id.index()?)?.as_mut()
    }

    /// Linear identity scan.  Returns the slot that holds exactly this
    /// object (pointer equality, not value equality).
    pub fn find_element(&self, item: &T) -> Option<SlotId> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|occupant| core::ptr::eq(occupant, item)))
            .map(SlotId::from_index)
    }

    /// Free a slot.  Other occupants keep their ids; the freed id becomes
    /// the next candidate for [`add`](Self::add).
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let removed = self.slots.get_mut(id.index()?)?.take();
        if removed.is_some() {
            debug!("Registry: freed slot {}", id);
        }
        removed
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Rewind the cursor to slot 0.
    pub fn reset_iterator(&mut self) {
        self.cursor = 0;
    }

    /// Advance the cursor to the next occupied slot, in ascending id
    /// order.  Returns `None` once exhausted (and keeps returning `None`
    /// until [`reset_iterator`](Self::reset_iterator)).
    pub fn get_next(&mut self) -> Option<(SlotId, &mut T)> {
        while self.cursor < N {
            let idx = self.cursor;
            self.cursor += 1;
            if self.slots[idx].is_some() {
                return self.slots[idx].as_mut().map(|item| (SlotId::from_index(idx), item));
            }
        }
        None
    }

    /// Borrowing iterator over occupied slots in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|item| (SlotId::from_index(i), item)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|item| (SlotId::from_index(i), item)))
    }

    /// Every slot, occupied or not, in id order.  Used by scans that must
    /// be bounded by capacity rather than occupancy.
    pub fn slots(&self) -> impl Iterator<Item = (SlotId, Option<&T>)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (SlotId::from_index(i), slot.as_ref()))
    }
}

impl<T, const N: usize> Default for SlotRegistry<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
