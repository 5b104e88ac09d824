//! Names and engine-assigned labels.
//!
//! Every registered object carries a user-facing name and a label derived
//! from its slot: a one-letter type tag followed by the decimal slot id
//! (`A3`, `C0`, `S12`).  The same string is the key of the object's
//! persisted configuration record, so labels are never user-chosen.

use core::fmt::Write as _;

use crate::registry::SlotId;

/// Maximum name length in bytes.
pub const NAME_CAPACITY: usize = 16;

/// Fixed-capacity object name.
pub type Name = heapless::String<NAME_CAPACITY>;

/// `<tag><id>`: one letter plus at most three digits.
pub type Label = heapless::String<4>;

/// Object category, as encoded in labels and record keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectTag {
    Actuator,
    Controller,
    Sensor,
}

impl ObjectTag {
    pub const fn letter(self) -> char {
        match self {
            Self::Actuator => 'A',
            Self::Controller => 'C',
            Self::Sensor => 'S',
        }
    }
}

/// Build the label for an occupied slot.  Unassigned ids yield an empty
/// label.
pub fn label(tag: ObjectTag, id: SlotId) -> Label {
    let mut out = Label::new();
    if id.is_assigned() {
        // Capacity 4 always fits one letter and an i8 in 0..=127.
        let _ = write!(out, "{}{}", tag.letter(), id.raw());
    }
    out
}

/// Copy `name` into a [`Name`], truncating on a char boundary.
pub fn name_from(name: &str) -> Name {
    let mut out = Name::new();
    for ch in name.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
