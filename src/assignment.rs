//! Assignment index: which actuators belong to which controller.
//!
//! The relationship is stored only as the back-reference on each actuator
//! slot.  Lookups scan every actuator slot in ascending id order, so the
//! result order is stable and the cost is bounded by capacity.

use crate::actuators::ActuatorSlot;
use crate::registry::{SlotId, SlotRegistry};

/// Fill `out` with the ids of every actuator assigned to `controller`.
///
/// At most `out.len()` ids are written, but the scan continues and the
/// true total is returned.  An unassigned `controller` matches nothing,
/// in particular not the actuators that are themselves unassigned.
pub fn assigned_actuator_ids<const N: usize>(
    actuators: &SlotRegistry<ActuatorSlot, N>,
    controller: SlotId,
    out: &mut [SlotId],
) -> usize {
    fill(assigned(actuators, controller).map(|(id, _)| id), out)
}

/// Like [`assigned_actuator_ids`] but yields the slots themselves.
pub fn assigned_actuators<'a, const N: usize>(
    actuators: &'a SlotRegistry<ActuatorSlot, N>,
    controller: SlotId,
    out: &mut [Option<&'a ActuatorSlot>],
) -> usize {
    fill(assigned(actuators, controller).map(|(_, slot)| Some(slot)), out)
}

/// Lazy form of the scan.
pub fn assigned<const N: usize>(
    actuators: &SlotRegistry<ActuatorSlot, N>,
    controller: SlotId,
) -> impl Iterator<Item = (SlotId, &ActuatorSlot)> {
    actuators
        .iter()
        .filter(move |(_, slot)| controller.is_assigned() && slot.controller() == controller)
}

fn fill<T>(items: impl Iterator<Item = T>, out: &mut [T]) -> usize {
    let mut count = 0;
    for item in items {
        if let Some(dst) = out.get_mut(count) {
            *dst = item;
        }
        count += 1;
    }
    count
}
