//! Queue-family matching and allocation.
//!
//! One algorithm serves both halves of the bootstrap: device *selection*
//! runs it as a dry run on a disposable copy of the family table to test
//! feasibility, and device *construction* runs it for real to produce the
//! queue-create descriptors and the queue→destination bindings.
//!
//! The matcher is greedy and order-sensitive on purpose: requests commit
//! in caller order, so a given request list always lands on the same
//! families. Callers relying on that determinism would be broken by a
//! globally-optimal matcher.

use ash::vk;

use crate::device::profile::QueueFamilyInfo;
use crate::error::Error;

/// Priority used when a request does not carry its own.
pub const DEFAULT_QUEUE_PRIORITY: f32 = 1.0;

/// How a request's capability flags are matched against a family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectMode {
    /// Any family carrying at least the required flags is feasible.
    #[default]
    Supports,
    /// Only a family carrying exactly the required flags is feasible.
    Strict,
}

/// One queue the caller wants out of the device.
///
/// During selection the `destination` may be `None` (feasibility only);
/// during construction every request must carry one. Destinations are
/// written if and only if the whole construction call succeeds.
#[derive(Debug, Default)]
pub struct QueueRequest<'a> {
    pub required_flags: vk::QueueFlags,
    pub mode: SelectMode,
    /// Overrides [`DEFAULT_QUEUE_PRIORITY`] for this queue.
    pub priority: Option<f32>,
    pub destination: Option<&'a mut vk::Queue>,
}

impl<'a> QueueRequest<'a> {
    pub fn new(required_flags: vk::QueueFlags) -> Self {
        QueueRequest {
            required_flags,
            ..Default::default()
        }
    }

    /// Restrict this request to exact capability matches.
    pub fn strict(mut self) -> Self {
        self.mode = SelectMode::Strict;
        self
    }

    pub fn priority(mut self, priority: f32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn destination(mut self, destination: &'a mut vk::Queue) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Distance to a family under this request's select mode.
    fn family_distance(&self, family_flags: vk::QueueFlags) -> Option<u32> {
        match (self.mode, distance(family_flags, self.required_flags)) {
            (SelectMode::Supports, d) => d,
            (SelectMode::Strict, Some(0)) => Some(0),
            (SelectMode::Strict, _) => None,
        }
    }
}

/// Scores how well a family's capability flags fit a request.
///
/// `None` when the family lacks a required bit. Otherwise the number of
/// *extra* capability bits the family carries beyond what was asked for:
/// the most specialized matching family scores lowest, leaving broader
/// families free for later requests. `Some(0)` iff the flags are equal.
pub fn distance(family_flags: vk::QueueFlags, required_flags: vk::QueueFlags) -> Option<u32> {
    if !family_flags.contains(required_flags) {
        return None;
    }
    Some((family_flags ^ required_flags).as_raw().count_ones())
}

/// One queue family's capacity view for a single allocation pass.
///
/// Derived fresh per candidate and per pass; never shared across either.
/// `remaining` is only ever decremented behind a `> 0` guard.
#[derive(Clone, Debug)]
pub struct FamilySlot {
    pub index: u32,
    pub flags: vk::QueueFlags,
    pub remaining: u32,
    pub allocated: u32,
    pub supports_present: bool,
}

impl FamilySlot {
    pub fn new(index: u32, flags: vk::QueueFlags, capacity: u32) -> Self {
        FamilySlot {
            index,
            flags,
            remaining: capacity,
            allocated: 0,
            supports_present: false,
        }
    }

    pub fn with_present(mut self, supports_present: bool) -> Self {
        self.supports_present = supports_present;
        self
    }
}

impl From<&QueueFamilyInfo> for FamilySlot {
    fn from(info: &QueueFamilyInfo) -> Self {
        FamilySlot::new(info.index, info.flags, info.queue_count).with_present(info.supports_present)
    }
}

/// One `(family, slot)` → destination binding produced by [`allocate`].
///
/// `request` is the index into the request list, or `None` for the
/// presentation binding. A presentation binding may reuse a family/slot
/// already bound to a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueWrite {
    pub request: Option<usize>,
    pub family: u32,
    pub slot: u32,
}

/// All queues to create from one family: `priorities.len()` is the count.
#[derive(Clone, Debug, PartialEq)]
pub struct QueueGroup {
    pub family: u32,
    pub priorities: Vec<f32>,
}

/// The outcome of a successful allocation pass.
#[derive(Clone, Debug, Default)]
pub struct AllocationPlan {
    pub writes: Vec<QueueWrite>,
    pub groups: Vec<QueueGroup>,
}

impl AllocationPlan {
    /// Total queues to be created across all families.
    pub fn queue_count(&self) -> usize {
        self.groups.iter().map(|g| g.priorities.len()).sum()
    }
}

/// Assigns every request to a queue family under finite capacity.
///
/// Requests are processed strictly in the given order. Each one commits
/// to the feasible family with the minimum [`distance`]; ties go to the
/// lowest family index. When `present_required`, a presentation binding
/// is satisfied opportunistically from a just-chosen family that supports
/// it (no extra capacity), or failing that from one final scan for any
/// present-capable family with spare capacity.
///
/// On failure the plan is discarded but `families` may hold partial
/// decrements; callers doing feasibility probes pass a disposable copy.
pub fn allocate(
    families: &mut [FamilySlot],
    requests: &[QueueRequest<'_>],
    present_required: bool,
) -> Result<AllocationPlan, Error> {
    let mut priorities: Vec<Vec<f32>> = vec![Vec::new(); families.len()];
    let mut writes = Vec::with_capacity(requests.len() + usize::from(present_required));
    let mut present_bound = false;

    for (request_index, request) in requests.iter().enumerate() {
        // Scan in index order with strict `<` so the first minimum wins.
        let mut best: Option<(usize, u32)> = None;
        for (position, family) in families.iter().enumerate() {
            if family.remaining == 0 {
                continue;
            }
            let Some(dist) = request.family_distance(family.flags) else {
                continue;
            };
            if best.is_none_or(|(_, best_dist)| dist < best_dist) {
                best = Some((position, dist));
            }
        }
        let Some((position, _)) = best else {
            return Err(Error::AllocationFailed);
        };

        let family = &mut families[position];
        let slot = family.allocated;
        family.remaining -= 1;
        family.allocated += 1;
        priorities[position].push(request.priority.unwrap_or(DEFAULT_QUEUE_PRIORITY));
        writes.push(QueueWrite {
            request: Some(request_index),
            family: family.index,
            slot,
        });

        // A present-capable family we just committed to can double as the
        // presentation queue without consuming another slot.
        if present_required && !present_bound && family.supports_present {
            writes.push(QueueWrite {
                request: None,
                family: family.index,
                slot,
            });
            present_bound = true;
        }
    }

    if present_required && !present_bound {
        let Some(position) = families
            .iter()
            .position(|f| f.remaining > 0 && f.supports_present)
        else {
            return Err(Error::AllocationFailed);
        };
        let family = &mut families[position];
        let slot = family.allocated;
        family.remaining -= 1;
        family.allocated += 1;
        priorities[position].push(DEFAULT_QUEUE_PRIORITY);
        writes.push(QueueWrite {
            request: None,
            family: family.index,
            slot,
        });
    }

    let groups = families
        .iter()
        .zip(priorities)
        .filter(|(family, _)| family.allocated > 0)
        .map(|(family, priorities)| QueueGroup {
            family: family.index,
            priorities,
        })
        .collect();

    Ok(AllocationPlan { writes, groups })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gct() -> vk::QueueFlags {
        vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER
    }

    #[test]
    fn distance_requires_superset() {
        assert_eq!(distance(vk::QueueFlags::TRANSFER, vk::QueueFlags::GRAPHICS), None);
        assert_eq!(
            distance(vk::QueueFlags::GRAPHICS, gct()),
            None,
            "subset family must be infeasible"
        );
    }

    #[test]
    fn distance_counts_extra_bits() {
        assert_eq!(distance(gct(), vk::QueueFlags::TRANSFER), Some(2));
        assert_eq!(distance(gct(), vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE), Some(1));
        assert_eq!(distance(gct(), gct()), Some(0));
        assert_eq!(
            distance(vk::QueueFlags::TRANSFER, vk::QueueFlags::TRANSFER),
            Some(0),
            "distance is zero exactly when flags are equal"
        );
    }

    #[test]
    fn specialized_family_wins() {
        // One do-everything family and one pure transfer family: a
        // transfer request must land on the specialized one.
        let mut families = vec![
            FamilySlot::new(0, gct(), 4),
            FamilySlot::new(1, vk::QueueFlags::TRANSFER, 4),
        ];
        let requests = [QueueRequest::new(vk::QueueFlags::TRANSFER)];
        let plan = allocate(&mut families, &requests, false).unwrap();
        assert_eq!(plan.writes, vec![QueueWrite { request: Some(0), family: 1, slot: 0 }]);
    }

    #[test]
    fn tie_breaks_to_lowest_index() {
        let mut families = vec![
            FamilySlot::new(0, gct(), 1),
            FamilySlot::new(1, gct(), 1),
        ];
        let requests = [QueueRequest::new(vk::QueueFlags::GRAPHICS)];
        let plan = allocate(&mut families, &requests, false).unwrap();
        assert_eq!(plan.writes[0].family, 0);
    }

    #[test]
    fn capacity_overflow_spills_to_next_family() {
        // 4 transfer-only requests plus one graphics+compute request.
        // The transfer requests drain the pure family (distance 0) first,
        // then spill to the combined one; graphics+compute only fits the
        // combined family.
        let mut families = vec![
            FamilySlot::new(0, gct(), 3),
            FamilySlot::new(1, vk::QueueFlags::TRANSFER, 2),
        ];
        let requests = [
            QueueRequest::new(vk::QueueFlags::TRANSFER),
            QueueRequest::new(vk::QueueFlags::TRANSFER),
            QueueRequest::new(vk::QueueFlags::TRANSFER),
            QueueRequest::new(vk::QueueFlags::TRANSFER),
            QueueRequest::new(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
        ];
        let plan = allocate(&mut families, &requests, false).unwrap();

        let family_of = |i: usize| plan.writes[i].family;
        assert_eq!(family_of(0), 1);
        assert_eq!(family_of(1), 1);
        assert_eq!(family_of(2), 0, "pure family exhausted, spill to combined");
        assert_eq!(family_of(3), 0);
        assert_eq!(family_of(4), 0, "graphics+compute only fits the combined family");

        assert_eq!(plan.queue_count(), 5);
        assert_eq!(plan.writes.len(), 5);
        assert_eq!(families[0].remaining, 0);
        assert_eq!(families[1].remaining, 0);
        // Slot indices within each family are dense from zero.
        assert_eq!(plan.writes[2].slot, 0);
        assert_eq!(plan.writes[3].slot, 1);
        assert_eq!(plan.writes[4].slot, 2);
    }

    #[test]
    fn excess_demand_fails() {
        let mut families = vec![FamilySlot::new(0, gct(), 1)];
        let requests = [
            QueueRequest::new(vk::QueueFlags::GRAPHICS),
            QueueRequest::new(vk::QueueFlags::GRAPHICS),
        ];
        assert!(matches!(
            allocate(&mut families, &requests, false),
            Err(Error::AllocationFailed)
        ));
    }

    #[test]
    fn unmatchable_flags_fail() {
        let mut families = vec![FamilySlot::new(0, vk::QueueFlags::TRANSFER, 8)];
        let requests = [QueueRequest::new(vk::QueueFlags::GRAPHICS)];
        assert!(allocate(&mut families, &requests, false).is_err());
    }

    #[test]
    fn strict_mode_rejects_supersets() {
        let mut families = vec![FamilySlot::new(0, gct(), 4)];
        let requests = [QueueRequest::new(vk::QueueFlags::TRANSFER).strict()];
        assert!(allocate(&mut families, &requests, false).is_err());

        let mut families = vec![
            FamilySlot::new(0, gct(), 4),
            FamilySlot::new(1, vk::QueueFlags::TRANSFER, 1),
        ];
        let requests = [QueueRequest::new(vk::QueueFlags::TRANSFER).strict()];
        let plan = allocate(&mut families, &requests, false).unwrap();
        assert_eq!(plan.writes[0].family, 1);
    }

    #[test]
    fn present_binds_opportunistically() {
        let mut families = vec![
            FamilySlot::new(0, gct(), 2).with_present(true),
            FamilySlot::new(1, vk::QueueFlags::TRANSFER, 2),
        ];
        let requests = [QueueRequest::new(vk::QueueFlags::GRAPHICS)];
        let plan = allocate(&mut families, &requests, true).unwrap();

        // The presentation binding reuses the graphics queue's slot and
        // consumes no extra capacity.
        assert_eq!(plan.writes.len(), 2);
        assert_eq!(plan.writes[1], QueueWrite { request: None, family: 0, slot: 0 });
        assert_eq!(plan.queue_count(), 1);
        assert_eq!(families[0].remaining, 1);
    }

    #[test]
    fn present_falls_back_to_independent_search() {
        // Requests land on family 1; only family 0 can present, so the
        // final scan must commit a dedicated present queue there.
        let mut families = vec![
            FamilySlot::new(0, gct(), 1).with_present(true),
            FamilySlot::new(1, vk::QueueFlags::TRANSFER, 1),
        ];
        let requests = [QueueRequest::new(vk::QueueFlags::TRANSFER)];
        let plan = allocate(&mut families, &requests, true).unwrap();

        assert_eq!(plan.writes.len(), 2);
        assert_eq!(plan.writes[1], QueueWrite { request: None, family: 0, slot: 0 });
        assert_eq!(plan.queue_count(), 2);
        assert_eq!(families[0].remaining, 0);
    }

    #[test]
    fn present_without_capable_family_fails() {
        let mut families = vec![FamilySlot::new(0, gct(), 4)];
        let requests = [QueueRequest::new(vk::QueueFlags::GRAPHICS)];
        assert!(matches!(
            allocate(&mut families, &requests, true),
            Err(Error::AllocationFailed)
        ));
    }

    #[test]
    fn group_counts_match_writes() {
        let mut families = vec![
            FamilySlot::new(0, gct(), 3),
            FamilySlot::new(1, vk::QueueFlags::TRANSFER, 1),
        ];
        let requests = [
            QueueRequest::new(vk::QueueFlags::GRAPHICS),
            QueueRequest::new(vk::QueueFlags::TRANSFER),
            QueueRequest::new(vk::QueueFlags::COMPUTE),
        ];
        let plan = allocate(&mut families, &requests, false).unwrap();
        assert_eq!(plan.queue_count(), plan.writes.len());

        // Only families that received an allocation get a group.
        for group in &plan.groups {
            assert!(!group.priorities.is_empty());
        }
    }

    #[test]
    fn priority_override_is_carried_per_queue() {
        let mut families = vec![FamilySlot::new(0, gct(), 2)];
        let requests = [
            QueueRequest::new(vk::QueueFlags::GRAPHICS).priority(0.5),
            QueueRequest::new(vk::QueueFlags::COMPUTE),
        ];
        let plan = allocate(&mut families, &requests, false).unwrap();
        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[0].priorities, vec![0.5, DEFAULT_QUEUE_PRIORITY]);
    }

    #[test]
    fn request_order_decides_placement() {
        // Greedy matching is order-sensitive by contract: the same request
        // multiset can succeed in one order and fail in another. A plain
        // graphics request ties between both families and takes the lower
        // index, which is the only home the graphics+compute request has.
        let make_families = || {
            vec![
                FamilySlot::new(0, vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 1),
                FamilySlot::new(1, vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, 1),
            ]
        };

        let bad_order = [
            QueueRequest::new(vk::QueueFlags::GRAPHICS),
            QueueRequest::new(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
        ];
        assert!(allocate(&mut make_families(), &bad_order, false).is_err());

        let good_order = [
            QueueRequest::new(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
            QueueRequest::new(vk::QueueFlags::GRAPHICS),
        ];
        let plan = allocate(&mut make_families(), &good_order, false).unwrap();
        assert_eq!(plan.writes[0].family, 0);
        assert_eq!(plan.writes[1].family, 1);
    }
}
