//! Physical-device suitability filtering and selection.
//!
//! Each criterion is an independent predicate that can only flip a
//! candidate from suitable to unsuitable. The predicates are monotonic
//! and idempotent, so their order never changes the suitable/unsuitable
//! outcome. It only decides which rejection gets logged first.

use ash::vk;
use tracing::{debug, info};

use crate::catalog;
use crate::device::features::supports_features;
use crate::device::profile::DeviceProfile;
use crate::device::queue::{allocate, FamilySlot, QueueRequest};
use crate::error::Error;
use crate::instance::Instance;

/// One enumerated accelerator moving through the filter pipeline.
///
/// Candidates are never removed from the list, only marked unsuitable,
/// so callers can still see every device and why it fell out.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub profile: DeviceProfile,
    pub suitable: bool,
}

impl Candidate {
    pub fn new(profile: DeviceProfile) -> Self {
        Candidate {
            profile,
            suitable: true,
        }
    }
}

/// Hard requirements a physical accelerator must meet to be selected.
///
/// Plain criteria record: build it once per selection call, fill only the
/// fields that matter. Zero/empty fields impose no constraint.
#[derive(Debug, Default)]
pub struct PhysicalDeviceSelector<'a> {
    /// Devices reporting an API version below this are rejected.
    pub minimum_version: u32,
    /// Surface that presentation-capable families are checked against.
    pub surface: Option<vk::SurfaceKHR>,
    /// Reject devices with no family able to present to `surface`.
    pub require_present_queue: bool,
    /// The queue set a device must be able to host. Destinations are
    /// ignored here; only feasibility is tested.
    pub required_queues: Vec<QueueRequest<'a>>,
    /// Device extensions that must all be supported (exact names).
    pub required_extensions: Vec<String>,
    /// Feature bits that must all be reported supported.
    pub required_features: vk::PhysicalDeviceFeatures,
    /// Accepted device kinds; empty accepts every kind.
    pub required_kinds: Vec<vk::PhysicalDeviceType>,
    /// Declared preference among suitable devices. Not yet applied:
    /// selection stays in enumeration order.
    /// TODO: rank suitable candidates by `preferred_kind` before falling
    /// back to enumeration order.
    pub preferred_kind: Option<vk::PhysicalDeviceType>,
}

fn check_version(profile: &DeviceProfile, selector: &PhysicalDeviceSelector<'_>) -> bool {
    profile.api_version >= selector.minimum_version
}

fn check_present(profile: &DeviceProfile, selector: &PhysicalDeviceSelector<'_>) -> bool {
    if !selector.require_present_queue || selector.surface.is_none() {
        return true;
    }
    profile.families.iter().any(|family| family.supports_present)
}

fn check_queues(profile: &DeviceProfile, selector: &PhysicalDeviceSelector<'_>) -> bool {
    // Dry run on a disposable capacity table; the mutations are dropped
    // with it.
    let mut slots: Vec<FamilySlot> = profile.families.iter().map(FamilySlot::from).collect();
    allocate(&mut slots, &selector.required_queues, false).is_ok()
}

fn check_extensions(profile: &DeviceProfile, selector: &PhysicalDeviceSelector<'_>) -> bool {
    catalog::supports_all(&selector.required_extensions, &profile.extensions)
}

fn check_features(profile: &DeviceProfile, selector: &PhysicalDeviceSelector<'_>) -> bool {
    supports_features(&selector.required_features, &profile.features)
}

fn check_kind(profile: &DeviceProfile, selector: &PhysicalDeviceSelector<'_>) -> bool {
    selector.required_kinds.is_empty() || selector.required_kinds.contains(&profile.kind)
}

type Check = fn(&DeviceProfile, &PhysicalDeviceSelector<'_>) -> bool;

const CHECKS: &[(&str, Check)] = &[
    ("api version", check_version),
    ("presentation", check_present),
    ("queue feasibility", check_queues),
    ("extensions", check_extensions),
    ("features", check_features),
    ("device kind", check_kind),
];

/// Runs every criterion over every candidate, flipping `suitable` in
/// place. Already-unsuitable candidates are skipped; per candidate, the
/// first failing criterion short-circuits the rest.
pub fn filter_candidates(candidates: &mut [Candidate], selector: &PhysicalDeviceSelector<'_>) {
    for candidate in candidates.iter_mut() {
        if !candidate.suitable {
            continue;
        }
        for (criterion, check) in CHECKS {
            if !check(&candidate.profile, selector) {
                debug!(
                    device = %candidate.profile.name,
                    %criterion,
                    "candidate rejected"
                );
                candidate.suitable = false;
                break;
            }
        }
    }
}

impl PhysicalDeviceSelector<'_> {
    /// Picks the first suitable accelerator in enumeration order.
    pub fn select(&self, instance: &Instance) -> Result<vk::PhysicalDevice, Error> {
        let profiles = DeviceProfile::enumerate(instance, self.surface)?;
        let mut candidates: Vec<Candidate> = profiles.into_iter().map(Candidate::new).collect();
        filter_candidates(&mut candidates, self);

        let chosen = candidates
            .iter()
            .find(|candidate| candidate.suitable)
            .ok_or(Error::NoSuitableDevice)?;
        info!(
            device = %chosen.profile.name,
            kind = ?chosen.profile.kind,
            "selected physical device"
        );
        Ok(chosen.profile.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::profile::QueueFamilyInfo;

    fn family(index: u32, flags: vk::QueueFlags, count: u32, present: bool) -> QueueFamilyInfo {
        QueueFamilyInfo {
            index,
            flags,
            queue_count: count,
            supports_present: present,
        }
    }

    fn profile(api_version: u32, kind: vk::PhysicalDeviceType) -> DeviceProfile {
        DeviceProfile {
            device: vk::PhysicalDevice::null(),
            name: "fake".into(),
            api_version,
            kind,
            features: vk::PhysicalDeviceFeatures::default(),
            extensions: vec!["VK_KHR_swapchain".into()],
            families: vec![family(
                0,
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
                4,
                false,
            )],
        }
    }

    fn candidates_of(profiles: Vec<DeviceProfile>) -> Vec<Candidate> {
        profiles.into_iter().map(Candidate::new).collect()
    }

    #[test]
    fn version_floor_rejects_every_candidate() {
        let selector = PhysicalDeviceSelector {
            minimum_version: vk::make_api_version(0, 1, 3, 0),
            ..Default::default()
        };
        let mut candidates = candidates_of(vec![
            profile(vk::make_api_version(0, 1, 1, 0), vk::PhysicalDeviceType::DISCRETE_GPU),
            profile(vk::make_api_version(0, 1, 2, 200), vk::PhysicalDeviceType::CPU),
        ]);
        filter_candidates(&mut candidates, &selector);
        assert!(candidates.iter().all(|c| !c.suitable));
        assert_eq!(candidates.len(), 2, "filtering never removes entries");
    }

    #[test]
    fn first_suitable_candidate_wins_in_enumeration_order() {
        let selector = PhysicalDeviceSelector {
            minimum_version: vk::make_api_version(0, 1, 2, 0),
            ..Default::default()
        };
        let mut candidates = candidates_of(vec![
            profile(vk::make_api_version(0, 1, 0, 0), vk::PhysicalDeviceType::DISCRETE_GPU),
            profile(vk::make_api_version(0, 1, 2, 0), vk::PhysicalDeviceType::INTEGRATED_GPU),
            profile(vk::make_api_version(0, 1, 3, 0), vk::PhysicalDeviceType::DISCRETE_GPU),
        ]);
        filter_candidates(&mut candidates, &selector);
        let first = candidates.iter().position(|c| c.suitable);
        assert_eq!(first, Some(1));
    }

    #[test]
    fn filtering_is_idempotent() {
        let selector = PhysicalDeviceSelector {
            minimum_version: vk::make_api_version(0, 1, 1, 0),
            required_kinds: vec![vk::PhysicalDeviceType::DISCRETE_GPU],
            ..Default::default()
        };
        let mut once = candidates_of(vec![
            profile(vk::make_api_version(0, 1, 1, 0), vk::PhysicalDeviceType::DISCRETE_GPU),
            profile(vk::make_api_version(0, 1, 1, 0), vk::PhysicalDeviceType::CPU),
        ]);
        filter_candidates(&mut once, &selector);
        let verdicts: Vec<bool> = once.iter().map(|c| c.suitable).collect();

        filter_candidates(&mut once, &selector);
        let again: Vec<bool> = once.iter().map(|c| c.suitable).collect();
        assert_eq!(verdicts, again);
        assert_eq!(verdicts, vec![true, false]);
    }

    #[test]
    fn missing_extension_rejects() {
        let selector = PhysicalDeviceSelector {
            required_extensions: vec!["VK_EXT_mesh_shader".into()],
            ..Default::default()
        };
        let mut candidates =
            candidates_of(vec![profile(0, vk::PhysicalDeviceType::DISCRETE_GPU)]);
        filter_candidates(&mut candidates, &selector);
        assert!(!candidates[0].suitable);
    }

    #[test]
    fn missing_feature_rejects() {
        let selector = PhysicalDeviceSelector {
            required_features: vk::PhysicalDeviceFeatures {
                tessellation_shader: vk::TRUE,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut candidates =
            candidates_of(vec![profile(0, vk::PhysicalDeviceType::DISCRETE_GPU)]);
        filter_candidates(&mut candidates, &selector);
        assert!(!candidates[0].suitable);
    }

    #[test]
    fn kind_constraint_is_membership() {
        let selector = PhysicalDeviceSelector {
            required_kinds: vec![
                vk::PhysicalDeviceType::DISCRETE_GPU,
                vk::PhysicalDeviceType::INTEGRATED_GPU,
            ],
            ..Default::default()
        };
        let mut candidates = candidates_of(vec![
            profile(0, vk::PhysicalDeviceType::CPU),
            profile(0, vk::PhysicalDeviceType::INTEGRATED_GPU),
        ]);
        filter_candidates(&mut candidates, &selector);
        assert!(!candidates[0].suitable);
        assert!(candidates[1].suitable);
    }

    #[test]
    fn infeasible_queue_demand_rejects_without_mutating_profile() {
        let selector = PhysicalDeviceSelector {
            required_queues: vec![
                QueueRequest::new(vk::QueueFlags::GRAPHICS),
                QueueRequest::new(vk::QueueFlags::GRAPHICS),
                QueueRequest::new(vk::QueueFlags::GRAPHICS),
            ],
            ..Default::default()
        };
        let mut prof = profile(0, vk::PhysicalDeviceType::DISCRETE_GPU);
        prof.families = vec![family(0, vk::QueueFlags::GRAPHICS, 2, false)];
        let mut candidates = candidates_of(vec![prof]);
        filter_candidates(&mut candidates, &selector);
        assert!(!candidates[0].suitable);
        // The dry run worked on a copy: the reported capacity is intact.
        assert_eq!(candidates[0].profile.families[0].queue_count, 2);
    }

    #[test]
    fn present_requirement_needs_a_capable_family() {
        // Surface handle value is irrelevant to the pure filter; the
        // per-family support flags were resolved at query time.
        let surface = vk::SurfaceKHR::null();
        let selector = PhysicalDeviceSelector {
            surface: Some(surface),
            require_present_queue: true,
            ..Default::default()
        };

        let no_present = profile(0, vk::PhysicalDeviceType::DISCRETE_GPU);
        let mut with_present = profile(0, vk::PhysicalDeviceType::DISCRETE_GPU);
        with_present.families[0].supports_present = true;

        let mut candidates = candidates_of(vec![no_present, with_present]);
        filter_candidates(&mut candidates, &selector);
        assert!(!candidates[0].suitable);
        assert!(candidates[1].suitable);
    }

    #[test]
    fn present_requirement_without_surface_is_inert_in_filtering() {
        let selector = PhysicalDeviceSelector {
            require_present_queue: true,
            ..Default::default()
        };
        let mut candidates =
            candidates_of(vec![profile(0, vk::PhysicalDeviceType::DISCRETE_GPU)]);
        filter_candidates(&mut candidates, &selector);
        assert!(candidates[0].suitable);
    }
}
