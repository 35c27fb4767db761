//! Logical-device construction.
//!
//! Re-runs the queue allocation for real against a freshly queried family
//! table, creates the device, then binds the resulting queue handles to
//! the caller's destinations. Destinations are written if and only if the
//! whole call succeeds: an allocation or driver failure returns with
//! every destination still holding its pre-call value.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use ash::vk;
use tracing::info;

use crate::device::queue::{allocate, AllocationPlan, FamilySlot, QueueRequest};
use crate::error::Error;
use crate::instance::Instance;

/// Asks construction to also produce a queue able to present to
/// `surface`, bound to `destination`. The presentation queue may alias a
/// queue already bound to a request.
#[derive(Debug)]
pub struct PresentRequest<'a> {
    pub surface: vk::SurfaceKHR,
    pub destination: &'a mut vk::Queue,
}

/// Everything needed to open a logical device on an already-selected
/// accelerator.
#[derive(Debug, Default)]
pub struct DeviceBuilder<'a> {
    /// Queues to create; each must carry a destination.
    pub queue_requests: Vec<QueueRequest<'a>>,
    pub present: Option<PresentRequest<'a>>,
    /// Feature set to enable on the device.
    pub features: vk::PhysicalDeviceFeatures,
    /// Device extensions to enable.
    pub extensions: Vec<CString>,
}

impl<'a> DeviceBuilder<'a> {
    pub fn new() -> Self {
        DeviceBuilder::default()
    }

    pub fn request_queue(mut self, request: QueueRequest<'a>) -> Self {
        self.queue_requests.push(request);
        self
    }

    pub fn present_to(mut self, surface: vk::SurfaceKHR, destination: &'a mut vk::Queue) -> Self {
        self.present = Some(PresentRequest {
            surface,
            destination,
        });
        self
    }

    pub fn enable_features(mut self, features: vk::PhysicalDeviceFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn enable_extension(mut self, name: &CStr) -> Self {
        self.extensions.push(name.to_owned());
        self
    }

    /// Opens the logical device and binds every requested queue.
    ///
    /// The family table is re-queried here: a selection pass's capacity
    /// view is never reused, so allocation always starts from unconsumed
    /// capacity.
    pub fn create(
        mut self,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Result<ash::Device, Error> {
        check_present_surface(&self.present)?;

        let handle = instance.handle();
        // SAFETY: `physical_device` was enumerated from this instance.
        let family_properties =
            unsafe { handle.get_physical_device_queue_family_properties(physical_device) };

        let surface_fns = self.present.as_ref().map(|_| instance.surface_fns());
        let mut slots = Vec::with_capacity(family_properties.len());
        for (index, props) in family_properties.iter().enumerate() {
            let index = index as u32;
            let supports_present = match (&surface_fns, &self.present) {
                (Some(fns), Some(present)) => unsafe {
                    // SAFETY: device and surface derive from this instance.
                    fns.get_physical_device_surface_support(
                        physical_device,
                        index,
                        present.surface,
                    )?
                },
                _ => false,
            };
            slots.push(
                FamilySlot::new(index, props.queue_flags, props.queue_count)
                    .with_present(supports_present),
            );
        }

        let plan = allocate(&mut slots, &self.queue_requests, self.present.is_some())?;

        let queue_infos: Vec<vk::DeviceQueueCreateInfo<'_>> = plan
            .groups
            .iter()
            .map(|group| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(group.family)
                    .queue_priorities(&group.priorities)
            })
            .collect();
        let extension_ptrs: Vec<*const c_char> =
            self.extensions.iter().map(|name| name.as_ptr()).collect();
        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_ptrs)
            .enabled_features(&self.features);

        // SAFETY: create_info's referents all outlive the call.
        let device = unsafe { handle.create_device(physical_device, &create_info, None)? };

        let present_destination = self.present.take().map(|present| present.destination);
        bind_queues(
            &plan,
            &mut self.queue_requests,
            present_destination,
            |family, slot| {
                // SAFETY: (family, slot) pairs come from the plan the
                // device was just created with.
                unsafe { device.get_device_queue(family, slot) }
            },
        );

        info!(
            queues = plan.queue_count(),
            families = plan.groups.len(),
            "created logical device"
        );
        Ok(device)
    }
}

/// Presentation with no surface to present to can never be satisfied;
/// reject it before touching the driver.
fn check_present_surface(present: &Option<PresentRequest<'_>>) -> Result<(), Error> {
    match present {
        Some(request) if request.surface == vk::SurfaceKHR::null() => Err(Error::AllocationFailed),
        _ => Ok(()),
    }
}

/// Writes every planned queue into its destination. Runs only after the
/// driver reported success, which is what makes the all-or-nothing
/// destination contract hold.
fn bind_queues(
    plan: &AllocationPlan,
    requests: &mut [QueueRequest<'_>],
    mut present_destination: Option<&mut vk::Queue>,
    mut fetch: impl FnMut(u32, u32) -> vk::Queue,
) {
    for write in &plan.writes {
        let queue = fetch(write.family, write.slot);
        match write.request {
            Some(index) => {
                if let Some(destination) = requests[index].destination.as_mut() {
                    **destination = queue;
                }
            }
            None => {
                if let Some(destination) = present_destination.take() {
                    *destination = queue;
                }
            }
        }
    }
}
