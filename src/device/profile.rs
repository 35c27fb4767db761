//! Queried snapshots of physical accelerators.
//!
//! Everything the suitability filters and the queue allocator need is
//! gathered here in one pass per device and handed on as plain data, so
//! the rest of the pipeline never touches the driver. A profile is a
//! snapshot: it is re-queried for each selection or construction pass,
//! never cached across them.

use ash::vk;

use crate::error::Error;
use crate::instance::Instance;

/// One queue family as reported by the driver, plus whether it can
/// present to the surface the profile was gathered against (always false
/// when no surface was given).
#[derive(Clone, Copy, Debug)]
pub struct QueueFamilyInfo {
    pub index: u32,
    pub flags: vk::QueueFlags,
    pub queue_count: u32,
    pub supports_present: bool,
}

/// Plain-data snapshot of one physical accelerator.
#[derive(Clone, Debug)]
pub struct DeviceProfile {
    pub device: vk::PhysicalDevice,
    pub name: String,
    pub api_version: u32,
    pub kind: vk::PhysicalDeviceType,
    pub features: vk::PhysicalDeviceFeatures,
    /// Device-level extension names, lossily decoded.
    pub extensions: Vec<String>,
    pub families: Vec<QueueFamilyInfo>,
}

impl DeviceProfile {
    /// Queries one accelerator. Presentation support is resolved per
    /// family against `surface` when one is given.
    pub fn query(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface: Option<vk::SurfaceKHR>,
    ) -> Result<Self, Error> {
        let handle = instance.handle();

        // SAFETY: `device` was enumerated from this instance.
        let properties = unsafe { handle.get_physical_device_properties(device) };
        let features = unsafe { handle.get_physical_device_features(device) };
        let family_properties =
            unsafe { handle.get_physical_device_queue_family_properties(device) };
        let extension_properties =
            unsafe { handle.enumerate_device_extension_properties(device)? };

        let name = properties
            .device_name_as_c_str()
            .unwrap_or(c"unknown")
            .to_string_lossy()
            .into_owned();

        let extensions = extension_properties
            .iter()
            .filter_map(|ext| ext.extension_name_as_c_str().ok())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();

        let surface_fns = surface.map(|_| instance.surface_fns());
        let mut families = Vec::with_capacity(family_properties.len());
        for (index, props) in family_properties.iter().enumerate() {
            let index = index as u32;
            let supports_present = match (&surface_fns, surface) {
                (Some(fns), Some(surface)) => unsafe {
                    // SAFETY: device and surface both derive from this
                    // instance; the index is in range by construction.
                    fns.get_physical_device_surface_support(device, index, surface)?
                },
                _ => false,
            };
            families.push(QueueFamilyInfo {
                index,
                flags: props.queue_flags,
                queue_count: props.queue_count,
                supports_present,
            });
        }

        Ok(DeviceProfile {
            device,
            name,
            api_version: properties.api_version,
            kind: properties.device_type,
            features,
            extensions,
            families,
        })
    }

    /// Snapshots every accelerator the runtime reports, in enumeration
    /// order.
    pub fn enumerate(
        instance: &Instance,
        surface: Option<vk::SurfaceKHR>,
    ) -> Result<Vec<Self>, Error> {
        // SAFETY: the instance handle is valid for its own lifetime.
        let devices = unsafe { instance.handle().enumerate_physical_devices()? };
        devices
            .into_iter()
            .map(|device| DeviceProfile::query(instance, device, surface))
            .collect()
    }
}
