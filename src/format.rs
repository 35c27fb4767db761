//! Pixel-format capability queries.
//!
//! Thin linear scans over a caller-given candidate list: each format's
//! reported tiling/buffer features are checked against the query, first
//! match or all matches returned.

use ash::vk;

use crate::instance::Instance;

/// Features a format must support, split by how the image or buffer is
/// tiled. Empty flags impose no constraint on that use.
#[derive(Clone, Copy, Debug, Default)]
pub struct FormatQuery {
    pub linear_tiling: vk::FormatFeatureFlags,
    pub optimal_tiling: vk::FormatFeatureFlags,
    pub buffer: vk::FormatFeatureFlags,
}

impl FormatQuery {
    /// True when the reported properties satisfy every requested feature.
    pub fn matches(&self, properties: &vk::FormatProperties) -> bool {
        properties.linear_tiling_features.contains(self.linear_tiling)
            && properties.optimal_tiling_features.contains(self.optimal_tiling)
            && properties.buffer_features.contains(self.buffer)
    }

    /// First candidate satisfying the query, in candidate order.
    pub fn first_match(
        &self,
        instance: &Instance,
        device: vk::PhysicalDevice,
        candidates: &[vk::Format],
    ) -> Option<vk::Format> {
        candidates
            .iter()
            .copied()
            .find(|&format| self.matches(&query_properties(instance, device, format)))
    }

    /// Every candidate satisfying the query, in candidate order.
    pub fn all_matches(
        &self,
        instance: &Instance,
        device: vk::PhysicalDevice,
        candidates: &[vk::Format],
    ) -> Vec<vk::Format> {
        candidates
            .iter()
            .copied()
            .filter(|&format| self.matches(&query_properties(instance, device, format)))
            .collect()
    }
}

fn query_properties(
    instance: &Instance,
    device: vk::PhysicalDevice,
    format: vk::Format,
) -> vk::FormatProperties {
    // SAFETY: `device` was enumerated from this instance.
    unsafe {
        instance
            .handle()
            .get_physical_device_format_properties(device, format)
    }
}
