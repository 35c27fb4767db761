use ash::vk;

/// Every failure the bootstrap layer can report.
///
/// Nothing in this crate panics or retries: each operation returns exactly
/// one of these and leaves caller-visible state untouched on failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The Vulkan loader library could not be found or loaded.
    #[error("vulkan runtime unavailable: {0}")]
    RuntimeUnavailable(#[from] ash::LoadingError),

    /// The runtime (or a device) reports an API version below a strict
    /// requirement.
    #[error("api version {} below required {}", fmt_version(.found), fmt_version(.required))]
    VersionUnsupported { required: u32, found: u32 },

    /// Every enumerated accelerator failed at least one selection criterion.
    #[error("no physical device satisfied the selection criteria")]
    NoSuitableDevice,

    /// No feasible queue-family assignment exists for the requested queue
    /// set, presentation included.
    #[error("no feasible queue family assignment for the requested queues")]
    AllocationFailed,

    /// A requested layer or extension is absent from the runtime catalog.
    #[error("unsupported extension or layer: {0}")]
    ExtensionOrLayerUnsupported(String),

    /// A native creation or query call returned a non-success status.
    #[error("vulkan call failed: {0}")]
    DriverCallFailed(#[from] vk::Result),
}

/// Renders a packed Vulkan version as `major.minor.patch`.
fn fmt_version(version: &u32) -> String {
    format!(
        "{}.{}.{}",
        vk::api_version_major(*version),
        vk::api_version_minor(*version),
        vk::api_version_patch(*version)
    )
}
