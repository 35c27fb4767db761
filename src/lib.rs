//! Vulkan bootstrap: instance setup, device selection, and queue
//! allocation.
//!
//! The crate sits directly above the driver. It enumerates the physical
//! accelerators the runtime reports, filters them against hard caller
//! requirements, deterministically assigns queue requests to queue
//! families under finite capacity, and opens a logical device with the
//! resulting queues bound to caller-supplied destinations.
//!
//! Everything is synchronous and call-local: no operation suspends, no
//! state is shared across calls, and every call either fully completes
//! or fully fails without touching caller-visible output. Access to one
//! [`Instance`] from multiple threads is the caller's to serialize.

pub mod catalog;
pub mod device;
pub mod error;
pub mod format;
pub mod instance;

pub use device::build::{DeviceBuilder, PresentRequest};
pub use device::features::supports_features;
pub use device::profile::{DeviceProfile, QueueFamilyInfo};
pub use device::queue::{
    allocate, distance, AllocationPlan, FamilySlot, QueueGroup, QueueRequest, QueueWrite,
    SelectMode, DEFAULT_QUEUE_PRIORITY,
};
pub use device::select::{filter_candidates, Candidate, PhysicalDeviceSelector};
pub use error::Error;
pub use format::FormatQuery;
pub use instance::{Instance, InstanceBuilder};
