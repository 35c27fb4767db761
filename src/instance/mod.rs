//! Runtime connection: instance building and teardown.
//!
//! [`InstanceBuilder`] negotiates an API version, checks every requested
//! layer and extension against the runtime catalog before creating
//! anything, and optionally registers a debug messenger. The resulting
//! [`Instance`] owns the connection; logical devices derived from it must
//! be destroyed before it drops.

mod debug;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use ash::vk;
use tracing::info;

use crate::catalog;
use crate::error::Error;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Process-wide connection to the Vulkan runtime.
pub struct Instance {
    entry: ash::Entry,
    handle: ash::Instance,
    debug: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    api_version: u32,
}

impl Instance {
    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    pub fn handle(&self) -> &ash::Instance {
        &self.handle
    }

    /// The API version the instance was created with.
    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    /// True when the validation layer and messenger are active.
    pub fn validation_enabled(&self) -> bool {
        self.debug.is_some()
    }

    pub(crate) fn surface_fns(&self) -> ash::khr::surface::Instance {
        ash::khr::surface::Instance::new(&self.entry, &self.handle)
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("handle", &self.handle.handle())
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        // Messenger first, then the instance itself. Logical devices are
        // the caller's to destroy before this point.
        if let Some((fns, messenger)) = self.debug.take() {
            // SAFETY: the messenger was created from this instance.
            unsafe { fns.destroy_debug_utils_messenger(messenger, None) };
        }
        // SAFETY: all objects this crate created from the instance are
        // gone; remaining teardown ordering is the caller's contract.
        unsafe { self.handle.destroy_instance(None) };
    }
}

/// Criteria for building an [`Instance`]. The zero value is a usable
/// default: latest available version, no layers, no extensions, no
/// validation.
#[derive(Debug)]
pub struct InstanceBuilder {
    pub app_name: String,
    pub engine_name: String,
    pub application_version: u32,
    /// Floor: the runtime must report at least this; the instance is
    /// created with whatever the runtime reports.
    pub minimum_api_version: u32,
    /// Strict: the runtime must report at least this; the instance is
    /// created with exactly this. Takes precedence over the floor.
    pub required_api_version: u32,
    /// Adds the Khronos validation layer, the debug-utils extension, and
    /// a messenger.
    pub request_validation_layers: bool,
    /// Message classes delivered to the messenger.
    pub message_types: vk::DebugUtilsMessageTypeFlagsEXT,
    /// Messenger callback; `None` selects the crate default, which
    /// forwards to `tracing`.
    pub messenger_callback: vk::PFN_vkDebugUtilsMessengerCallbackEXT,
    pub layers: Vec<CString>,
    pub extensions: Vec<CString>,
}

impl Default for InstanceBuilder {
    fn default() -> Self {
        InstanceBuilder {
            app_name: String::new(),
            engine_name: String::new(),
            application_version: 0,
            minimum_api_version: 0,
            required_api_version: 0,
            request_validation_layers: false,
            message_types: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            messenger_callback: None,
            layers: Vec::new(),
            extensions: Vec::new(),
        }
    }
}

impl InstanceBuilder {
    pub fn new() -> Self {
        InstanceBuilder::default()
    }

    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = name.to_owned();
        self
    }

    pub fn engine_name(mut self, name: &str) -> Self {
        self.engine_name = name.to_owned();
        self
    }

    pub fn application_version(mut self, version: u32) -> Self {
        self.application_version = version;
        self
    }

    pub fn minimum_api_version(mut self, version: u32) -> Self {
        self.minimum_api_version = version;
        self
    }

    pub fn require_api_version(mut self, version: u32) -> Self {
        self.required_api_version = version;
        self
    }

    pub fn request_validation_layers(mut self) -> Self {
        self.request_validation_layers = true;
        self
    }

    pub fn messenger_callback(mut self, callback: vk::PFN_vkDebugUtilsMessengerCallbackEXT) -> Self {
        self.messenger_callback = callback;
        self
    }

    pub fn request_layer(mut self, name: &CStr) -> Self {
        self.layers.push(name.to_owned());
        self
    }

    pub fn request_extension(mut self, name: &CStr) -> Self {
        self.extensions.push(name.to_owned());
        self
    }

    /// Loads the Vulkan runtime library and builds the instance.
    pub fn build(self) -> Result<Instance, Error> {
        // SAFETY: loading the loader library has no preconditions we can
        // check; failure is reported, not unwound.
        let entry = unsafe { ash::Entry::load()? };
        self.build_with_entry(entry)
    }

    /// Builds against an already-loaded entry.
    pub fn build_with_entry(self, entry: ash::Entry) -> Result<Instance, Error> {
        // SAFETY: entry points are valid for the entry's lifetime.
        let reported = unsafe { entry.try_enumerate_instance_version()? }
            .unwrap_or(vk::API_VERSION_1_0);
        let api_version =
            negotiate_version(self.required_api_version, self.minimum_api_version, reported)?;

        let mut layers = self.layers;
        let mut extensions = self.extensions;
        if self.request_validation_layers {
            layers.push(VALIDATION_LAYER.to_owned());
            extensions.push(ash::ext::debug_utils::NAME.to_owned());
        }

        // Fail fast: both catalogs are checked before anything is created.
        let supported_layers: Vec<CString> =
            unsafe { entry.enumerate_instance_layer_properties()? }
                .iter()
                .filter_map(|layer| layer.layer_name_as_c_str().ok())
                .map(CStr::to_owned)
                .collect();
        if let Some(missing) = catalog::missing_name(&layers, &supported_layers) {
            return Err(Error::ExtensionOrLayerUnsupported(
                missing.to_string_lossy().into_owned(),
            ));
        }

        let supported_extensions: Vec<CString> =
            unsafe { entry.enumerate_instance_extension_properties(None)? }
                .iter()
                .filter_map(|ext| ext.extension_name_as_c_str().ok())
                .map(CStr::to_owned)
                .collect();
        if let Some(missing) = catalog::missing_name(&extensions, &supported_extensions) {
            return Err(Error::ExtensionOrLayerUnsupported(
                missing.to_string_lossy().into_owned(),
            ));
        }

        let app_name = CString::new(self.app_name).unwrap_or_default();
        let engine_name = CString::new(self.engine_name).unwrap_or_default();
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .engine_name(&engine_name)
            .application_version(self.application_version)
            .api_version(api_version);

        let layer_ptrs: Vec<*const c_char> = layers.iter().map(|name| name.as_ptr()).collect();
        let extension_ptrs: Vec<*const c_char> =
            extensions.iter().map(|name| name.as_ptr()).collect();
        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extension_ptrs);

        // SAFETY: create_info's referents all outlive the call.
        let handle = unsafe { entry.create_instance(&create_info, None)? };

        let debug = if self.request_validation_layers {
            let fns = ash::ext::debug_utils::Instance::new(&entry, &handle);
            let messenger_info =
                debug::messenger_create_info(self.message_types, self.messenger_callback);
            // SAFETY: the instance was just created with debug-utils
            // enabled.
            match unsafe { fns.create_debug_utils_messenger(&messenger_info, None) } {
                Ok(messenger) => Some((fns, messenger)),
                Err(err) => {
                    // A half-built instance is torn down, not returned.
                    unsafe { handle.destroy_instance(None) };
                    return Err(Error::DriverCallFailed(err));
                }
            }
        } else {
            None
        };

        let validation_enabled = debug.is_some();
        info!(
            validation = validation_enabled,
            "created instance with api version {}.{}.{}",
            vk::api_version_major(api_version),
            vk::api_version_minor(api_version),
            vk::api_version_patch(api_version)
        );

        Ok(Instance {
            entry,
            handle,
            debug,
            api_version,
        })
    }
}

/// Resolves the version to create the instance with. Strict requirement
/// wins over the floor; with neither, whatever the runtime reports is
/// used as-is.
fn negotiate_version(required: u32, minimum: u32, reported: u32) -> Result<u32, Error> {
    if required != 0 {
        if reported < required {
            return Err(Error::VersionUnsupported {
                required,
                found: reported,
            });
        }
        Ok(required)
    } else if minimum != 0 {
        if reported < minimum {
            return Err(Error::VersionUnsupported {
                required: minimum,
                found: reported,
            });
        }
        Ok(reported)
    } else {
        Ok(reported)
    }
}
