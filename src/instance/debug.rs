//! Debug-utils messenger plumbing.
//!
//! The driver invokes the messenger callback asynchronously, possibly
//! from its own internal threads; nothing else in the crate reads or
//! depends on diagnostic state.

use std::ffi::{c_void, CStr};

use ash::vk;

/// Fallback callback wired in when the builder does not supply one:
/// forwards driver messages to `tracing` at the matching level.
unsafe extern "system" fn default_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_types: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    let message = if callback_data.is_null() || (*callback_data).p_message.is_null() {
        std::borrow::Cow::Borrowed("")
    } else {
        CStr::from_ptr((*callback_data).p_message).to_string_lossy()
    };

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        tracing::error!(target: "ignition::vulkan", "{message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        tracing::warn!(target: "ignition::vulkan", "{message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        tracing::info!(target: "ignition::vulkan", "{message}");
    } else {
        tracing::debug!(target: "ignition::vulkan", "{message}");
    }

    // Never abort the triggering call.
    vk::FALSE
}

pub(crate) fn messenger_create_info(
    message_types: vk::DebugUtilsMessageTypeFlagsEXT,
    callback: vk::PFN_vkDebugUtilsMessengerCallbackEXT,
) -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    let callback = callback.unwrap_or(default_callback);
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(message_types)
        .pfn_user_callback(Some(callback))
}
