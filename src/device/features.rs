//! Core feature-set implication check.

use ash::vk;

fn implied(required: vk::Bool32, available: vk::Bool32) -> bool {
    required == vk::FALSE || available != vk::FALSE
}

/// True when every feature bit set in `required` is reported in
/// `available`. Each flag is independent; this is a plain per-bit
/// implication over the whole Vulkan 1.0 feature struct.
pub fn supports_features(
    required: &vk::PhysicalDeviceFeatures,
    available: &vk::PhysicalDeviceFeatures,
) -> bool {
    implied(required.robust_buffer_access, available.robust_buffer_access)
        && implied(required.full_draw_index_uint32, available.full_draw_index_uint32)
        && implied(required.image_cube_array, available.image_cube_array)
        && implied(required.independent_blend, available.independent_blend)
        && implied(required.geometry_shader, available.geometry_shader)
        && implied(required.tessellation_shader, available.tessellation_shader)
        && implied(required.sample_rate_shading, available.sample_rate_shading)
        && implied(required.dual_src_blend, available.dual_src_blend)
        && implied(required.logic_op, available.logic_op)
        && implied(required.multi_draw_indirect, available.multi_draw_indirect)
        && implied(
            required.draw_indirect_first_instance,
            available.draw_indirect_first_instance,
        )
        && implied(required.depth_clamp, available.depth_clamp)
        && implied(required.depth_bias_clamp, available.depth_bias_clamp)
        && implied(required.fill_mode_non_solid, available.fill_mode_non_solid)
        && implied(required.depth_bounds, available.depth_bounds)
        && implied(required.wide_lines, available.wide_lines)
        && implied(required.large_points, available.large_points)
        && implied(required.alpha_to_one, available.alpha_to_one)
        && implied(required.multi_viewport, available.multi_viewport)
        && implied(required.sampler_anisotropy, available.sampler_anisotropy)
        && implied(required.texture_compression_etc2, available.texture_compression_etc2)
        && implied(
            required.texture_compression_astc_ldr,
            available.texture_compression_astc_ldr,
        )
        && implied(required.texture_compression_bc, available.texture_compression_bc)
        && implied(required.occlusion_query_precise, available.occlusion_query_precise)
        && implied(
            required.pipeline_statistics_query,
            available.pipeline_statistics_query,
        )
        && implied(
            required.vertex_pipeline_stores_and_atomics,
            available.vertex_pipeline_stores_and_atomics,
        )
        && implied(
            required.fragment_stores_and_atomics,
            available.fragment_stores_and_atomics,
        )
        && implied(
            required.shader_tessellation_and_geometry_point_size,
            available.shader_tessellation_and_geometry_point_size,
        )
        && implied(
            required.shader_image_gather_extended,
            available.shader_image_gather_extended,
        )
        && implied(
            required.shader_storage_image_extended_formats,
            available.shader_storage_image_extended_formats,
        )
        && implied(
            required.shader_storage_image_multisample,
            available.shader_storage_image_multisample,
        )
        && implied(
            required.shader_storage_image_read_without_format,
            available.shader_storage_image_read_without_format,
        )
        && implied(
            required.shader_storage_image_write_without_format,
            available.shader_storage_image_write_without_format,
        )
        && implied(
            required.shader_uniform_buffer_array_dynamic_indexing,
            available.shader_uniform_buffer_array_dynamic_indexing,
        )
        && implied(
            required.shader_sampled_image_array_dynamic_indexing,
            available.shader_sampled_image_array_dynamic_indexing,
        )
        && implied(
            required.shader_storage_buffer_array_dynamic_indexing,
            available.shader_storage_buffer_array_dynamic_indexing,
        )
        && implied(
            required.shader_storage_image_array_dynamic_indexing,
            available.shader_storage_image_array_dynamic_indexing,
        )
        && implied(required.shader_clip_distance, available.shader_clip_distance)
        && implied(required.shader_cull_distance, available.shader_cull_distance)
        && implied(required.shader_float64, available.shader_float64)
        && implied(required.shader_int64, available.shader_int64)
        && implied(required.shader_int16, available.shader_int16)
        && implied(
            required.shader_resource_residency,
            available.shader_resource_residency,
        )
        && implied(required.shader_resource_min_lod, available.shader_resource_min_lod)
        && implied(required.sparse_binding, available.sparse_binding)
        && implied(required.sparse_residency_buffer, available.sparse_residency_buffer)
        && implied(
            required.sparse_residency_image2_d,
            available.sparse_residency_image2_d,
        )
        && implied(
            required.sparse_residency_image3_d,
            available.sparse_residency_image3_d,
        )
        && implied(
            required.sparse_residency2_samples,
            available.sparse_residency2_samples,
        )
        && implied(
            required.sparse_residency4_samples,
            available.sparse_residency4_samples,
        )
        && implied(
            required.sparse_residency8_samples,
            available.sparse_residency8_samples,
        )
        && implied(
            required.sparse_residency16_samples,
            available.sparse_residency16_samples,
        )
        && implied(required.sparse_residency_aliased, available.sparse_residency_aliased)
        && implied(
            required.variable_multisample_rate,
            available.variable_multisample_rate,
        )
        && implied(required.inherited_queries, available.inherited_queries)
}
