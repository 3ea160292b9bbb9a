//! Header emitter: deterministic C/C++ header generation.
//!
//! Every ordering key is explicit — input order for shaders, canonical sort
//! keys for vertex layouts, insertion order for struct typenames — so two
//! runs over the same input set produce a byte-identical header.

use crate::aggregate::GlobalState;
use crate::compile::CompiledShader;
use crate::types::{DescriptorType, GlslType, StructDescription, StructMember};
use crate::vertex_layout::VulkanVertexLayout;

fn c_type_name(t: GlslType) -> &'static str {
    match t {
        GlslType::Float => "float",
        GlslType::Vec2 => "Vec2",
        GlslType::Vec3 => "Vec3",
        GlslType::Vec4 => "Vec4",
        GlslType::Mat2 => "Mat2",
        GlslType::Mat3 => "Mat3",
        GlslType::Mat4 => "Mat4",
    }
}

/// 4 words per line, as `0x........` hex literals.
fn format_spirv_words(spirv: &[u8]) -> String {
    let words: Vec<u32> = spirv
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    let mut out = String::new();
    for line in words.chunks(4) {
        out.push_str("    ");
        for w in line {
            out.push_str(&format!("0x{:08x}, ", w));
        }
        out.push('\n');
    }
    out
}

/// Render `s` as a sequence of adjacent C string literals, one per source
/// line, relying on C/C++ literal concatenation.
fn emit_c_string_literal(s: &str) -> String {
    let mut out = String::new();
    for line in s.split('\n') {
        out.push_str("    \"");
        for ch in line.chars() {
            match ch {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                _ => out.push(ch),
            }
        }
        out.push_str("\\n\"\n");
    }
    out
}

fn emit_struct(desc: &StructDescription) -> String {
    let mut out = String::new();
    out.push_str(&format!("struct alignas(16) {} {{\n", desc.typename));
    for m in &desc.members {
        out.push_str(&emit_member(m));
    }
    let last_end = desc
        .members
        .last()
        .map(|m| m.offset + m.size)
        .unwrap_or(0);
    if desc.size > last_end {
        let pad_floats = (desc.size - last_end) / 4;
        out.push_str(&format!("    alignas(4) float _pad[{}];\n", pad_floats));
    }
    out.push_str("};\n");
    for m in &desc.members {
        if let Some(n) = m.array_size {
            out.push_str(&format!(
                "static const uint32_t {}_{}_count = {};\n",
                desc.typename, m.name, n
            ));
        }
    }
    out
}

fn emit_member(m: &StructMember) -> String {
    let c_type = c_type_name(m.glsl_type);
    let align = m.glsl_type.std140_align();
    match m.array_size {
        Some(n) => format!("    alignas({}) {} {}[{}];\n", align, c_type, m.name, n),
        None => format!("    alignas({}) {} {};\n", align, c_type, m.name),
    }
}

fn emit_vertex_layout_arrays(enum_name: &str, layout: &VulkanVertexLayout) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "static const VulkanVertexBindingDescriptor g_vertex_layout_{}_bindings[] = {{\n",
        enum_name
    ));
    for b in &layout.bindings {
        out.push_str(&format!(
            "    {{ {}, {}, {} }},\n",
            b.binding,
            b.stride,
            b.rate.vk_input_rate()
        ));
    }
    out.push_str("};\n");

    out.push_str(&format!(
        "static const VulkanVertexAttributeDescriptor g_vertex_layout_{}_attributes[] = {{\n",
        enum_name
    ));
    for a in &layout.attributes {
        out.push_str(&format!(
            "    {{ {}, {}, VK_FORMAT_{}, {} }},\n",
            a.location, a.binding, a.format, a.offset
        ));
    }
    out.push_str("};\n");
    out
}

/// Emit the complete generated header for one compile batch.
///
/// `shaders` must be in the order they were compiled; `global` is the
/// fully-populated aggregation state for the same batch.
pub fn emit_header(shaders: &[CompiledShader], global: &GlobalState) -> String {
    let mut out = String::new();

    // 1. Preamble.
    out.push_str("#pragma once\n\n");
    out.push_str("#include <cstdint>\n");
    out.push_str("#include <cstddef>\n");
    out.push_str("#include <vulkan/vulkan.h>\n\n");
    out.push_str("struct Vec2 { float x, y; };\n");
    out.push_str("struct Vec3 { float x, y, z; };\n");
    out.push_str("struct Vec4 { float x, y, z, w; };\n");
    out.push_str("struct Mat2 { float m[4]; };\n");
    out.push_str("struct Mat3 { float m[9]; };\n");
    out.push_str("struct Mat4 { float m[16]; };\n\n");

    // 2. Vertex-layout enum.
    let layouts: Vec<(&str, &VulkanVertexLayout)> = global.unique_layouts().collect();
    out.push_str("typedef enum GeneratedVertexLayoutID {\n");
    for (name, _) in &layouts {
        out.push_str(&format!("    {},\n", name));
    }
    out.push_str("    NUM_GENERATED_VERTEX_LAYOUTS,\n");
    out.push_str("    INVALID_VERTEX_LAYOUT = NUM_GENERATED_VERTEX_LAYOUTS,\n");
    out.push_str("} GeneratedVertexLayoutID;\n\n");

    // 3. ShaderSpec struct (ABI contract).
    out.push_str("typedef struct VulkanVertexBindingDescriptor {\n");
    out.push_str("    uint32_t binding;\n");
    out.push_str("    uint32_t stride;\n");
    out.push_str("    VkVertexInputRate input_rate;\n");
    out.push_str("} VulkanVertexBindingDescriptor;\n\n");

    out.push_str("typedef struct VulkanVertexAttributeDescriptor {\n");
    out.push_str("    uint32_t location;\n");
    out.push_str("    uint32_t binding;\n");
    out.push_str("    VkFormat format;\n");
    out.push_str("    uint32_t offset;\n");
    out.push_str("} VulkanVertexAttributeDescriptor;\n\n");

    out.push_str("typedef struct VulkanVertexLayoutDescriptor {\n");
    out.push_str("    const VulkanVertexBindingDescriptor *bindings;\n");
    out.push_str("    uint32_t binding_count;\n");
    out.push_str("    const VulkanVertexAttributeDescriptor *attributes;\n");
    out.push_str("    uint32_t attribute_count;\n");
    out.push_str("} VulkanVertexLayoutDescriptor;\n\n");

    out.push_str("typedef struct ShaderSpec {\n");
    out.push_str("    const uint32_t *spv;\n");
    out.push_str("    uint32_t size;\n");
    out.push_str("    const char *name;\n");
    out.push_str("    VkShaderStageFlagBits stage_flags;\n");
    out.push_str("    GeneratedVertexLayoutID vertex_layout_id;\n");
    out.push_str("} ShaderSpec;\n\n");

    // 4. Vertex-layout array indexed by the enum.
    for (name, layout) in &layouts {
        out.push_str(&emit_vertex_layout_arrays(name, layout));
    }
    out.push_str("static const VulkanVertexLayoutDescriptor generated_vertex_layouts[NUM_GENERATED_VERTEX_LAYOUTS] = {\n");
    for (name, layout) in &layouts {
        out.push_str(&format!(
            "    {{ g_vertex_layout_{name}_bindings, {}, g_vertex_layout_{name}_attributes, {} }},\n",
            layout.bindings.len(),
            layout.attributes.len(),
            name = name
        ));
    }
    out.push_str("};\n\n");

    // 5. Static registry and inline initializer.
    out.push_str("struct VertexLayoutRegistry {\n");
    out.push_str("    VulkanVertexLayoutDescriptor layouts[NUM_GENERATED_VERTEX_LAYOUTS];\n");
    out.push_str("};\n\n");
    out.push_str("static VertexLayoutRegistry g_vertex_layout_registry;\n\n");
    out.push_str("inline void init_vertex_layout_registry() {\n");
    for (name, _) in &layouts {
        out.push_str(&format!(
            "    g_vertex_layout_registry.layouts[{name}] = generated_vertex_layouts[{name}];\n",
            name = name
        ));
    }
    out.push_str("}\n\n");
    out.push_str("inline const VulkanVertexLayoutDescriptor *get_vertex_layout(GeneratedVertexLayoutID id) {\n");
    out.push_str("    if (id == INVALID_VERTEX_LAYOUT) {\n");
    out.push_str("        return nullptr;\n");
    out.push_str("    }\n");
    out.push_str("    return &g_vertex_layout_registry.layouts[id];\n");
    out.push_str("}\n\n");

    // 6. Per-shader blocks.
    for shader in shaders {
        out.push_str(&format!(
            "static const uint32_t {}[] = {{\n",
            shader.name
        ));
        out.push_str(&format_spirv_words(&shader.spirv));
        out.push_str("};\n");
        out.push_str(&format!(
            "static const uint32_t {0}_size = sizeof({0});\n",
            shader.name
        ));
        out.push_str(&format!(
            "static const char *{}_name = \"{}\";\n",
            shader.name, shader.name
        ));
        out.push_str(&format!(
            "static const ShaderSpec {0}_spec = {{ {0}, {0}_size, {0}_name, {1}, {2} }};\n",
            shader.name,
            shader.stage.vk_stage_flag_bits(),
            shader.vertex_layout_id
        ));
        out.push_str(&format!(
            "static const char *{}_opengl_glsl =\n",
            shader.name
        ));
        out.push_str(&emit_c_string_literal(&shader.opengl_source));
        out.push_str("    ;\n\n");
    }

    // 7. C struct translations of uniform blocks.
    for desc in global.descriptors.structs_in_order() {
        out.push_str(&emit_struct(desc));
        out.push('\n');
    }

    // 8. Descriptor pool.
    let mut pool_entries: Vec<(DescriptorType, u32)> = global
        .descriptors
        .type_counts()
        .iter()
        .map(|(k, v)| (*k, *v))
        .collect();
    // Fixed order (rather than HashMap iteration order) so the header is
    // byte-stable across runs.
    pool_entries.sort_by_key(|(t, _)| match t {
        DescriptorType::UniformBuffer => 0,
        DescriptorType::Sampler2D => 1,
    });
    out.push_str("static const VkDescriptorPoolSize generated_pool_sizes[] = {\n");
    for (ty, count) in &pool_entries {
        out.push_str(&format!(
            "    {{ {}, {} }},\n",
            ty.vk_descriptor_type(),
            count
        ));
    }
    out.push_str("};\n");
    out.push_str(&format!(
        "static const uint32_t generated_pool_size_count = {};\n",
        pool_entries.len()
    ));
    out.push_str(&format!(
        "static const uint32_t max_sets = {};\n\n",
        global.descriptors.max_sets()
    ));

    // 9. Trailing array of pointers to every spec, in compile order.
    out.push_str("static const ShaderSpec *generated_shader_specs[] = {\n");
    for shader in shaders {
        out.push_str(&format!("    &{}_spec,\n", shader.name));
    }
    out.push_str("};\n");
    out.push_str(&format!(
        "static const uint32_t num_generated_specs = {};\n",
        shaders.len()
    ));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rate, Stage};
    use crate::vertex_layout::{VulkanVertexAttribute, VulkanVertexBinding};

    fn sample_shader() -> CompiledShader {
        CompiledShader {
            name: "triangle_frag".to_owned(),
            spirv: vec![0x03, 0x02, 0x23, 0x07, 0x00, 0x00, 0x01, 0x00],
            opengl_source: "#version 410 core\nvoid main() {}\n".to_owned(),
            stage: Stage::Fragment,
            vertex_layout_id: "INVALID_VERTEX_LAYOUT".to_owned(),
        }
    }

    #[test]
    fn header_contains_abi_struct_and_trailing_arrays() {
        let mut global = GlobalState::new();
        let shader = sample_shader();
        let header = emit_header(&[shader], &global);
        assert!(header.contains("typedef struct ShaderSpec"));
        assert!(header.contains("static const ShaderSpec *generated_shader_specs[]"));
        assert!(header.contains("num_generated_specs = 1"));
        assert!(header.contains("triangle_frag_opengl_glsl"));
        let _ = global.register_vertex_layout(VulkanVertexLayout::default());
    }

    #[test]
    fn spirv_words_are_formatted_as_hex_in_groups_of_four() {
        let bytes: Vec<u8> = (0u32..8)
            .flat_map(|w| w.to_le_bytes().to_vec())
            .collect();
        let formatted = format_spirv_words(&bytes);
        let lines: Vec<&str> = formatted.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("0x00000000"));
        assert!(lines[0].contains("0x00000003"));
    }

    #[test]
    fn vertex_layout_enum_and_array_are_emitted_for_unique_layouts() {
        let mut global = GlobalState::new();
        let layout = VulkanVertexLayout {
            bindings: vec![VulkanVertexBinding {
                binding: 0,
                stride: 12,
                rate: Rate::Vertex,
            }],
            attributes: vec![VulkanVertexAttribute {
                location: 0,
                binding: 0,
                format: "R32G32B32_SFLOAT",
                offset: 0,
                glsl_type: GlslType::Vec3,
            }],
        };
        let id = global.register_vertex_layout(layout);
        let header = emit_header(&[], &global);
        assert!(header.contains(&id));
        assert!(header.contains("NUM_GENERATED_VERTEX_LAYOUTS"));
        assert!(header.contains("VK_FORMAT_R32G32B32_SFLOAT"));
    }

    #[test]
    fn uniform_block_struct_gets_padding_field() {
        let mut global = GlobalState::new();
        let bindings = vec![crate::types::SetBindingLayout {
            set_id: 0,
            binding: 0,
            descriptor_type: DescriptorType::UniformBuffer,
            struct_desc: Some(StructDescription {
                typename: "Mvp".to_owned(),
                identifier: "u".to_owned(),
                size: 48,
                members: vec![
                    StructMember {
                        name: "a".to_owned(),
                        glsl_type: GlslType::Vec2,
                        offset: 0,
                        size: 8,
                        array_size: None,
                    },
                    StructMember {
                        name: "b".to_owned(),
                        glsl_type: GlslType::Vec4,
                        offset: 16,
                        size: 16,
                        array_size: None,
                    },
                    StructMember {
                        name: "c".to_owned(),
                        glsl_type: GlslType::Float,
                        offset: 32,
                        size: 4,
                        array_size: None,
                    },
                ],
            }),
            buffer_label: None,
        }];
        global.add_shader_bindings(&bindings).unwrap();
        let header = emit_header(&[], &global);
        assert!(header.contains("struct alignas(16) Mvp"));
        assert!(header.contains("_pad[3]"));
    }
}
