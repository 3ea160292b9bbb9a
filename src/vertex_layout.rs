//! Vertex layout derivation: turns the `VertexAttribute`s recorded for one
//! vertex shader into a canonical `(bindings, attributes)` pair and
//! synthesizes a stable enum name used both as the C-side tag and as the
//! global dedup key.

use std::collections::HashSet;

use crate::types::{GlslType, Rate, VertexAttribute};

#[derive(Debug)]
pub enum VertexLayoutError {
    MixedPacking,
    DuplicateLocation(u32),
    InconsistentRate(u32),
    UnsupportedAttributeType(GlslType),
}

impl std::fmt::Display for VertexLayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VertexLayoutError::MixedPacking => {
                write!(f, "a vertex shader mixes tightly-packed and explicit-offset attributes")
            }
            VertexLayoutError::DuplicateLocation(loc) => {
                write!(f, "duplicate vertex attribute location {}", loc)
            }
            VertexLayoutError::InconsistentRate(binding) => write!(
                f,
                "binding {} has attributes with inconsistent input rates",
                binding
            ),
            VertexLayoutError::UnsupportedAttributeType(t) => write!(
                f,
                "glsl type {} has no Vulkan vertex format (matrix types are not valid vertex attributes)",
                t.glsl_name()
            ),
        }
    }
}

impl std::error::Error for VertexLayoutError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VulkanVertexBinding {
    pub binding: u32,
    pub stride: u32,
    pub rate: Rate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VulkanVertexAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: &'static str,
    pub offset: u32,
    /// Kept for enum-name synthesis; not part of the emitted ABI struct.
    pub glsl_type: GlslType,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VulkanVertexLayout {
    pub bindings: Vec<VulkanVertexBinding>,
    pub attributes: Vec<VulkanVertexAttribute>,
}

/// Derive a canonical Vulkan vertex layout from one shader's recorded
/// attributes. An empty slice (non-vertex shader, or a vertex shader with
/// no attribute directives) yields an empty layout, which callers must
/// treat as `INVALID_VERTEX_LAYOUT`.
pub fn derive_vertex_layout(
    attrs: &[VertexAttribute],
) -> Result<VulkanVertexLayout, VertexLayoutError> {
    if attrs.is_empty() {
        return Ok(VulkanVertexLayout::default());
    }

    let tightly_packed = attrs[0].is_tightly_packed;
    if attrs.iter().any(|a| a.is_tightly_packed != tightly_packed) {
        return Err(VertexLayoutError::MixedPacking);
    }

    let mut seen_locations = HashSet::new();
    for a in attrs {
        if !seen_locations.insert(a.location) {
            return Err(VertexLayoutError::DuplicateLocation(a.location));
        }
    }

    // First-seen binding order, so tightly-packed offsets accumulate in
    // declaration order within a binding.
    let mut binding_order: Vec<u32> = Vec::new();
    for a in attrs {
        if !binding_order.contains(&a.binding) {
            binding_order.push(a.binding);
        }
    }

    let mut bindings = Vec::with_capacity(binding_order.len());
    let mut out_attrs = Vec::with_capacity(attrs.len());

    for binding in &binding_order {
        let group: Vec<&VertexAttribute> = attrs.iter().filter(|a| a.binding == *binding).collect();
        let rate0 = group[0].rate;
        if group.iter().any(|a| a.rate != rate0) {
            return Err(VertexLayoutError::InconsistentRate(*binding));
        }

        let mut running_offset = 0u32;
        let mut stride = 0u32;
        for a in &group {
            let format = a
                .glsl_type
                .vulkan_format()
                .ok_or(VertexLayoutError::UnsupportedAttributeType(a.glsl_type))?;
            let size = a.glsl_type.scalar_size();
            let offset = if tightly_packed {
                let o = running_offset;
                running_offset += size;
                o
            } else {
                a.offset.unwrap_or(0)
            };
            stride += size;
            out_attrs.push(VulkanVertexAttribute {
                location: a.location,
                binding: *binding,
                format,
                offset,
                glsl_type: a.glsl_type,
            });
        }
        bindings.push(VulkanVertexBinding {
            binding: *binding,
            stride,
            rate: rate0,
        });
    }

    bindings.sort_by_key(|b| b.binding);
    out_attrs.sort_by_key(|a| (a.binding, a.location));

    Ok(VulkanVertexLayout {
        bindings,
        attributes: out_attrs,
    })
}

/// Synthesize the deterministic C enum tag for a canonical layout.
/// `INVALID_VERTEX_LAYOUT` for non-vertex shaders or attribute-less vertex
/// shaders.
pub fn synthesize_enum_name(layout: &VulkanVertexLayout) -> String {
    if layout.attributes.is_empty() {
        return "INVALID_VERTEX_LAYOUT".to_owned();
    }

    let mut name = String::from("VERTEX_LAYOUT");
    let multi_binding = layout.bindings.len() > 1;
    let any_instance_rate = layout.bindings.iter().any(|b| b.rate == Rate::Instance);

    for binding in &layout.bindings {
        if multi_binding {
            name.push_str(&format!("_BINDING{}", binding.binding));
        }
        if any_instance_rate {
            match binding.rate {
                Rate::Vertex => name.push_str("_RATE_VERTEX"),
                Rate::Instance => name.push_str("_RATE_INSTANCE"),
            }
        }
        let mut attrs: Vec<&VulkanVertexAttribute> = layout
            .attributes
            .iter()
            .filter(|a| a.binding == binding.binding)
            .collect();
        attrs.sort_by_key(|a| a.location);
        for a in attrs {
            name.push('_');
            name.push_str(a.glsl_type.enum_suffix());
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GlslType;

    fn attr(location: u32, binding: u32, glsl_type: GlslType, tightly_packed: bool) -> VertexAttribute {
        VertexAttribute {
            location,
            binding,
            glsl_type,
            rate: Rate::Vertex,
            identifier: format!("a{}", location),
            offset: None,
            is_tightly_packed: tightly_packed,
        }
    }

    #[test]
    fn two_attribute_tightly_packed_scenario() {
        let attrs = vec![
            attr(0, 0, GlslType::Vec3, true),
            attr(1, 0, GlslType::Vec2, true),
        ];
        let layout = derive_vertex_layout(&attrs).unwrap();
        assert_eq!(layout.bindings.len(), 1);
        assert_eq!(layout.bindings[0].stride, 20);
        assert_eq!(layout.attributes[0].offset, 0);
        assert_eq!(layout.attributes[0].format, "R32G32B32_SFLOAT");
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(layout.attributes[1].format, "R32G32_SFLOAT");
        assert_eq!(synthesize_enum_name(&layout), "VERTEX_LAYOUT_VEC3_VEC2");
    }

    #[test]
    fn empty_attributes_are_invalid_layout() {
        let layout = derive_vertex_layout(&[]).unwrap();
        assert_eq!(synthesize_enum_name(&layout), "INVALID_VERTEX_LAYOUT");
    }

    #[test]
    fn duplicate_location_rejected() {
        let attrs = vec![attr(0, 0, GlslType::Vec3, true), attr(0, 0, GlslType::Vec2, true)];
        assert!(matches!(
            derive_vertex_layout(&attrs),
            Err(VertexLayoutError::DuplicateLocation(0))
        ));
    }

    #[test]
    fn mixed_packing_rejected() {
        let mut a = attr(0, 0, GlslType::Vec3, true);
        let mut b = attr(1, 0, GlslType::Vec2, false);
        b.offset = Some(12);
        a.is_tightly_packed = true;
        assert!(matches!(
            derive_vertex_layout(&[a, b]),
            Err(VertexLayoutError::MixedPacking)
        ));
    }

    #[test]
    fn identical_layouts_structurally_equal() {
        let attrs = vec![
            attr(0, 0, GlslType::Vec3, true),
            attr(1, 0, GlslType::Vec2, true),
        ];
        let a = derive_vertex_layout(&attrs).unwrap();
        let b = derive_vertex_layout(&attrs).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn multi_binding_and_instance_rate_name() {
        let mut inst = attr(2, 1, GlslType::Vec4, true);
        inst.rate = Rate::Instance;
        let attrs = vec![attr(0, 0, GlslType::Vec3, true), inst];
        let layout = derive_vertex_layout(&attrs).unwrap();
        let name = synthesize_enum_name(&layout);
        assert_eq!(name, "VERTEX_LAYOUT_BINDING0_RATE_VERTEX_VEC3_BINDING1_RATE_INSTANCE_VEC4");
    }
}
