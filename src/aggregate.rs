//! Global aggregation across a whole compile batch: vertex-layout
//! deduplication and the descriptor/struct tally. Threaded explicitly
//! through the per-shader pass rather than kept as process-wide mutable
//! state.

use crate::descriptor::{DescriptorAggregator, StructTypenameCollisionError};
use crate::types::SetBindingLayout;
use crate::vertex_layout::{synthesize_enum_name, VulkanVertexLayout};

/// Sentinel `vertex_layout_id` for non-vertex stages and attribute-less
/// vertex shaders.
pub const INVALID_VERTEX_LAYOUT: &str = "INVALID_VERTEX_LAYOUT";

/// Accumulated state across the batch: the ordered list of unique vertex
/// layouts, and the descriptor/struct aggregator.
#[derive(Default)]
pub struct GlobalState {
    layouts: Vec<VulkanVertexLayout>,
    enum_names: Vec<String>,
    pub descriptors: DescriptorAggregator,
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one shader's canonical vertex layout, deduplicating
    /// structurally against everything seen so far in the batch, and
    /// return the enum name to use as this shader's `vertex_layout_id`.
    pub fn register_vertex_layout(&mut self, layout: VulkanVertexLayout) -> String {
        if layout.attributes.is_empty() {
            return INVALID_VERTEX_LAYOUT.to_owned();
        }
        if let Some(pos) = self.layouts.iter().position(|l| *l == layout) {
            return self.enum_names[pos].clone();
        }
        let name = synthesize_enum_name(&layout);
        self.layouts.push(layout);
        self.enum_names.push(name.clone());
        name
    }

    /// Fold one shader's descriptor bindings into the running tally.
    pub fn add_shader_bindings(
        &mut self,
        bindings: &[SetBindingLayout],
    ) -> Result<(), StructTypenameCollisionError> {
        self.descriptors.add_shader_bindings(bindings)
    }

    /// Unique layouts paired with their synthesized enum name, in
    /// first-encountered order (the header emitter's enum declaration order).
    pub fn unique_layouts(&self) -> impl Iterator<Item = (&str, &VulkanVertexLayout)> {
        self.enum_names
            .iter()
            .map(String::as_str)
            .zip(self.layouts.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GlslType, Rate, VertexAttribute};
    use crate::vertex_layout::derive_vertex_layout;

    fn attr(location: u32, glsl_type: GlslType) -> VertexAttribute {
        VertexAttribute {
            location,
            binding: 0,
            glsl_type,
            rate: Rate::Vertex,
            identifier: format!("a{}", location),
            offset: None,
            is_tightly_packed: true,
        }
    }

    #[test]
    fn two_identical_shaders_share_one_layout_id() {
        let mut global = GlobalState::new();
        let attrs = vec![attr(0, GlslType::Vec3), attr(1, GlslType::Vec2)];
        let a = derive_vertex_layout(&attrs).unwrap();
        let b = derive_vertex_layout(&attrs).unwrap();

        let id_a = global.register_vertex_layout(a);
        let id_b = global.register_vertex_layout(b);
        assert_eq!(id_a, id_b);
        assert_eq!(global.unique_layouts().count(), 1);
    }

    #[test]
    fn non_vertex_shader_gets_invalid_sentinel() {
        let mut global = GlobalState::new();
        let layout = derive_vertex_layout(&[]).unwrap();
        assert_eq!(global.register_vertex_layout(layout), INVALID_VERTEX_LAYOUT);
        assert_eq!(global.unique_layouts().count(), 0);
    }

    #[test]
    fn distinct_layouts_get_distinct_ids() {
        let mut global = GlobalState::new();
        let a = derive_vertex_layout(&[attr(0, GlslType::Vec3)]).unwrap();
        let b = derive_vertex_layout(&[attr(0, GlslType::Vec4)]).unwrap();
        let id_a = global.register_vertex_layout(a);
        let id_b = global.register_vertex_layout(b);
        assert_ne!(id_a, id_b);
        assert_eq!(global.unique_layouts().count(), 2);
    }
}
