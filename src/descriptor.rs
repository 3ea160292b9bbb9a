//! Descriptor aggregation: across all shaders' `SetBindingLayout` lists,
//! tally descriptor types for pool sizing and reconcile struct typenames.

use std::collections::HashMap;

use crate::types::{DescriptorType, SetBindingLayout, StructDescription};

#[derive(Debug)]
pub struct StructTypenameCollisionError {
    pub typename: String,
}

impl std::fmt::Display for StructTypenameCollisionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "uniform block typename `{}` is declared with incompatible member layouts in different shaders",
            self.typename
        )
    }
}

impl std::error::Error for StructTypenameCollisionError {}

/// Accumulates descriptor bindings across the whole compile batch.
#[derive(Default)]
pub struct DescriptorAggregator {
    struct_registry: HashMap<String, StructDescription>,
    struct_order: Vec<String>,
    type_counts: HashMap<DescriptorType, u32>,
}

impl DescriptorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one shader's descriptor bindings. On a struct typename
    /// collision, the caller should log the error and drop that shader's
    /// struct from the header; the tally for non-colliding bindings in the
    /// same call is still recorded.
    pub fn add_shader_bindings(
        &mut self,
        bindings: &[SetBindingLayout],
    ) -> Result<(), StructTypenameCollisionError> {
        let mut first_error = None;
        for binding in bindings {
            *self.type_counts.entry(binding.descriptor_type).or_insert(0) += 1;

            if let Some(desc) = &binding.struct_desc {
                match self.struct_registry.get(&desc.typename) {
                    None => {
                        self.struct_registry
                            .insert(desc.typename.clone(), desc.clone());
                        self.struct_order.push(desc.typename.clone());
                    }
                    Some(existing) if existing.members == desc.members && existing.size == desc.size => {
                        // same shape, already registered
                    }
                    Some(_) => {
                        if first_error.is_none() {
                            first_error = Some(StructTypenameCollisionError {
                                typename: desc.typename.clone(),
                            });
                        }
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Descriptor-type tally used for both pool sizing and `max_sets`.
    pub fn type_counts(&self) -> &HashMap<DescriptorType, u32> {
        &self.type_counts
    }

    pub fn max_sets(&self) -> u32 {
        self.type_counts.values().copied().max().unwrap_or(0)
    }

    /// Registered struct descriptions in first-encountered order.
    pub fn structs_in_order(&self) -> Vec<&StructDescription> {
        self.struct_order
            .iter()
            .filter_map(|name| self.struct_registry.get(name))
            .collect()
    }
}
