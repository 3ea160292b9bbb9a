//! std140-style layout derivation for uniform block members: a running
//! offset, an `align_up` helper, and a rejection of bare `vec3` members
//! (the classic std140 alignment hazard).

use crate::types::{GlslType, StructMember};

/// Round `offset` up to the next multiple of `align`. `align` must be a
/// power of two, which is always true of the alignments we hand it (4, 8, 16).
pub fn align_up(offset: u32, align: u32) -> u32 {
    debug_assert!(align.is_power_of_two());
    (offset + align - 1) & !(align - 1)
}

/// Error produced while laying out a uniform block body.
#[derive(Debug)]
pub enum LayoutError {
    /// A `vec3` member was declared directly inside a uniform block.
    Vec3InBlock { member_name: String },
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::Vec3InBlock { member_name } => write!(
                f,
                "member `{}` has type vec3, which is not allowed directly inside a uniform block \
                 (std140 alignment hazard)",
                member_name
            ),
        }
    }
}

impl std::error::Error for LayoutError {}

/// Accumulates members into a std140-ish layout one at a time, in source
/// declaration order.
pub struct Std140LayoutBuilder {
    next_offset: u32,
    max_align: u32,
    members: Vec<StructMember>,
}

impl Std140LayoutBuilder {
    pub fn new() -> Self {
        Std140LayoutBuilder {
            next_offset: 0,
            // A std140 block's base alignment is always rounded up to vec4
            // (16), regardless of its largest member's own alignment.
            max_align: 16,
            members: Vec::new(),
        }
    }

    /// Add one member. `array_size`, if present, multiplies the element
    /// size by the declared length (the original tool's bug of not doing
    /// this is fixed here per the documented recommendation).
    pub fn add_member(
        &mut self,
        name: String,
        glsl_type: GlslType,
        array_size: Option<u32>,
    ) -> Result<(), LayoutError> {
        if glsl_type == GlslType::Vec3 {
            return Err(LayoutError::Vec3InBlock { member_name: name });
        }

        let align = glsl_type.std140_align();
        let element_size = glsl_type.scalar_size();
        let size = element_size * array_size.unwrap_or(1).max(1);

        let offset = align_up(self.next_offset, align);
        self.next_offset = offset + size;
        self.max_align = self.max_align.max(align);

        self.members.push(StructMember {
            name,
            glsl_type,
            offset,
            size,
            array_size,
        });
        Ok(())
    }

    /// Finalize the block: pad the trailing size up to the block's maximum
    /// member alignment, and return the completed member list plus total size.
    pub fn finish(self) -> (Vec<StructMember>, u32) {
        let size = align_up(self.next_offset, self.max_align);
        (self.members, size)
    }
}

impl Default for Std140LayoutBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_power_of_two() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(16, 16), 16);
        assert_eq!(align_up(17, 16), 32);
        assert_eq!(align_up(8, 4), 8);
    }

    #[test]
    fn uniform_block_std140_scenario() {
        // { vec2 a; vec4 b; float c; } mvp -> {a:0, b:16, c:32}, size 48
        let mut b = Std140LayoutBuilder::new();
        b.add_member("a".into(), GlslType::Vec2, None).unwrap();
        b.add_member("b".into(), GlslType::Vec4, None).unwrap();
        b.add_member("c".into(), GlslType::Float, None).unwrap();
        let (members, size) = b.finish();
        assert_eq!(members[0].offset, 0);
        assert_eq!(members[1].offset, 16);
        assert_eq!(members[2].offset, 32);
        assert_eq!(size, 48);
    }

    #[test]
    fn vec3_in_block_rejected() {
        let mut b = Std140LayoutBuilder::new();
        assert!(b.add_member("n".into(), GlslType::Vec3, None).is_err());
    }

    #[test]
    fn array_member_multiplies_size() {
        let mut b = Std140LayoutBuilder::new();
        b.add_member("arr".into(), GlslType::Float, Some(4))
            .unwrap();
        let (members, _) = b.finish();
        assert_eq!(members[0].size, 16);
    }

    #[test]
    fn size_is_multiple_of_sixteen() {
        let mut b = Std140LayoutBuilder::new();
        b.add_member("x".into(), GlslType::Float, None).unwrap();
        let (_, size) = b.finish();
        assert_eq!(size % 16, 0);
    }
}
