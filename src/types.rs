//! Shared domain types used across the directive parser, layout derivation,
//! and header emitter.

use crate::token::TokenKind;

/// GLSL scalar/vector/matrix types this tool understands natively. Anything
/// else appearing in a vertex attribute or uniform block member is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GlslType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl GlslType {
    pub fn from_token(kind: &TokenKind) -> Option<GlslType> {
        match kind {
            TokenKind::Float => Some(GlslType::Float),
            TokenKind::Vec2 => Some(GlslType::Vec2),
            TokenKind::Vec3 => Some(GlslType::Vec3),
            TokenKind::Vec4 => Some(GlslType::Vec4),
            TokenKind::Mat2 => Some(GlslType::Mat2),
            TokenKind::Mat3 => Some(GlslType::Mat3),
            TokenKind::Mat4 => Some(GlslType::Mat4),
            _ => None,
        }
    }

    /// GLSL spelling, used in emitted struct translations and diagnostics.
    pub fn glsl_name(&self) -> &'static str {
        match self {
            GlslType::Float => "float",
            GlslType::Vec2 => "vec2",
            GlslType::Vec3 => "vec3",
            GlslType::Vec4 => "vec4",
            GlslType::Mat2 => "mat2",
            GlslType::Mat3 => "mat3",
            GlslType::Mat4 => "mat4",
        }
    }

    /// Suffix used in synthesized vertex layout enum names, e.g. `_VEC3`.
    pub fn enum_suffix(&self) -> &'static str {
        match self {
            GlslType::Float => "FLOAT",
            GlslType::Vec2 => "VEC2",
            GlslType::Vec3 => "VEC3",
            GlslType::Vec4 => "VEC4",
            GlslType::Mat2 => "MAT2",
            GlslType::Mat3 => "MAT3",
            GlslType::Mat4 => "MAT4",
        }
    }

    /// Byte size of one instance of this type: `float->4, vec2->8, vec3->12,
    /// vec4->16, matN->N*N*4`.
    pub fn scalar_size(&self) -> u32 {
        match self {
            GlslType::Float => 4,
            GlslType::Vec2 => 8,
            GlslType::Vec3 => 12,
            GlslType::Vec4 => 16,
            GlslType::Mat2 => 2 * 2 * 4,
            GlslType::Mat3 => 3 * 3 * 4,
            GlslType::Mat4 => 4 * 4 * 4,
        }
    }

    /// std140-ish alignment: `float->4, vec2->8, vec3/vec4/matN->16`.
    pub fn std140_align(&self) -> u32 {
        match self {
            GlslType::Float => 4,
            GlslType::Vec2 => 8,
            GlslType::Vec3 | GlslType::Vec4 | GlslType::Mat2 | GlslType::Mat3 | GlslType::Mat4 => {
                16
            }
        }
    }

    /// The Vulkan `VkFormat` enumerator a vertex attribute of this type maps
    /// to. Matrix types are not valid vertex-attribute types.
    pub fn vulkan_format(&self) -> Option<&'static str> {
        match self {
            GlslType::Float => Some("R32_SFLOAT"),
            GlslType::Vec2 => Some("R32G32_SFLOAT"),
            GlslType::Vec3 => Some("R32G32B32_SFLOAT"),
            GlslType::Vec4 => Some("R32G32B32A32_SFLOAT"),
            GlslType::Mat2 | GlslType::Mat3 | GlslType::Mat4 => None,
        }
    }
}

/// Shader stage, derived from the input filename's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
    Compute,
}

impl Stage {
    pub fn from_extension(ext: &str) -> Option<Stage> {
        match ext {
            "vert" => Some(Stage::Vertex),
            "frag" => Some(Stage::Fragment),
            "comp" => Some(Stage::Compute),
            _ => None,
        }
    }

    /// The `-S` argument passed to the external SPIR-V assembler.
    pub fn glslang_stage_arg(&self) -> &'static str {
        match self {
            Stage::Vertex => "vert",
            Stage::Fragment => "frag",
            Stage::Compute => "comp",
        }
    }

    /// `VkShaderStageFlagBits` enumerator emitted into `ShaderSpec`.
    pub fn vk_stage_flag_bits(&self) -> &'static str {
        match self {
            Stage::Vertex => "VK_SHADER_STAGE_VERTEX_BIT",
            Stage::Fragment => "VK_SHADER_STAGE_FRAGMENT_BIT",
            Stage::Compute => "VK_SHADER_STAGE_COMPUTE_BIT",
        }
    }
}

/// Vertex input rate: per-vertex or per-instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rate {
    Vertex,
    Instance,
}

impl Rate {
    pub fn vk_input_rate(&self) -> &'static str {
        match self {
            Rate::Vertex => "VK_VERTEX_INPUT_RATE_VERTEX",
            Rate::Instance => "VK_VERTEX_INPUT_RATE_INSTANCE",
        }
    }
}

/// Kind of shader resource bound at a `(set, binding)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    Sampler2D,
    UniformBuffer,
}

impl DescriptorType {
    pub fn vk_descriptor_type(&self) -> &'static str {
        match self {
            DescriptorType::Sampler2D => "VK_DESCRIPTOR_TYPE_COMBINED_IMAGE_SAMPLER",
            DescriptorType::UniformBuffer => "VK_DESCRIPTOR_TYPE_UNIFORM_BUFFER",
        }
    }
}

/// A parsed `LOCATION n BINDING b RATE_* OFFSET (k|TIGHTLY_PACKED)` in a
/// vertex stage, paired with the `in T id;` declaration that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub binding: u32,
    pub glsl_type: GlslType,
    pub rate: Rate,
    pub identifier: String,
    pub offset: Option<u32>,
    pub is_tightly_packed: bool,
}

/// A single member of a parsed uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructMember {
    pub name: String,
    pub glsl_type: GlslType,
    pub offset: u32,
    pub size: u32,
    pub array_size: Option<u32>,
}

/// A parsed `uniform TypeName { ... } identifier;` uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDescription {
    pub typename: String,
    pub identifier: String,
    pub size: u32,
    pub members: Vec<StructMember>,
}

/// A descriptor binding recovered after a `SET_BINDING` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetBindingLayout {
    pub set_id: u32,
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    pub struct_desc: Option<StructDescription>,
    pub buffer_label: Option<String>,
}

/// A byte range of the original source plus its two backend substitutions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSlice {
    pub start: usize,
    pub end: usize,
    pub vulkan_text: String,
    pub opengl_text: String,
}

/// Which of the two cross-compiled outputs a caller wants rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Vulkan,
    OpenGl,
}
