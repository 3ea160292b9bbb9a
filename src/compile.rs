//! Per-shader compile orchestration: wires the lexer, directive parser,
//! text rewriter, vertex-layout derivation, and SPIR-V assembler into the
//! one `CompiledShader` record the header emitter consumes.

use crate::aggregate::INVALID_VERTEX_LAYOUT;
use crate::directive::{self, AmbiguousDirectiveError};
use crate::rewriter::rewrite;
use crate::spirv::{SpirvCompiler, SpirvError};
use crate::token::lex;
use crate::types::{Backend, SetBindingLayout, Stage};
use crate::vertex_layout::{derive_vertex_layout, VertexLayoutError, VulkanVertexLayout};

/// `vertex_layout_id` starts at the `INVALID_VERTEX_LAYOUT` sentinel and is
/// overwritten by the caller once the global vertex-layout registry has
/// assigned this shader's canonical enum name (see `aggregate::GlobalState`).
#[derive(Debug, Clone)]
pub struct CompiledShader {
    pub name: String,
    pub spirv: Vec<u8>,
    pub opengl_source: String,
    pub stage: Stage,
    pub vertex_layout_id: String,
}

/// Everything one shader's compile pass produces before global aggregation:
/// the compiled shader record plus the data that still needs folding into
/// `aggregate::GlobalState`.
pub struct CompileUnit {
    pub shader: CompiledShader,
    pub vertex_layout: VulkanVertexLayout,
    pub descriptor_bindings: Vec<SetBindingLayout>,
    /// The rewritten Vulkan GLSL, kept around for `--dump-vulkan-source`
    /// and for dumping alongside an assembler failure.
    pub vulkan_source: String,
}

/// Taxonomy of per-shader compile failures. An `AmbiguousDirective` is the
/// one kind the driver treats as fatal to the whole batch; everything else
/// drops just this shader.
#[derive(Debug)]
pub enum CompileError {
    AmbiguousDirective(AmbiguousDirectiveError),
    VertexLayout(VertexLayoutError),
    Spirv(SpirvError),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::AmbiguousDirective(e) => write!(f, "{}", e),
            CompileError::VertexLayout(e) => write!(f, "{}", e),
            CompileError::Spirv(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CompileError {}

/// Compile one shader source through the full pipeline. `name` should
/// already be a C-identifier-safe, batch-unique string (the driver derives
/// it as `<file-stem>_<stage>`).
pub fn compile(
    name: &str,
    stage: Stage,
    source: &str,
    spirv_compiler: &SpirvCompiler,
) -> Result<CompileUnit, CompileError> {
    let tokens = lex(source);
    let parsed = directive::parse(&tokens, stage).map_err(CompileError::AmbiguousDirective)?;

    let vulkan_glsl = rewrite(source, &parsed.slices, Backend::Vulkan);
    let opengl_glsl = rewrite(source, &parsed.slices, Backend::OpenGl);

    let vertex_layout = if stage == Stage::Vertex {
        derive_vertex_layout(&parsed.vertex_attributes).map_err(CompileError::VertexLayout)?
    } else {
        VulkanVertexLayout::default()
    };

    let spirv = spirv_compiler
        .compile(&vulkan_glsl, stage)
        .map_err(CompileError::Spirv)?;

    Ok(CompileUnit {
        shader: CompiledShader {
            name: name.to_owned(),
            spirv,
            opengl_source: opengl_glsl,
            stage,
            vertex_layout_id: INVALID_VERTEX_LAYOUT.to_owned(),
        },
        vertex_layout,
        descriptor_bindings: parsed.descriptor_bindings,
        vulkan_source: vulkan_glsl,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spirv_length_is_multiple_of_four() {
        // The stub assembler used in tests never actually runs
        // glslangValidator; exercise the plumbing instead with a compiler
        // pointed at a binary we know fails, and assert the error path
        // does not panic.
        let compiler = SpirvCompiler::new("definitely-not-a-real-binary-xyz");
        let src = "#version {{ VERSION }}\nvoid main(){}\n";
        let result = compile("basic_frag", Stage::Fragment, src, &compiler);
        assert!(matches!(result, Err(CompileError::Spirv(SpirvError::Io(_)))));
    }

    #[test]
    fn ambiguous_directive_is_a_fatal_variant() {
        let compiler = SpirvCompiler::new("definitely-not-a-real-binary-xyz");
        let src = "{{ NOT_A_DIRECTIVE }}";
        let result = compile("bad_frag", Stage::Fragment, src, &compiler);
        assert!(matches!(result, Err(CompileError::AmbiguousDirective(_))));
    }

    #[test]
    fn duplicate_location_surfaces_as_vertex_layout_error() {
        let compiler = SpirvCompiler::new("definitely-not-a-real-binary-xyz");
        let src = "{{ LOCATION 0 BINDING 0 RATE_VERTEX OFFSET TIGHTLY_PACKED }} in vec3 pos;\n\
                   {{ LOCATION 0 BINDING 0 RATE_VERTEX OFFSET TIGHTLY_PACKED }} in vec2 uv;\n";
        let result = compile("dup_vert", Stage::Vertex, src, &compiler);
        assert!(matches!(result, Err(CompileError::VertexLayout(_))));
    }
}
