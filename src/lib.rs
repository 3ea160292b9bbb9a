//! Shader template cross-compiler and code generator.
//!
//! Ingests a GLSL superset annotated with portable directives and emits a
//! Vulkan-compatible GLSL form (further assembled to SPIR-V), an
//! OpenGL-compatible GLSL form, and a generated C/C++ header embedding both
//! alongside descriptor and vertex-layout metadata for the engine's runtime
//! loader.

pub mod aggregate;
pub mod compile;
pub mod descriptor;
pub mod directive;
pub mod header;
pub mod rewriter;
pub mod spirv;
pub mod struct_layout;
pub mod token;
pub mod types;
pub mod vertex_layout;
