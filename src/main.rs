//! Driver binary: walks a shader directory, compiles every `<name>.<stage>.in`
//! file through the template cross-compiler, and emits the generated C/C++
//! header. Kept thin on purpose — filesystem traversal, CLI parsing, and
//! wiring the library's passes together, with no cross-compilation logic
//! of its own.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, error, info, warn};
use walkdir::WalkDir;

use gfx2_shadergen::aggregate::GlobalState;
use gfx2_shadergen::compile::{self, CompileError};
use gfx2_shadergen::header;
use gfx2_shadergen::spirv::SpirvCompiler;
use gfx2_shadergen::types::Stage;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Shader template cross-compiler and header generator")]
struct Args {
    /// Directory to walk for `<name>.<stage>.in` shader template files.
    #[clap(long, default_value = "shaders")]
    shader_dir: PathBuf,

    /// Path of the generated header. Defaults to `<shader-dir>/gen/generated_shaders.h`.
    #[clap(long)]
    out: Option<PathBuf>,

    /// Ignore timestamps and recompile everything. Accepted for
    /// compatibility with the original build script; this tool has no
    /// incremental cache, so it is a no-op (see DESIGN.md).
    #[clap(long)]
    force: bool,

    /// Write the rewritten Vulkan GLSL for each shader next to the header.
    #[clap(long)]
    dump_vulkan_source: bool,

    /// Restrict the walk to one subdirectory of `--shader-dir`.
    #[clap(long)]
    subdir: Option<String>,

    /// Path to the external SPIR-V assembler.
    #[clap(long, default_value = "glslangValidator")]
    glslang: String,
}

/// `<name>.<stage>.in` -> (name, Stage). `None` on any other filename shape.
fn parse_filename(file_name: &str) -> Option<(&str, Stage)> {
    let mut parts = file_name.split('.');
    let name = parts.next()?;
    let stage_str = parts.next()?;
    let suffix = parts.next()?;
    if parts.next().is_some() || suffix != "in" {
        return None;
    }
    let stage = Stage::from_extension(stage_str)?;
    Some((name, stage))
}

fn collect_input_files(root: &Path, subdir: Option<&str>) -> Vec<PathBuf> {
    let walk_root = match subdir {
        Some(s) => root.join(s),
        None => root.to_path_buf(),
    };

    let mut files: Vec<PathBuf> = WalkDir::new(&walk_root)
        .into_iter()
        .filter_entry(|e| e.file_name() != "gen")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

fn default_out_path(shader_dir: &Path) -> PathBuf {
    shader_dir.join("gen").join("generated_shaders.h")
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    if args.force {
        debug!("--force passed; this tool has no incremental cache, ignoring");
    }

    let out_path = args
        .out
        .clone()
        .unwrap_or_else(|| default_out_path(&args.shader_dir));

    let input_files = collect_input_files(&args.shader_dir, args.subdir.as_deref());
    info!(
        "found {} candidate file(s) under {:?}",
        input_files.len(),
        args.shader_dir
    );

    let spirv_compiler = SpirvCompiler::new(args.glslang.clone());
    let mut global = GlobalState::new();
    let mut compiled = Vec::new();

    for path in &input_files {
        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };
        let (base_name, stage) = match parse_filename(file_name) {
            Some(parts) => parts,
            None => {
                warn!(
                    "skipping {:?}: expected a filename of the form <name>.<vert|frag|comp>.in",
                    path
                );
                continue;
            }
        };

        let source = fs::read_to_string(path)?;
        let identifier = format!("{}_{}", base_name, stage.glslang_stage_arg());

        match compile::compile(&identifier, stage, &source, &spirv_compiler) {
            Ok(mut unit) => {
                unit.shader.vertex_layout_id = global.register_vertex_layout(unit.vertex_layout);
                if let Err(e) = global.add_shader_bindings(&unit.descriptor_bindings) {
                    // Only the colliding uniform-block struct is dropped from
                    // the header (handled inside DescriptorAggregator); the
                    // shader itself already compiled fine and still belongs
                    // in generated_shader_specs[].
                    error!("{:?}: {}", path, e);
                }
                if args.dump_vulkan_source {
                    let gen_dir = path.parent().unwrap_or_else(|| Path::new(".")).join("gen");
                    fs::create_dir_all(&gen_dir)?;
                    let dump_path = gen_dir.join(format!("{}.vulkan.glsl", identifier));
                    fs::write(&dump_path, &unit.vulkan_source)?;
                }
                compiled.push(unit.shader);
            }
            Err(CompileError::AmbiguousDirective(e)) => {
                error!("{:?}: {}", path, e);
                return Err(Box::new(e));
            }
            Err(e) => {
                warn!("{:?}: dropping shader: {}", path, e);
            }
        }
    }

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let header_text = header::emit_header(&compiled, &global);
    fs::write(&out_path, header_text)?;
    info!(
        "wrote {} ({} shader(s), {} unique vertex layout(s))",
        out_path.display(),
        compiled.len(),
        global.unique_layouts().count()
    );

    Ok(())
}

fn main() {
    pretty_env_logger::init();
    if let Err(e) = run() {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
