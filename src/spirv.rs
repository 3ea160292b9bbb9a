//! SPIR-V compilation: shells out to an external assembler
//! (`glslangValidator` by default) rather than linking a compiler library
//! in-process, the same way a build-script tool would invoke it as a
//! subprocess with a scratch input file and `-S <stage> -o <out> -V`.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::Stage;

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Failure modes for a single SPIR-V assembler invocation.
#[derive(Debug)]
pub enum SpirvError {
    /// The assembler exited non-zero. `stderr` is its captured diagnostic
    /// output; `vulkan_source` is included so callers can dump it alongside.
    AssemblerFailed {
        stage: Stage,
        stderr: String,
        vulkan_source: String,
    },
    /// The assembler's output file could not be spawned or read at all
    /// (binary missing, scratch directory unwritable, etc).
    Io(std::io::Error),
    /// The produced blob's length was zero or not a multiple of 4.
    InvalidLength { len: usize },
}

impl std::fmt::Display for SpirvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpirvError::AssemblerFailed { stage, stderr, .. } => write!(
                f,
                "SPIR-V assembler failed for stage {:?}: {}",
                stage, stderr
            ),
            SpirvError::Io(e) => write!(f, "SPIR-V assembler I/O error: {}", e),
            SpirvError::InvalidLength { len } => write!(
                f,
                "SPIR-V output length {} is not a positive multiple of 4",
                len
            ),
        }
    }
}

impl std::error::Error for SpirvError {}

impl From<std::io::Error> for SpirvError {
    fn from(e: std::io::Error) -> Self {
        SpirvError::Io(e)
    }
}

/// A scratch file under the system temp directory, removed on drop
/// regardless of the exit path (success, assembler failure, or I/O error
/// mid-read) — mirrors the Python original's `NamedTemporaryFile` lifetime.
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn new(suffix: &str) -> Self {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut path = std::env::temp_dir();
        path.push(format!("shadergen_{}_{}.{}", std::process::id(), n, suffix));
        ScratchFile { path }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// The external SPIR-V assembler, modeled as an injectable effect so tests
/// can point it at a hermetic stub binary instead of a real
/// `glslangValidator`.
pub struct SpirvCompiler {
    glslang_path: String,
}

impl SpirvCompiler {
    pub fn new(glslang_path: impl Into<String>) -> Self {
        SpirvCompiler {
            glslang_path: glslang_path.into(),
        }
    }

    /// Compile one stage's Vulkan GLSL source to a SPIR-V blob.
    pub fn compile(&self, vulkan_glsl: &str, stage: Stage) -> Result<Vec<u8>, SpirvError> {
        let input = ScratchFile::new(stage.glslang_stage_arg());
        let output = ScratchFile::new("spv");

        let mut f = fs::File::create(&input.path)?;
        f.write_all(vulkan_glsl.as_bytes())?;
        drop(f);

        let result = Command::new(&self.glslang_path)
            .arg("-S")
            .arg(stage.glslang_stage_arg())
            .arg("-o")
            .arg(&output.path)
            .arg("-V")
            .arg(&input.path)
            .output()?;

        if !result.status.success() {
            log::error!(
                "glslangValidator failed for stage {:?}\n--- vulkan source ---\n{}\n--- stderr ---\n{}",
                stage,
                vulkan_glsl,
                String::from_utf8_lossy(&result.stderr)
            );
            return Err(SpirvError::AssemblerFailed {
                stage,
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
                vulkan_source: vulkan_glsl.to_owned(),
            });
        }

        let bytes = fs::read(&output.path)?;
        if bytes.is_empty() || bytes.len() % 4 != 0 {
            log::warn!(
                "SPIR-V output for stage {:?} has invalid length {}",
                stage,
                bytes.len()
            );
            return Err(SpirvError::InvalidLength { len: bytes.len() });
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_file_path_is_unique_per_instance() {
        let a = ScratchFile::new("vert");
        let b = ScratchFile::new("vert");
        assert_ne!(a.path, b.path);
    }

    #[test]
    fn missing_assembler_binary_is_an_io_error() {
        let compiler = SpirvCompiler::new("definitely-not-a-real-binary-xyz");
        let result = compiler.compile("#version 450\nvoid main(){}\n", Stage::Fragment);
        assert!(matches!(result, Err(SpirvError::Io(_))));
    }
}
