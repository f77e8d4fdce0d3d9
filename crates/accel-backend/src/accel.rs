//! The C + command-stream backend.

use accel_ir::Module;
use accel_offload::{Diagnostic, extract_extern_calls};

use crate::artifact::CompilationArtifact;
use crate::c_source::emit_source_module;
use crate::command::to_le_bytes;
use crate::{Backend, BackendError, BackendOptions, BackendOutput, OutputContent, OutputFile};

/// File name of the generated C translation unit.
pub const SOURCE_FILE: &str = "accel_module.c";

/// Compiles rewritten functions to one C source file plus one binary command
/// stream (`<symbol>.cms`, little-endian words) per offloaded function.
///
/// Functions without extern calls were not offloaded and are skipped.
#[derive(Debug)]
pub struct AccelBackend;

impl Backend for AccelBackend {
    fn name(&self) -> &'static str {
        "accel-c"
    }

    fn targets(&self) -> &'static [&'static str] {
        &["accel-c", "c"]
    }

    fn compile(
        &self,
        module: &Module,
        opts: &BackendOptions,
    ) -> Result<BackendOutput, BackendError> {
        let mut artifacts = Vec::new();
        let mut diagnostics = Vec::new();
        for func in &module.functions {
            let calls = extract_extern_calls(func);
            if calls.is_empty() {
                diagnostics.push(Diagnostic::info(format!(
                    "'{}' has no extern calls; not offloaded",
                    func.name
                )));
                continue;
            }
            let artifact = CompilationArtifact::from_calls(func, &calls)?;
            if artifact.base_addresses.is_empty() {
                return Err(BackendError::Unsupported(format!(
                    "'{}': first extern call '{}' passes no buffers",
                    func.name, calls[0].name
                )));
            }
            artifacts.push(artifact);
        }

        let mut files = vec![OutputFile {
            name: SOURCE_FILE.into(),
            content: OutputContent::Text(emit_source_module(&artifacts, &opts.includes)),
        }];
        for artifact in &artifacts {
            files.push(OutputFile {
                name: format!("{}.cms", artifact.c_symbol()),
                content: OutputContent::Binary(to_le_bytes(&artifact.command_stream)),
            });
        }
        Ok(BackendOutput { files, diagnostics })
    }
}
