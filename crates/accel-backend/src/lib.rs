//! Code generation for offloaded modules.
//!
//! A [`Backend`] turns a module that has been through the offload passes into
//! output files. [`AccelBackend`] emits the host C source and one binary
//! command stream per offloaded function; [`IrDumpBackend`] prints the IR.
//! [`BackendRegistry`] picks a backend by target name.

#![warn(missing_docs)]

mod accel;
mod artifact;
mod c_source;
pub mod command;

pub use accel::{AccelBackend, SOURCE_FILE};
pub use accel_offload::{Diagnostic, DiagnosticLevel};
pub use artifact::CompilationArtifact;
pub use c_source::emit_source_module;
pub use command::{CommandWord, EncodeError, Opcode, decode, encode};

use std::fmt::Debug;

use accel_ir::Module;
use accel_offload::OffloadError;

/// Compiles a rewritten module into output files.
pub trait Backend: Debug + Send + Sync {
    /// Short name used in logs and listings.
    fn name(&self) -> &'static str;

    /// Target names this backend answers to. The first is canonical.
    fn targets(&self) -> &'static [&'static str];

    /// Produces the output files for `module`.
    fn compile(&self, module: &Module, opts: &BackendOptions)
    -> Result<BackendOutput, BackendError>;

    /// Whether `target` names this backend.
    fn handles(&self, target: &str) -> bool {
        self.targets().contains(&target)
    }
}

/// Settings shared by every backend.
#[derive(Clone, Debug, Default)]
pub struct BackendOptions {
    /// Extra `#include` targets for generated C, e.g. `"<qchocolate.h>"`.
    pub includes: Vec<String>,
}

impl BackendOptions {
    /// Adds one `#include` target.
    pub fn with_include(mut self, include: impl Into<String>) -> Self {
        self.includes.push(include.into());
        self
    }
}

/// Files and notes produced by one [`Backend::compile`] call.
#[derive(Clone, Debug, Default)]
pub struct BackendOutput {
    /// Generated files, in emission order.
    pub files: Vec<OutputFile>,
    /// Notes raised while compiling.
    pub diagnostics: Vec<Diagnostic>,
}

impl BackendOutput {
    /// The output file called `name`.
    pub fn file(&self, name: &str) -> Option<&OutputFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Contents of the text file `name`.
    pub fn text(&self, name: &str) -> Option<&str> {
        match &self.file(name)?.content {
            OutputContent::Text(text) => Some(text),
            OutputContent::Binary(_) => None,
        }
    }

    /// Contents of the binary file `name`.
    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        match &self.file(name)?.content {
            OutputContent::Binary(bytes) => Some(bytes),
            OutputContent::Text(_) => None,
        }
    }
}

/// One generated file.
#[derive(Clone, Debug)]
pub struct OutputFile {
    /// File name relative to the output directory.
    pub name: String,
    /// What gets written.
    pub content: OutputContent,
}

/// Contents of an [`OutputFile`].
#[derive(Clone, Debug)]
pub enum OutputContent {
    /// Source text.
    Text(String),
    /// Raw bytes, e.g. a command stream.
    Binary(Vec<u8>),
}

impl OutputContent {
    /// The content as it would be written to disk.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }
}

/// Errors raised by [`Backend::compile`].
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The module cannot be expressed for this target.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// A micro-op call could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// Quantisation parameters could not be read.
    #[error(transparent)]
    Offload(#[from] OffloadError),
}

/// Backends selectable by target name.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    entries: Vec<Box<dyn Backend>>,
}

impl BackendRegistry {
    /// The IR dump and accelerator backends.
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        registry.register(Box::new(IrDumpBackend));
        registry.register(Box::new(AccelBackend));
        registry
    }

    /// Adds `backend`; earlier registrations win on shared targets.
    pub fn register(&mut self, backend: Box<dyn Backend>) {
        self.entries.push(backend);
    }

    /// The first registered backend answering to `target`.
    pub fn find(&self, target: &str) -> Option<&dyn Backend> {
        self.entries
            .iter()
            .map(|b| b.as_ref())
            .find(|b| b.handles(target))
    }

    /// Every target name, in registration order.
    pub fn targets(&self) -> Vec<&'static str> {
        self.entries.iter().flat_map(|b| b.targets().iter().copied()).collect()
    }
}

/// Prints the module with [`accel_ir::dump_module`].
#[derive(Debug)]
pub struct IrDumpBackend;

impl Backend for IrDumpBackend {
    fn name(&self) -> &'static str {
        "ir-dump"
    }

    fn targets(&self) -> &'static [&'static str] {
        &["ir-dump", "ir"]
    }

    fn compile(
        &self,
        module: &Module,
        _opts: &BackendOptions,
    ) -> Result<BackendOutput, BackendError> {
        Ok(BackendOutput {
            files: vec![OutputFile {
                name: "module.ir".into(),
                content: OutputContent::Text(accel_ir::dump_module(module)),
            }],
            diagnostics: Vec::new(),
        })
    }
}
