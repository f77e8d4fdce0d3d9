//! Offload passes for accelerator-backed kernels.
//!
//! Provides a [`PrimFuncPass`] trait, the [`OffloadPass`] that replaces a
//! matched compute block with an extern call, and a [`PassManager`] that runs
//! the offload passes of an accelerator over every function of a module.

mod error;
mod extern_call;
mod match_spec;
pub mod matcher;
pub mod params;
mod rewrite;
pub mod shapes;

pub use error::{ErrorClass, OffloadError};
pub use extern_call::{CallArg, ExternCall, extract_extern_calls};
pub use match_spec::{MatchSpec, SeqPrune};
pub use matcher::{BufferBinding, LoopDescriptor, LoopNest};
pub use params::{ZeroPointSource, ZeroPoints, extract_zero_points};
pub use rewrite::{MatchState, RewriteEngine, Rewritten};
pub use shapes::Accelerator;

use std::fmt::{self, Debug};

use accel_ir::{Module, PrimFunc};

/// Severity level for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticLevel {
    /// A recovered failure; the function was left unchanged.
    Warning,
    /// An informational note.
    Info,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "Warning",
            Self::Info => "Info",
        })
    }
}

/// A non-fatal message produced while compiling.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// State shared by the passes of one pipeline run.
#[derive(Clone, Debug, Default)]
pub struct PassContext {
    pub diagnostics: Vec<Diagnostic>,
}

impl PassContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
    }
}

/// A pass over individual primitive functions.
pub trait PrimFuncPass: Debug {
    /// Human-readable name of the pass.
    fn name(&self) -> &str;

    /// Transforms one function. Recoverable failures are reported through
    /// `ctx` and the function is returned unchanged.
    fn transform_function(&self, func: PrimFunc, module: &Module, ctx: &mut PassContext)
    -> PrimFunc;
}

/// Replaces the block described by a [`MatchSpec`] with an extern call.
#[derive(Clone, Debug)]
pub struct OffloadPass {
    name: String,
    engine: RewriteEngine,
}

impl OffloadPass {
    pub fn new(spec: MatchSpec) -> Result<Self, OffloadError> {
        Ok(Self {
            name: format!("offload-{}", spec.extern_name),
            engine: RewriteEngine::new(spec)?,
        })
    }

    pub fn spec(&self) -> &MatchSpec {
        self.engine.spec()
    }
}

impl PrimFuncPass for OffloadPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform_function(
        &self,
        func: PrimFunc,
        _module: &Module,
        ctx: &mut PassContext,
    ) -> PrimFunc {
        let spec = self.engine.spec();
        match self.engine.rewrite(&func) {
            Ok(Some(done)) => {
                log::debug!("{}: offloaded '{}' as {}", self.name, func.name, done.call);
                ctx.diagnostics.push(Diagnostic::info(format!(
                    "'{}': block '{}' replaced by {}",
                    func.name, spec.block_name, done.call
                )));
                done.func
            }
            Ok(None) => {
                log::debug!(
                    "{}: no block '{}' in '{}'",
                    self.name,
                    spec.block_name,
                    func.name
                );
                func
            }
            Err(err) => {
                log::warn!(
                    "{}: '{}' left unchanged ({}): {err}",
                    self.name,
                    func.name,
                    err.class()
                );
                ctx.diagnostics.push(Diagnostic::warning(format!(
                    "'{}': cannot offload block '{}' to {} ({}): {err}",
                    func.name,
                    spec.block_name,
                    spec.extern_name,
                    err.class()
                )));
                func
            }
        }
    }
}

/// Runs function passes in sequence over every function of a module.
#[derive(Debug, Default)]
pub struct PassManager {
    passes: Vec<Box<dyn PrimFuncPass>>,
}

impl PassManager {
    /// Creates an empty pass manager with no passes.
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Creates a pass manager with one offload pass per built-in shape of
    /// `accel`, in catalogue order.
    pub fn for_accelerator(accel: Accelerator) -> Result<Self, OffloadError> {
        let mut pm = Self::new();
        for spec in accel.shapes() {
            pm.add_pass(Box::new(OffloadPass::new(spec)?));
        }
        Ok(pm)
    }

    /// Adds a pass to the pipeline.
    pub fn add_pass(&mut self, pass: Box<dyn PrimFuncPass>) {
        self.passes.push(pass);
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Runs every pass on every function and returns the collected
    /// diagnostics.
    pub fn run(&self, module: &mut Module) -> PassContext {
        let mut ctx = PassContext::new();
        for pass in &self.passes {
            for i in 0..module.functions.len() {
                let func = module.functions[i].clone();
                let func = pass.transform_function(func, module, &mut ctx);
                module.functions[i] = func;
            }
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_module() {
        let pm = PassManager::for_accelerator(Accelerator::VanillaExtended).unwrap();
        let mut module = Module::new();
        let ctx = pm.run(&mut module);
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn function_without_block_is_untouched() {
        let pm = PassManager::for_accelerator(Accelerator::QVanilla).unwrap();
        let mut module = Module::new();
        module.add(PrimFunc::new("main"));
        let before = module.clone();
        let ctx = pm.run(&mut module);
        assert_eq!(module, before);
        assert_eq!(ctx.warnings().count(), 0);
    }

    #[test]
    fn pass_names_follow_catalogue() {
        let pm = PassManager::for_accelerator(Accelerator::QChocolate).unwrap();
        assert_eq!(pm.pass_names(), ["offload-qchocolate_batch_matmul"]);
    }

    #[test]
    fn diagnostic_display() {
        assert_eq!(
            Diagnostic::warning("loop count").to_string(),
            "[Warning] loop count"
        );
        assert_eq!(Diagnostic::info("done").to_string(), "[Info] done");
    }
}
