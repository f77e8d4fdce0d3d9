//! Per-function compilation artifacts.

use accel_ir::{Attr, PrimFunc};
use accel_offload::{ExternCall, extract_extern_calls, extract_zero_points};

use crate::BackendError;
use crate::command::{CommandWord, encode};

/// Everything the host-side source needs to run one offloaded function.
#[derive(Clone, Debug, PartialEq)]
pub struct CompilationArtifact {
    /// Symbol of the offloaded function.
    pub function_name: String,
    /// Encoded micro-op calls.
    pub command_stream: Vec<CommandWord>,
    /// Zero-points handed to the device, in call order.
    pub zero_points: Vec<i64>,
    /// Requantisation scale, if the function declares one.
    pub scale: Option<f64>,
    /// Buffer arguments of the first extern call.
    pub base_addresses: Vec<String>,
}

impl CompilationArtifact {
    /// Builds the artifact of a rewritten function.
    ///
    /// The function name is the `global_symbol` attribute when present.
    pub fn from_function(func: &PrimFunc) -> Result<Self, BackendError> {
        let calls = extract_extern_calls(func);
        Self::from_calls(func, &calls)
    }

    pub(crate) fn from_calls(func: &PrimFunc, calls: &[ExternCall]) -> Result<Self, BackendError> {
        let function_name = match func.attrs.get("global_symbol") {
            Some(Attr::Str(symbol)) => symbol.clone(),
            _ => func.name.clone(),
        };
        let zp = extract_zero_points(func)?;
        let base_addresses = calls
            .first()
            .map(|call| call.buffer_args().map(str::to_string).collect())
            .unwrap_or_default();
        let command_stream = encode(calls)?;
        log::debug!(
            "artifact '{function_name}': {} extern call(s), {} command word(s)",
            calls.len(),
            command_stream.len()
        );
        Ok(Self {
            function_name,
            command_stream,
            zero_points: zp.values,
            scale: zp.scale,
            base_addresses,
        })
    }

    /// The function name as a C identifier.
    pub fn c_symbol(&self) -> String {
        self.function_name.replace('-', "_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accel_ir::{Buffer, DataType, Statement};

    fn gemm_function() -> PrimFunc {
        let mut f = PrimFunc::new("tvmgen-default-qchocolate-main-0");
        f.add_param_buffer("p0", Buffer::new("A", DataType::INT8, vec![16]));
        f.add_param_buffer("p1", Buffer::new("B", DataType::INT8, vec![16]));
        f.add_param_buffer("p2", Buffer::new("C", DataType::INT32, vec![16]));
        f.set_attr("in1_zp", Attr::Int(1));
        f.set_attr("in2_zp", Attr::Int(-2));
        f.set_attr("out_zp", Attr::Int(0));
        f.set_attr("scale", Attr::Float(0.25));
        let mut stmts = Vec::new();
        for (name, buf, index) in [("uop_load_inp", "A", 0), ("uop_load_wgt", "B", 1)] {
            let mut call = ExternCall::new(name);
            call.push_buffer(&accel_ir::Var::handle(buf));
            for v in [0, 16, 16, index] {
                call.push_int(v);
            }
            let expr = call.lower(&mut f);
            stmts.push(f.append_stmt(Statement::Evaluate(expr)));
        }
        let gemm = ExternCall::new("uop_gemm").lower(&mut f);
        stmts.push(f.append_stmt(Statement::Evaluate(gemm)));
        let body = f.seq(stmts);
        f.with_body(body)
    }

    #[test]
    fn artifact_from_micro_ops() {
        let art = CompilationArtifact::from_function(&gemm_function()).unwrap();
        assert_eq!(art.function_name, "tvmgen-default-qchocolate-main-0");
        assert_eq!(art.c_symbol(), "tvmgen_default_qchocolate_main_0");
        assert_eq!(art.zero_points, [1, -2, 0]);
        assert_eq!(art.scale, Some(0.25));
        assert_eq!(art.base_addresses, ["A"]);
        assert_eq!(
            art.command_stream,
            [
                CommandWord(0x0000_0001),
                CommandWord(0x0001_0002),
                CommandWord(0x0000_0100)
            ]
        );
    }

    #[test]
    fn global_symbol_wins() {
        let mut f = gemm_function();
        f.set_attr("global_symbol", Attr::Str("main".into()));
        assert_eq!(CompilationArtifact::from_function(&f).unwrap().function_name, "main");
    }
}
