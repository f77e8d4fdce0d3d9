//! Host-side C source for a set of compilation artifacts.
//!
//! Each artifact becomes a command-stream array in `.rodata.tvm` and an
//! `extern "C"` entry point that hands the buffers, zero-points and stream to
//! the device runtime (`DeviceCfg`) and starts it (`DeviceRun`).

use crate::artifact::CompilationArtifact;

const HEADER: &str = "\
#include <stdio.h>
#include <stdlib.h>
#include <tvm/runtime/crt/module.h>
";

/// Emits one C translation unit for `artifacts`. `includes` are extra
/// `#include` lines (e.g. the accelerator's runtime interface).
pub fn emit_source_module(artifacts: &[CompilationArtifact], includes: &[String]) -> String {
    let mut out = String::from(HEADER);
    for include in includes {
        out.push_str(&format!("#include {include}\n"));
    }
    out.push_str("\n\n");
    for artifact in artifacts {
        emit_function(&mut out, artifact);
        out.push_str("\n\n");
    }
    out
}

fn emit_function(out: &mut String, artifact: &CompilationArtifact) {
    let symbol = artifact.c_symbol();
    let words: Vec<String> = artifact
        .command_stream
        .iter()
        .map(|w| (w.0 as i32).to_string())
        .collect();
    // C forbids zero-length arrays.
    let (len, init) = if words.is_empty() {
        (1, "0".to_string())
    } else {
        (words.len(), words.join(", "))
    };

    out.push_str(
        "// Update linker script to place .rodata.tvm in memory that can be accessed by the NPU\n",
    );
    out.push_str(&format!(
        "__attribute__((section(\".rodata.tvm\"), )) static int32_t {symbol}_cms_data_data[{len}] = {{{init}}};\n"
    ));
    out.push_str("#ifdef __cplusplus\nextern \"C\" {\n#endif\n");

    let last = artifact.base_addresses.len().saturating_sub(1);
    let params: Vec<String> = artifact
        .base_addresses
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let ty = if i == last { "int32_t" } else { "int8_t" };
            format!("{ty}* {name}")
        })
        .collect();
    out.push_str(&format!("TVM_DLL int32_t {symbol}({}) {{\n", params.join(", ")));
    out.push_str(&format!("  void* cms_data = (void*)({symbol}_cms_data_data);\n"));
    out.push_str(&format!(
        "  const size_t cms_data_size = {};\n",
        artifact.command_stream.len()
    ));
    out.push('\n');

    let cfg_args: Vec<String> = artifact
        .base_addresses
        .iter()
        .cloned()
        .chain(artifact.zero_points.iter().map(i64::to_string))
        .chain(["cms_data".to_string(), "cms_data_size".to_string()])
        .collect();
    out.push_str(&format!("  DeviceCfg({});\n", cfg_args.join(", ")));
    out.push_str("  int32_t result = DeviceRun();\n");
    out.push_str("  if (result != 0) { return -1; }\n\n");
    out.push_str("  return result;\n}\n\n");
    out.push_str("#ifdef __cplusplus\n}\n#endif\n\n");
}
