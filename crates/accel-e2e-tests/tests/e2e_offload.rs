mod common;

use accel_backend::{AccelBackend, BackendRegistry, DiagnosticLevel, IrDumpBackend};
use accel_ir::Module;
use accel_offload::{Accelerator, extract_extern_calls};

#[test]
fn quantised_conv2d_to_c_source() {
    let mut module = Module::new();
    module.add(common::q_conv2d(
        "tvmgen-default-q-vanilla-main-0",
        [1, 4, 8, 8, 4, 3, 3],
        (2, -5),
    ));
    let (ctx, output) =
        common::offload_and_compile(&mut module, Accelerator::QVanilla, &AccelBackend);

    assert_eq!(ctx.warnings().count(), 0);
    let calls = extract_extern_calls(&module.functions[0]);
    assert_eq!(
        calls[0].to_string(),
        "q_vanilla_accelerator_conv2dnchw(placeholder, placeholder_1, T_out, 4, 8, 8, 4, 3, 3, 2, -5)"
    );

    let src = common::text(&output, accel_backend::SOURCE_FILE);
    assert!(src.contains("#include <q_vanilla_accelerator.h>\n"));
    assert!(src.contains(
        "TVM_DLL int32_t tvmgen_default_q_vanilla_main_0(int8_t* placeholder, int8_t* placeholder_1, int32_t* T_out) {"
    ));
    // Zero-points travel in the call; the pruned function has no constants left.
    assert!(src.contains(
        "  DeviceCfg(placeholder, placeholder_1, T_out, cms_data, cms_data_size);"
    ));
    assert!(common::binary(&output, "tvmgen_default_q_vanilla_main_0.cms").is_empty());
}

#[test]
fn even_kernel_stays_on_host() {
    let mut module = Module::new();
    module.add(common::q_conv2d("main", [1, 4, 8, 8, 4, 4, 4], (2, -5)));
    let before = module.clone();
    let (ctx, output) =
        common::offload_and_compile(&mut module, Accelerator::QVanilla, &AccelBackend);

    assert_eq!(module, before);
    let warnings: Vec<_> = ctx.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("invariant violation"), "{}", warnings[0]);
    // Only the (empty) C source; nothing was offloaded.
    assert_eq!(output.files.len(), 1);
    assert_eq!(output.diagnostics[0].level, DiagnosticLevel::Info);
}

#[test]
fn batch_matmul_with_attribute_zero_points() {
    let mut module = Module::new();
    module.add(common::batch_matmul("bmm", [-1, 3, 7], 0.5));
    let (_, output) =
        common::offload_and_compile(&mut module, Accelerator::QChocolate, &AccelBackend);

    let src = common::text(&output, accel_backend::SOURCE_FILE);
    assert!(src.contains("TVM_DLL int32_t bmm(int8_t* A, int8_t* B, int32_t* T_out) {"));
    assert!(src.contains("  DeviceCfg(A, B, T_out, -1, 3, 7, cms_data, cms_data_size);"));
}

#[test]
fn rerunning_the_passes_is_a_no_op() {
    let mut module = Module::new();
    module.add(common::q_conv2d("main", [1, 4, 8, 8, 4, 3, 3], (0, 0)));
    let (first, _) =
        common::offload_and_compile(&mut module, Accelerator::QVanilla, &IrDumpBackend);
    let once = module.clone();
    let (second, _) =
        common::offload_and_compile(&mut module, Accelerator::QVanilla, &IrDumpBackend);

    assert_eq!(module, once);
    assert_eq!(first.diagnostics.len(), 1);
    assert!(second.diagnostics.is_empty());
}

#[test]
fn ir_dump_shows_the_call() {
    let mut module = Module::new();
    module.add(common::q_conv2d("main", [1, 4, 8, 8, 4, 3, 3], (2, -5)));
    let registry = BackendRegistry::with_builtins();
    let backend = registry.find("ir").unwrap();
    let (_, output) = common::offload_and_compile(&mut module, Accelerator::QVanilla, backend);

    let dump = common::text(&output, "module.ir");
    assert!(dump.contains("for n in serial(0, 1) {"), "{dump}");
    assert!(dump.contains("call_extern(\"q_vanilla_accelerator_conv2dnchw\", "), "{dump}");
    assert!(!dump.contains("compute_2"), "{dump}");
}
