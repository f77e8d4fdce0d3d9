use accel_backend::{Backend, BackendOptions, BackendOutput};
use accel_ir::{Attr, Buffer, DataType, Module, PrimFunc, Statement, Var};
use accel_offload::{Accelerator, ExternCall, PassContext, PassManager};

/// Run the offload passes of `accel`, then compile with `backend`.
#[allow(dead_code)]
pub fn offload_and_compile(
    module: &mut Module,
    accel: Accelerator,
    backend: &dyn Backend,
) -> (PassContext, BackendOutput) {
    let ctx = PassManager::for_accelerator(accel)
        .expect("built-in shapes are valid")
        .run(module);
    let opts = BackendOptions::default().with_include(format!("<{}.h>", accel.name()));
    let output = backend
        .compile(module, &opts)
        .expect("backend compilation failed");
    (ctx, output)
}

#[allow(dead_code)]
pub fn text<'a>(output: &'a BackendOutput, name: &str) -> &'a str {
    output
        .text(name)
        .unwrap_or_else(|| panic!("no text output '{name}'"))
}

#[allow(dead_code)]
pub fn binary<'a>(output: &'a BackendOutput, name: &str) -> &'a [u8] {
    output
        .bytes(name)
        .unwrap_or_else(|| panic!("no binary output '{name}'"))
}

/// A quantised conv2d with zero-point constants, the conv nest, then
/// requantisation and cast stages. Extents in nest order n, co, h, w, ci, kh, kw.
#[allow(dead_code)]
pub fn q_conv2d(name: &str, d: [i64; 7], zp: (i64, i64)) -> PrimFunc {
    let [n, co, h, w, ci, kh, kw] = d;
    let mut f = PrimFunc::new(name);
    f.add_param_buffer(
        "p0",
        Buffer::new("placeholder", DataType::INT8, vec![n, ci, h + kh - 1, w + kw - 1]),
    );
    f.add_param_buffer("p1", Buffer::new("placeholder_1", DataType::INT8, vec![co, ci, kh, kw]));
    let out = f.add_param_buffer("p2", Buffer::new("T_out", DataType::INT32, vec![n, co, h, w]));

    let mut stmts = Vec::new();
    for v in [zp.0, zp.1] {
        let c = f.add_buffer(Buffer::new("compile_engine_const", DataType::INT32, vec![]));
        let value = f.int(v);
        stmts.push(f.store(c, vec![], value));
    }
    let acc = f.add_buffer(Buffer::new("compute", DataType::INT32, vec![n, co, h, w]));
    let zero = f.int(0);
    let store = f.store(acc, vec![zero, zero, zero, zero], zero);
    let block = f.block("compute_2", store);
    let keys = ["n", "co", "h", "w", "ci", "kh", "kw"];
    let loops: Vec<_> = keys.iter().zip(d).map(|(&k, e)| (k, 0, e)).collect();
    stmts.push(f.loop_nest(&loops, block));
    let requant = f.store(acc, vec![zero], zero);
    stmts.push(f.serial_loop("ax0", 0, co, requant));
    let cast = f.store(out, vec![zero], zero);
    stmts.push(f.serial_loop("ax0", 0, co, cast));
    let body = f.seq(stmts);
    f.with_body(body)
}

/// A batch matmul whose quantisation parameters are function attributes.
#[allow(dead_code)]
pub fn batch_matmul(name: &str, zp: [i64; 3], scale: f64) -> PrimFunc {
    let mut f = PrimFunc::new(name);
    f.add_param_buffer("p0", Buffer::new("A", DataType::INT8, vec![1, 16, 16]));
    f.add_param_buffer("p1", Buffer::new("B", DataType::INT8, vec![1, 16, 16]));
    let out = f.add_param_buffer("p2", Buffer::new("T_out", DataType::INT32, vec![1, 16, 16]));
    for (key, v) in ["in1_zp", "in2_zp", "out_zp"].into_iter().zip(zp) {
        f.set_attr(key, Attr::Int(v));
    }
    f.set_attr("scale", Attr::Float(scale));
    let zero = f.int(0);
    let store = f.store(out, vec![zero], zero);
    let block = f.block("T_batch_matmul_NT", store);
    let nest = f.loop_nest(&[("b", 0, 1), ("i", 0, 16), ("j", 0, 16), ("k", 0, 16)], block);
    let requant = f.store(out, vec![zero], zero);
    let tail = f.serial_loop("ax", 0, 256, requant);
    let body = f.seq(vec![nest, tail]);
    f.with_body(body)
}

/// A kernel already lowered to micro-ops: `(routine, buffer, index)`;
/// `buffer` is `None` for compute ops.
#[allow(dead_code)]
pub fn micro_op_kernel(name: &str, ops: &[(&str, Option<&str>, i64)]) -> PrimFunc {
    let mut f = PrimFunc::new(name);
    f.add_param_buffer("p0", Buffer::new("A", DataType::INT8, vec![16]));
    f.add_param_buffer("p1", Buffer::new("B", DataType::INT8, vec![16]));
    f.add_param_buffer("p2", Buffer::new("C", DataType::INT32, vec![16]));
    f.set_attr("in1_zp", Attr::Int(1));
    f.set_attr("in2_zp", Attr::Int(-2));
    f.set_attr("out_zp", Attr::Int(0));
    let mut stmts = Vec::new();
    for &(routine, buffer, index) in ops {
        let mut call = ExternCall::new(routine);
        if let Some(buffer) = buffer {
            call.push_buffer(&Var::handle(buffer));
            for v in [0, 16, 16, index] {
                call.push_int(v);
            }
        }
        let expr = call.lower(&mut f);
        stmts.push(f.append_stmt(Statement::Evaluate(expr)));
    }
    let body = f.seq(stmts);
    f.with_body(body)
}
