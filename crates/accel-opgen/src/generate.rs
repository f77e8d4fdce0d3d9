//! Native registration source and host binding for one operator.

use std::path::{Path, PathBuf};

use crate::SchemaError;
use crate::schema::{OperatorSpec, escape};

/// Name of the file that collects the host bindings of every operator.
pub const BINDING_FILE: &str = "strategies.py";

/// Sources generated for one operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedOperator {
    /// File name of the native source, `<operator>.cc`.
    pub file_name: String,
    pub native_source: String,
    pub binding_source: String,
}

/// Generates both sources for `spec`.
pub fn generate(spec: &OperatorSpec) -> GeneratedOperator {
    GeneratedOperator {
        file_name: format!("{}.cc", spec.name),
        native_source: native_source(spec),
        binding_source: binding_source(spec),
    }
}

/// Generates every operator, then writes `<operator>.cc` files and one
/// binding file into `out_dir`. Returns the written paths.
pub fn write_sources(specs: &[OperatorSpec], out_dir: &Path) -> Result<Vec<PathBuf>, SchemaError> {
    let generated: Vec<GeneratedOperator> = specs.iter().map(generate).collect();

    let io = |path: &Path| {
        let path = path.to_path_buf();
        move |source| SchemaError::Io { path, source }
    };
    std::fs::create_dir_all(out_dir).map_err(io(out_dir))?;

    let mut written = Vec::with_capacity(generated.len() + 1);
    let mut bindings = String::new();
    for op in &generated {
        let path = out_dir.join(&op.file_name);
        std::fs::write(&path, &op.native_source).map_err(io(&path))?;
        log::debug!("wrote {}", path.display());
        written.push(path);
        bindings.push('\n');
        bindings.push_str(&op.binding_source);
    }
    let path = out_dir.join(BINDING_FILE);
    std::fs::write(&path, bindings).map_err(io(&path))?;
    written.push(path);
    Ok(written)
}

fn native_source(spec: &OperatorSpec) -> String {
    let acc = &spec.accelerator;
    let mut out = String::new();
    out.push_str("/*!\n");
    out.push_str(&format!(" * \\file src/relay/op/contrib/{acc}/{}.cc\n", spec.name));
    out.push_str(&format!(
        " * \\brief Operator definitions for the {acc} {} ops.\n",
        spec.name
    ));
    out.push_str(" */\n");
    out.push_str("#include <tvm/relay/op.h>\n");
    out.push_str("#include \"../../../qnn/utils.h\"\n");
    out.push_str("#include \"../../op_common.h\"\n\n");
    for ns in ["tvm", "relay", "op", "contrib", acc] {
        out.push_str(&format!("namespace {ns} {{\n"));
    }
    out.push('\n');
    attr_node(&mut out, spec);
    out.push('\n');
    type_relation(&mut out, spec);
    out.push('\n');
    constructor(&mut out, spec);
    out.push('\n');
    registration(&mut out, spec);
    out.push('\n');
    for ns in [acc.as_str(), "contrib", "op", "relay", "tvm"] {
        out.push_str(&format!("}}  // namespace {ns}\n"));
    }
    out
}

fn attr_node(out: &mut String, spec: &OperatorSpec) {
    let node = spec.node_name();
    out.push_str(&format!("/*! \\brief Attributes used in {node} operator */\n"));
    out.push_str(&format!(
        "struct {node}Attrs : public tvm::AttrsNode<{node}Attrs> {{\n"
    ));
    for attr in &spec.attributes {
        out.push_str(&format!("  {} {};\n", attr.ty.native(), attr.name));
    }
    out.push_str(&format!(
        "  TVM_DECLARE_ATTRS({node}Attrs, \"relay.attrs.{node}Attrs\") {{\n"
    ));
    for attr in &spec.attributes {
        out.push_str(&format!(
            "    TVM_ATTR_FIELD({}).describe(\"{}\")",
            attr.name,
            escape(&attr.description)
        ));
        if let Some(default) = &attr.default {
            out.push_str(&format!(".set_default({})", default.literal()));
        }
        out.push_str(";\n");
    }
    out.push_str("  }\n};\n\n");
    out.push_str(&format!("TVM_REGISTER_NODE_TYPE({node}Attrs);\n"));
}

fn type_relation(out: &mut String, spec: &OperatorSpec) {
    let node = spec.node_name();
    let num_inputs = spec.inputs.len();
    out.push_str(&format!(
        "bool {node}Rel(const Array<Type>& types, int num_inputs, const Attrs& attrs, \
         const TypeReporter& reporter) {{\n"
    ));
    out.push_str(&format!(
        "    ICHECK_EQ(types.size(), {}) << \"Expects {} types, {num_inputs} for the input and \
         another for the output\";\n",
        num_inputs + 1,
        num_inputs + 1
    ));
    for (idx, input) in spec.inputs.iter().enumerate() {
        out.push_str(&format!(
            "    const auto* {} = types[{idx}].as<TensorTypeNode>();\n",
            input.name
        ));
        out.push_str(&format!("    if ({} == nullptr) return false;\n", input.name));
    }
    out.push('\n');
    out.push_str(&format!("    const auto* param = attrs.as<{node}Attrs>();\n"));
    out.push_str(&format!(
        "    ICHECK(param != nullptr) << \"{node}Attrs cannot be nullptr.\";\n"
    ));
    out.push_str(&format!("    DataType out_dtype = DataType::{};\n", spec.output.dtype));
    out.push_str(&format!("    {}\n", spec.output.shape_rule));
    out.push_str(&format!(
        "    reporter->Assign(types[{num_inputs}], TensorType(out_shape, out_dtype));\n"
    ));
    out.push_str("    return true;\n}\n");
}

fn constructor(out: &mut String, spec: &OperatorSpec) {
    let node = spec.node_name();
    let params: Vec<String> = spec
        .inputs
        .iter()
        .map(|i| format!("Expr {}", i.name))
        .chain(
            spec.attributes
                .iter()
                .map(|a| format!("{} {}", a.ty.native(), a.name)),
        )
        .collect();
    let inputs: Vec<&str> = spec.inputs.iter().map(|i| i.name.as_str()).collect();

    out.push_str(&format!("Expr Make{node}({}) {{\n", params.join(", ")));
    out.push_str(&format!("    auto attrs = make_object<{node}Attrs>();\n"));
    for attr in &spec.attributes {
        out.push_str(&format!("    attrs->{0} = {0};\n", attr.name));
    }
    out.push_str(&format!(
        "    static const Op& op = Op::Get(\"{}\");\n",
        spec.qualified_name()
    ));
    out.push_str(&format!(
        "    return Call(op, {{{}}}, Attrs(attrs), {{}});\n",
        inputs.join(", ")
    ));
    out.push_str("}\n");
    out.push_str(&format!(
        "TVM_REGISTER_GLOBAL(\"relay.op._make.{}\").set_body_typed(Make{node});\n",
        spec.binding_name()
    ));
}

fn registration(out: &mut String, spec: &OperatorSpec) {
    out.push_str(&format!("RELAY_REGISTER_OP(\"{}\")\n", spec.qualified_name()));
    out.push_str("    .describe(\n");
    out.push_str(&format!(
        "        R\"doc({})doc\" TVM_ADD_FILELINE)\n",
        spec.description
    ));
    out.push_str(&format!("    .set_num_inputs({})\n", spec.inputs.len()));
    for input in &spec.inputs {
        out.push_str(&format!(
            "    .add_argument(\"{}\", \"{}\", \"{}\")\n",
            input.name,
            input.ty,
            escape(&input.description)
        ));
    }
    out.push_str(&format!("    .set_support_level({})\n", spec.support_level));
    out.push_str(&format!(
        "    .add_type_rel(\"{0}\", {0}Rel)\n",
        spec.node_name()
    ));
    out.push_str("    .set_attr<TOpPattern>(\"TOpPattern\", kOpaque);\n");
}

fn binding_source(spec: &OperatorSpec) -> String {
    let name = spec.binding_name();
    let mut params = Vec::new();
    let mut args = Vec::new();
    for input in &spec.inputs {
        params.push(format!("{}: {}", input.name, input.ty.binding()));
        args.push(input.name.as_str());
    }
    for attr in &spec.attributes {
        let mut param = format!("{}: {}", attr.name, attr.ty.binding());
        if let Some(default) = &attr.default {
            param.push_str(&format!(" = {}", default.literal()));
        }
        params.push(param);
        args.push(attr.name.as_str());
    }

    let mut out = String::new();
    out.push_str("import tvm  # type: ignore\n");
    out.push_str("from tvm.relay.op import _make  # type: ignore\n\n");
    out.push_str(&format!("def {name}(\n"));
    out.push_str(&format!("    {}\n", params.join(",\n    ")));
    out.push_str(") -> tvm.relay.Call:\n\n");
    out.push_str(&format!("    return _make.{name}(\n"));
    out.push_str(&format!("    {}\n", args.join(",\n    ")));
    out.push_str("    )\n");
    out
}
