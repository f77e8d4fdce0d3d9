//! Operator schema documents.
//!
//! A schema is a JSON object with an `operators` list. Raw entries are
//! deserialized with serde and then checked into [`OperatorSpec`]s, so every
//! type and default error surfaces at load time.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::SchemaError;

/// Support level registered when an operator does not declare one.
pub const DEFAULT_SUPPORT_LEVEL: u32 = 11;

#[derive(Debug, Deserialize)]
struct RawSchema {
    operators: Vec<RawOperator>,
}

#[derive(Debug, Deserialize)]
struct RawOperator {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    support_level: Option<u32>,
    #[serde(default)]
    attributes: Vec<RawAttribute>,
    #[serde(default)]
    inputs: Vec<RawInput>,
    output: RawOutput,
}

#[derive(Debug, Deserialize)]
struct RawAttribute {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    default: Value,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    #[serde(default)]
    dtype: Option<String>,
    #[serde(default)]
    shape_rule: String,
}

/// Attribute types the generator knows how to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrType {
    Int,
    Double,
    String,
}

impl AttrType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "int" => Some(Self::Int),
            "double" => Some(Self::Double),
            "String" => Some(Self::String),
            _ => None,
        }
    }

    /// The native field type.
    pub fn native(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Double => "double",
            Self::String => "String",
        }
    }

    /// The host binding annotation.
    pub fn binding(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Double => "float",
            Self::String => "str",
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.native())
    }
}

/// Input types the generator knows how to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputType {
    Tensor,
}

impl InputType {
    fn parse(s: &str) -> Option<Self> {
        (s == "Tensor").then_some(Self::Tensor)
    }

    pub fn binding(self) -> &'static str {
        match self {
            Self::Tensor => "tvm.relay.Expr",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Tensor")
    }
}

/// A checked attribute default.
#[derive(Clone, Debug, PartialEq)]
pub enum DefaultValue {
    Int(i64),
    Double(f64),
    Str(String),
}

impl DefaultValue {
    /// The default as a source literal. Strings are quoted.
    pub fn literal(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Double(v) => format!("{v:?}"),
            Self::Str(s) => format!("\"{}\"", escape(s)),
        }
    }
}

/// Escapes `s` for use inside a double-quoted literal of either generated
/// source.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub ty: AttrType,
    pub default: Option<DefaultValue>,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Input {
    pub name: String,
    pub ty: InputType,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Output {
    pub dtype: String,
    /// Source fragment that defines `out_shape`. Emitted verbatim.
    pub shape_rule: String,
}

/// One operator, checked and ready for generation.
#[derive(Clone, Debug, PartialEq)]
pub struct OperatorSpec {
    pub name: String,
    pub accelerator: String,
    pub description: String,
    pub support_level: u32,
    pub inputs: Vec<Input>,
    pub attributes: Vec<Attribute>,
    pub output: Output,
}

impl OperatorSpec {
    /// Registered operator name, e.g. `contrib.qchocolate.matmul`.
    pub fn qualified_name(&self) -> String {
        format!("contrib.{}.{}", self.accelerator, self.name)
    }

    /// Name of the attribute container and type relation.
    pub fn node_name(&self) -> String {
        format!("{}{}", self.accelerator, self.name)
    }

    /// Name of the host binding and its registered constructor.
    pub fn binding_name(&self) -> String {
        format!("{}_{}", self.accelerator, self.name)
    }
}

/// Reads and checks the schema at `path` for `accelerator`.
pub fn load_operators(
    path: Option<&Path>,
    accelerator: &str,
) -> Result<Vec<OperatorSpec>, SchemaError> {
    let path = path.ok_or(SchemaError::MissingConfigPath)?;
    let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("loading operator schema {}", path.display());
    parse_operators(&text, accelerator)
}

/// Parses and checks a schema document. Fails on the first bad operator.
pub fn parse_operators(json: &str, accelerator: &str) -> Result<Vec<OperatorSpec>, SchemaError> {
    let raw: RawSchema = serde_json::from_str(json)?;
    raw.operators
        .into_iter()
        .map(|op| check_operator(op, accelerator))
        .collect()
}

fn check_operator(raw: RawOperator, accelerator: &str) -> Result<OperatorSpec, SchemaError> {
    let operator = raw.name;
    let dtype = match raw.output.dtype {
        Some(dtype) if !dtype.is_empty() => dtype,
        _ => return Err(SchemaError::MissingOutputDtype(operator)),
    };

    let mut inputs = Vec::with_capacity(raw.inputs.len());
    for input in raw.inputs {
        let Some(ty) = InputType::parse(&input.ty) else {
            return Err(SchemaError::UnknownType {
                operator,
                kind: "input",
                name: input.name,
                ty: input.ty,
            });
        };
        inputs.push(Input {
            name: input.name,
            ty,
            description: input.description,
        });
    }

    let mut attributes: Vec<Attribute> = Vec::with_capacity(raw.attributes.len());
    for attr in raw.attributes {
        let Some(ty) = AttrType::parse(&attr.ty) else {
            return Err(SchemaError::UnknownType {
                operator,
                kind: "attribute",
                name: attr.name,
                ty: attr.ty,
            });
        };
        let default = check_default(&attr.default, ty).ok_or_else(|| SchemaError::BadDefault {
            operator: operator.clone(),
            name: attr.name.clone(),
            ty: ty.native(),
            value: attr.default.to_string(),
        })?;
        // Required attributes precede defaulted ones in generated signatures.
        if default.is_none()
            && let Some(prev) = attributes.iter().find(|a| a.default.is_some())
        {
            return Err(SchemaError::RequiredAfterDefault {
                operator,
                name: attr.name,
                after: prev.name.clone(),
            });
        }
        attributes.push(Attribute {
            name: attr.name,
            ty,
            default,
            description: attr.description,
        });
    }

    Ok(OperatorSpec {
        name: operator,
        accelerator: accelerator.to_string(),
        description: raw.description,
        support_level: raw.support_level.unwrap_or(DEFAULT_SUPPORT_LEVEL),
        inputs,
        attributes,
        output: Output {
            dtype,
            shape_rule: raw.output.shape_rule,
        },
    })
}

/// `None` when the value does not fit; `Some(None)` when there is no default.
fn check_default(value: &Value, ty: AttrType) -> Option<Option<DefaultValue>> {
    let default = match (value, ty) {
        (Value::Null, _) => return Some(None),
        (Value::Number(n), AttrType::Int) => DefaultValue::Int(n.as_i64()?),
        (Value::Number(n), AttrType::Double) => DefaultValue::Double(n.as_f64()?),
        (Value::String(s), AttrType::String) => DefaultValue::Str(s.clone()),
        _ => return None,
    };
    Some(Some(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DENSE: &str = r#"{
        "operators": [{
            "name": "dense",
            "description": "Quantised dense layer.",
            "attributes": [
                {"name": "out_zp", "type": "int", "default": null, "description": "output zero-point"},
                {"name": "units", "type": "int", "default": 16, "description": "output units"},
                {"name": "alpha", "type": "double", "default": 1, "description": "scale"},
                {"name": "layout", "type": "String", "default": "NC", "description": "data layout"}
            ],
            "inputs": [
                {"name": "data", "type": "Tensor", "description": "input"},
                {"name": "weight", "type": "Tensor", "description": "weights"}
            ],
            "output": {"dtype": "Int(32)", "shape_rule": "Array<IndexExpr> out_shape = data->shape;"}
        }]
    }"#;

    #[test]
    fn parse_dense() {
        let ops = parse_operators(DENSE, "qchocolate").unwrap();
        assert_eq!(ops.len(), 1);
        let op = &ops[0];
        assert_eq!(op.support_level, DEFAULT_SUPPORT_LEVEL);
        assert_eq!(op.qualified_name(), "contrib.qchocolate.dense");
        assert_eq!(op.node_name(), "qchocolatedense");
        assert_eq!(op.binding_name(), "qchocolate_dense");
        assert_eq!(op.inputs.len(), 2);
        let defaults: Vec<_> = op.attributes.iter().map(|a| a.default.clone()).collect();
        assert_eq!(
            defaults,
            [
                None,
                Some(DefaultValue::Int(16)),
                Some(DefaultValue::Double(1.0)),
                Some(DefaultValue::Str("NC".into()))
            ]
        );
    }

    #[test]
    fn default_literals() {
        assert_eq!(DefaultValue::Int(-3).literal(), "-3");
        assert_eq!(DefaultValue::Double(1.0).literal(), "1.0");
        assert_eq!(DefaultValue::Double(0.25).literal(), "0.25");
        assert_eq!(DefaultValue::Str("NCHW".into()).literal(), "\"NCHW\"");
        assert_eq!(
            DefaultValue::Str(r#"a"b\c"#.into()).literal(),
            r#""a\"b\\c""#
        );
    }

    #[test]
    fn escape_newline() {
        assert_eq!(escape("two\nlines"), "two\\nlines");
    }

    #[test]
    fn required_attribute_after_default() {
        let json = DENSE.replace(r#""default": 1,"#, r#""default": null,"#);
        let err = parse_operators(&json, "qchocolate").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::RequiredAfterDefault { ref name, ref after, .. }
                if name == "alpha" && after == "units"
        ));

        let json = DENSE.replace(r#""default": "NC""#, r#""default": null"#);
        let err = parse_operators(&json, "qchocolate").unwrap_err();
        assert_eq!(
            err.to_string(),
            "operator 'dense': required attribute 'layout' follows defaulted 'units'"
        );
    }

    #[test]
    fn unknown_attribute_type() {
        let json = DENSE.replace(r#""type": "double""#, r#""type": "float16""#);
        let err = parse_operators(&json, "qchocolate").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnknownType { kind: "attribute", ref ty, .. } if ty == "float16"
        ));
    }

    #[test]
    fn unknown_input_type() {
        let json = DENSE.replace(
            r#""type": "Tensor", "description": "weights""#,
            r#""type": "Tuple""#,
        );
        let err = parse_operators(&json, "qchocolate").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType { kind: "input", .. }));
    }

    #[test]
    fn missing_output_dtype() {
        let json = DENSE.replace(r#""dtype": "Int(32)", "#, "");
        let err = parse_operators(&json, "qchocolate").unwrap_err();
        assert!(matches!(err, SchemaError::MissingOutputDtype(ref op) if op == "dense"));
    }

    #[test]
    fn string_default_for_int_attribute() {
        let json = DENSE.replace(r#""default": 16"#, r#""default": "16""#);
        let err = parse_operators(&json, "qchocolate").unwrap_err();
        assert_eq!(
            err.to_string(),
            "operator 'dense': default \"16\" does not fit attribute 'units' of type int"
        );
    }

    #[test]
    fn explicit_support_level() {
        let json = DENSE.replace(r#""name": "dense","#, r#""name": "dense", "support_level": 3,"#);
        assert_eq!(parse_operators(&json, "q").unwrap()[0].support_level, 3);
    }

    #[test]
    fn missing_path() {
        assert!(matches!(
            load_operators(None, "qchocolate"),
            Err(SchemaError::MissingConfigPath)
        ));
    }
}
