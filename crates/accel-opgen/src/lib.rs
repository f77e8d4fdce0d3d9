//! Operator registration generator.
//!
//! Reads a JSON operator schema ([`load_operators`]) and emits, per operator,
//! a native source with the attribute container, type relation, constructor
//! and registration ([`generate`]), plus a host binding that forwards to the
//! registered constructor. All schema errors are raised while loading, so a
//! bad schema never produces partial output.

mod error;
mod generate;
pub mod schema;

pub use error::SchemaError;
pub use generate::{BINDING_FILE, GeneratedOperator, generate, write_sources};
pub use schema::{
    AttrType, Attribute, DefaultValue, Input, InputType, OperatorSpec, Output, load_operators,
    parse_operators,
};
