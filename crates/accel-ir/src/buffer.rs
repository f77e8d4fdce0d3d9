//! Buffers and their storage scopes.

use crate::expr::Var;
use crate::types::DataType;

/// Memory scope a buffer lives in.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub enum StorageScope {
    #[default]
    Global,
    Shared,
    Local,
}

/// A multi-dimensional view over a data pointer.
#[derive(Clone, Debug, PartialEq)]
pub struct Buffer {
    /// Buffer name as shown in dumps (`placeholder`, `T_relu`, ...).
    pub name: String,
    /// The data pointer. Extern calls receive this variable.
    pub data: Var,
    pub dtype: DataType,
    /// Static shape, outermost dimension first.
    pub shape: Vec<i64>,
    pub scope: StorageScope,
}

impl Buffer {
    /// A global buffer whose data pointer is named after the buffer.
    pub fn new(name: impl Into<String>, dtype: DataType, shape: Vec<i64>) -> Self {
        let name = name.into();
        Self {
            data: Var::handle(name.clone()),
            name,
            dtype,
            shape,
            scope: StorageScope::Global,
        }
    }

    /// Total number of elements.
    pub fn num_elements(&self) -> i64 {
        self.shape.iter().product()
    }
}
