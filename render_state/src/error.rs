#![allow(missing_docs)]

use core::fmt;
use std::error;

use num_enum::{TryFromPrimitive, TryFromPrimitiveError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStateError {
    InvalidSelector { kind: &'static str, value: i64 },
    InvalidConfig(String),
}

impl fmt::Display for RenderStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderStateError::InvalidSelector { kind, value } => {
                write!(f, "invalid {} selector: {}", kind, value)
            }
            RenderStateError::InvalidConfig(message) => {
                write!(f, "invalid render state config: {}", message)
            }
        }
    }
}

impl error::Error for RenderStateError {}

impl<T> From<TryFromPrimitiveError<T>> for RenderStateError
where
    T: TryFromPrimitive,
    T::Primitive: Into<i64>,
{
    fn from(v: TryFromPrimitiveError<T>) -> Self {
        Self::InvalidSelector {
            kind: T::NAME,
            value: v.number.into(),
        }
    }
}

impl From<serde_json::Error> for RenderStateError {
    fn from(v: serde_json::Error) -> Self {
        Self::InvalidConfig(v.to_string())
    }
}
