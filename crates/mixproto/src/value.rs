//! Decoded parameter values as the bridge hands them to clients.

use serde::{Deserialize, Serialize};

use crate::osc::OscArg;

/// A parameter value decoded from the first argument of a mixer reply.
///
/// Serializes untagged, so clients see plain JSON: `0.75`, `true`, `"Vox"`, `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProtocolValue {
    /// `f`, `i`, `h`, `d`
    Number(f64),
    /// `T` / `F`
    Bool(bool),
    /// `s` and anything else textual, passed through as-is
    Text(String),
    /// `b`, and the `c r m t` tags, passed through as raw bytes
    Blob(Vec<u8>),
    /// `N` / `I`
    Nil,
}

impl ProtocolValue {
    pub fn from_arg(arg: &OscArg) -> Self {
        match arg {
            OscArg::Float(_) | OscArg::Int(_) | OscArg::Long(_) | OscArg::Double(_) => {
                // as_f64 is Some for every numeric tag
                ProtocolValue::Number(arg.as_f64().unwrap_or_default())
            }
            OscArg::True => ProtocolValue::Bool(true),
            OscArg::False => ProtocolValue::Bool(false),
            OscArg::Str(s) => ProtocolValue::Text(s.clone()),
            OscArg::Blob(data) | OscArg::Raw { data, .. } => ProtocolValue::Blob(data.to_vec()),
            OscArg::Nil | OscArg::Impulse => ProtocolValue::Nil,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ProtocolValue::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for ProtocolValue {
    fn from(value: f64) -> Self {
        ProtocolValue::Number(value)
    }
}

impl From<bool> for ProtocolValue {
    fn from(value: bool) -> Self {
        ProtocolValue::Bool(value)
    }
}
