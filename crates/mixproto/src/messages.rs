//! JSON messages exchanged with WebSocket clients.
//!
//! One JSON object per text frame, tagged by `"type"`. The older event names
//! (`add-param`, `remove-param`, `set-param`, `get-color`) are accepted as aliases.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::ProtocolValue;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("address must be a non-empty string")]
    EmptyAddress,

    #[error("value must be a finite number, got {0}")]
    NonFiniteValue(f64),

    #[error("value {0} does not fit in a 32-bit float")]
    ValueOutOfRange(f64),
}

/// Client → bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientRequest {
    #[serde(alias = "add-param")]
    Subscribe { address: String },

    #[serde(alias = "remove-param")]
    Unsubscribe { address: String },

    #[serde(alias = "set-param")]
    Write { address: String, value: f64 },

    #[serde(alias = "get-color")]
    QueryColor {
        #[serde(rename = "colorAddress")]
        color_address: String,
    },
}

impl ClientRequest {
    /// Parse and validate a text frame.
    pub fn from_json(text: &str) -> Result<Self, MessageError> {
        let request: ClientRequest = serde_json::from_str(text)?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), MessageError> {
        if self.address().is_empty() {
            return Err(MessageError::EmptyAddress);
        }
        if let ClientRequest::Write { value, .. } = self {
            if !value.is_finite() {
                return Err(MessageError::NonFiniteValue(*value));
            }
            // Writes go out as OSC `f`
            if value.abs() > f64::from(f32::MAX) {
                return Err(MessageError::ValueOutOfRange(*value));
            }
        }
        Ok(())
    }

    /// The address the request targets (the color slot for `QueryColor`)
    pub fn address(&self) -> &str {
        match self {
            ClientRequest::Subscribe { address }
            | ClientRequest::Unsubscribe { address }
            | ClientRequest::Write { address, .. } => address,
            ClientRequest::QueryColor { color_address } => color_address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamValue {
    pub address: String,
    pub value: ProtocolValue,
}

/// Bridge → client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    Snapshot { params: Vec<ParamValue> },

    LiveUpdate { address: String, value: f64 },

    ColorResponse {
        #[serde(rename = "colorAddress")]
        color_address: String,
        color: Option<i64>,
    },

    LivenessStatus { online: bool },
}

impl ServerEvent {
    pub fn snapshot_of(address: impl Into<String>, value: ProtocolValue) -> Self {
        ServerEvent::Snapshot {
            params: vec![ParamValue {
                address: address.into(),
                value,
            }],
        }
    }

    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_requests() {
        assert_eq!(
            ClientRequest::from_json(r#"{"type":"subscribe","address":"/ch/01/mix/fader"}"#)
                .unwrap(),
            ClientRequest::Subscribe {
                address: "/ch/01/mix/fader".into()
            }
        );
        assert_eq!(
            ClientRequest::from_json(r#"{"type":"write","address":"/lr/mix/fader","value":0.5}"#)
                .unwrap(),
            ClientRequest::Write {
                address: "/lr/mix/fader".into(),
                value: 0.5
            }
        );
        assert_eq!(
            ClientRequest::from_json(
                r#"{"type":"query-color","colorAddress":"/ch/02/config/color"}"#
            )
            .unwrap(),
            ClientRequest::QueryColor {
                color_address: "/ch/02/config/color".into()
            }
        );
    }

    #[test]
    fn test_legacy_names_accepted() {
        assert!(matches!(
            ClientRequest::from_json(r#"{"type":"add-param","address":"/a"}"#),
            Ok(ClientRequest::Subscribe { .. })
        ));
        assert!(matches!(
            ClientRequest::from_json(r#"{"type":"remove-param","address":"/a"}"#),
            Ok(ClientRequest::Unsubscribe { .. })
        ));
        assert!(matches!(
            ClientRequest::from_json(r#"{"type":"set-param","address":"/a","value":1}"#),
            Ok(ClientRequest::Write { .. })
        ));
        assert!(matches!(
            ClientRequest::from_json(r#"{"type":"get-color","colorAddress":"/a"}"#),
            Ok(ClientRequest::QueryColor { .. })
        ));
    }

    #[test]
    fn test_malformed_requests_rejected() {
        assert!(matches!(
            ClientRequest::from_json(r#"{"type":"subscribe","address":""}"#),
            Err(MessageError::EmptyAddress)
        ));
        assert!(matches!(
            ClientRequest::from_json(r#"{"type":"write","address":"/a","value":"loud"}"#),
            Err(MessageError::Json(_))
        ));
        assert!(matches!(
            ClientRequest::from_json(r#"{"type":"subscribe"}"#),
            Err(MessageError::Json(_))
        ));
        assert!(matches!(
            ClientRequest::from_json(r#"{"type":"dance"}"#),
            Err(MessageError::Json(_))
        ));
        assert!(matches!(
            ClientRequest::from_json("not json"),
            Err(MessageError::Json(_))
        ));
    }

    #[test]
    fn test_non_finite_write_rejected() {
        let request = ClientRequest::Write {
            address: "/a".into(),
            value: f64::NAN,
        };
        assert!(matches!(
            request.validate(),
            Err(MessageError::NonFiniteValue(_))
        ));
    }

    #[test]
    fn test_write_must_fit_f32() {
        assert!(matches!(
            ClientRequest::from_json(r#"{"type":"write","address":"/lr/mix/fader","value":1e39}"#),
            Err(MessageError::ValueOutOfRange(_))
        ));
        let largest = ClientRequest::Write {
            address: "/a".into(),
            value: -f64::from(f32::MAX),
        };
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn test_event_shapes() {
        let snapshot = ServerEvent::snapshot_of("/ch/01/mix/fader", ProtocolValue::Number(0.75));
        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            json!({"type": "snapshot", "params": [{"address": "/ch/01/mix/fader", "value": 0.75}]})
        );

        let update = ServerEvent::LiveUpdate {
            address: "/lr/mix/fader".into(),
            value: 0.5,
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"type": "live-update", "address": "/lr/mix/fader", "value": 0.5})
        );

        let color = ServerEvent::ColorResponse {
            color_address: "/ch/01/config/color".into(),
            color: None,
        };
        assert_eq!(
            serde_json::to_value(&color).unwrap(),
            json!({"type": "color-response", "colorAddress": "/ch/01/config/color", "color": null})
        );

        let status = ServerEvent::LivenessStatus { online: false };
        assert_eq!(
            status.to_json().unwrap(),
            r#"{"type":"liveness-status","online":false}"#
        );
    }
}
