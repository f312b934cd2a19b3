//! mixproto - Protocol types for the mixbridge OSC ↔ WebSocket bridge
//!
//! Two wire formats meet here:
//!
//! - **OSC 1.0 over UDP** towards the mixer. The `osc` module is a small codec
//!   for the type tags X-Air consoles use (`i f s b h d T F N I`); the other
//!   OSC 1.0 tags (`c r m t`) are kept as raw bytes. Bundles are flattened into
//!   their messages on decode.
//! - **JSON over WebSocket** towards UI clients. The `messages` module defines
//!   the request and event enums, tagged by `"type"`.
//!
//! `address` and `color` hold console knowledge (well-known addresses, color
//! slots, scribble-strip colors) that tools and logging use. The bridge core
//! itself treats addresses as opaque keys.

pub mod address;
pub mod color;
pub mod messages;
pub mod osc;
pub mod value;

pub use color::MixerColor;
pub use messages::{ClientRequest, MessageError, ParamValue, ServerEvent};
pub use osc::{decode_packet, is_bundle, OscArg, OscError, OscMessage};
pub use value::ProtocolValue;
