//! OSC 1.0 wire codec
//!
//! The mixer speaks plain OSC over UDP. One datagram carries either a single
//! message or a bundle of messages.
//!
//! ## Message Layout
//!
//! ```text
//! Address pattern   UTF-8, NUL terminated, padded to 4 bytes   "/ch/01/mix/fader\0\0\0\0"
//! Type tag string   ',' + one tag per argument, padded         ",f\0\0"
//! Arguments         big-endian, each padded to 4 bytes         3f 40 00 00
//! ```
//!
//! ## Bundle Layout
//!
//! ```text
//! "#bundle\0"  8-byte time tag  ( i32 size + element )*
//! ```
//!
//! Bundles are flattened on decode; the bridge never sends them.

use bytes::{BufMut, Bytes, BytesMut};

/// Bundle marker, including its NUL terminator
pub const BUNDLE_TAG: &[u8] = b"#bundle\0";

/// Nested bundles deeper than this are rejected
const MAX_BUNDLE_DEPTH: usize = 8;

/// A single typed OSC argument
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    /// `i` - 32-bit integer
    Int(i32),
    /// `f` - 32-bit float
    Float(f32),
    /// `s` - string
    Str(String),
    /// `b` - blob
    Blob(Bytes),
    /// `h` - 64-bit integer
    Long(i64),
    /// `d` - 64-bit float
    Double(f64),
    /// `T`
    True,
    /// `F`
    False,
    /// `N`
    Nil,
    /// `I` (infinitum)
    Impulse,
    /// `c`, `r`, `m` (4 bytes) and `t` (8 bytes), kept undecoded
    Raw { tag: u8, data: Bytes },
}

impl OscArg {
    /// The type tag character for this argument
    pub fn tag(&self) -> u8 {
        match self {
            OscArg::Int(_) => b'i',
            OscArg::Float(_) => b'f',
            OscArg::Str(_) => b's',
            OscArg::Blob(_) => b'b',
            OscArg::Long(_) => b'h',
            OscArg::Double(_) => b'd',
            OscArg::True => b'T',
            OscArg::False => b'F',
            OscArg::Nil => b'N',
            OscArg::Impulse => b'I',
            OscArg::Raw { tag, .. } => *tag,
        }
    }

    /// Numeric view of the argument, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OscArg::Int(v) => Some(f64::from(*v)),
            OscArg::Float(v) => Some(f64::from(*v)),
            OscArg::Long(v) => Some(*v as f64),
            OscArg::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }
}

/// Errors during OSC decoding
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OscError {
    #[error("Empty packet")]
    Empty,
    #[error("Address pattern must start with '/'")]
    InvalidAddress,
    #[error("Unterminated string in {0}")]
    UnterminatedString(&'static str),
    #[error("Invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),
    #[error("Type tag string must start with ','")]
    MissingTypeTags,
    #[error("Unknown type tag: {0:?}")]
    UnknownTypeTag(char),
    #[error("Packet too short: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("Invalid bundle element size: {0}")]
    InvalidElementSize(i32),
    #[error("Bundles nested too deeply")]
    BundleTooDeep,
}

/// One OSC message: address plus typed arguments
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub address: String,
    pub args: Vec<OscArg>,
}

impl OscMessage {
    pub fn new(address: impl Into<String>, args: Vec<OscArg>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// An argument-less message. The mixer answers these with the current value.
    pub fn query(address: impl Into<String>) -> Self {
        Self::new(address, Vec::new())
    }

    /// A single-float write, the shape of every parameter set
    pub fn float(address: impl Into<String>, value: f32) -> Self {
        Self::new(address, vec![OscArg::Float(value)])
    }

    pub fn first_arg(&self) -> Option<&OscArg> {
        self.args.first()
    }

    /// Serialize to a datagram payload
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.address.len() + 8 + self.args.len() * 8);

        put_padded_str(&mut buf, &self.address);

        let mut tags = String::with_capacity(self.args.len() + 1);
        tags.push(',');
        for arg in &self.args {
            tags.push(arg.tag() as char);
        }
        put_padded_str(&mut buf, &tags);

        for arg in &self.args {
            match arg {
                OscArg::Int(v) => buf.put_i32(*v),
                OscArg::Float(v) => buf.put_f32(*v),
                OscArg::Str(s) => put_padded_str(&mut buf, s),
                OscArg::Blob(data) => {
                    buf.put_i32(data.len() as i32);
                    buf.put_slice(data);
                    put_padding(&mut buf, data.len());
                }
                OscArg::Long(v) => buf.put_i64(*v),
                OscArg::Double(v) => buf.put_f64(*v),
                OscArg::Raw { data, .. } => buf.put_slice(data),
                OscArg::True | OscArg::False | OscArg::Nil | OscArg::Impulse => {}
            }
        }

        buf.freeze()
    }

    /// Parse a single message (not a bundle)
    pub fn decode(packet: &[u8]) -> Result<Self, OscError> {
        if packet.is_empty() {
            return Err(OscError::Empty);
        }
        let mut reader = Reader::new(packet);

        let address = reader.read_str("address")?;
        if !address.starts_with('/') {
            return Err(OscError::InvalidAddress);
        }

        // Some senders omit the type tag string entirely for argument-less messages
        if reader.is_empty() {
            return Ok(Self::query(address));
        }

        let tags = reader.read_str("type tags")?;
        let tags = tags.strip_prefix(',').ok_or(OscError::MissingTypeTags)?;

        let mut args = Vec::with_capacity(tags.len());
        for tag in tags.chars() {
            let arg = match tag {
                'i' => OscArg::Int(i32::from_be_bytes(reader.take_array()?)),
                'f' => OscArg::Float(f32::from_be_bytes(reader.take_array()?)),
                's' | 'S' => OscArg::Str(reader.read_str("string argument")?),
                'b' => {
                    let len = i32::from_be_bytes(reader.take_array()?);
                    let len = usize::try_from(len).map_err(|_| OscError::Truncated {
                        expected: 0,
                        actual: reader.remaining(),
                    })?;
                    let data = Bytes::copy_from_slice(reader.take(len)?);
                    reader.skip_padding(len);
                    OscArg::Blob(data)
                }
                'h' => OscArg::Long(i64::from_be_bytes(reader.take_array()?)),
                'd' => OscArg::Double(f64::from_be_bytes(reader.take_array()?)),
                'T' => OscArg::True,
                'F' => OscArg::False,
                'N' => OscArg::Nil,
                'I' => OscArg::Impulse,
                'c' | 'r' | 'm' => OscArg::Raw {
                    tag: tag as u8,
                    data: Bytes::copy_from_slice(reader.take(4)?),
                },
                't' => OscArg::Raw {
                    tag: tag as u8,
                    data: Bytes::copy_from_slice(reader.take(8)?),
                },
                other => return Err(OscError::UnknownTypeTag(other)),
            };
            args.push(arg);
        }

        Ok(Self { address, args })
    }
}

/// Decode one datagram into its messages, flattening bundles in order.
pub fn decode_packet(packet: &[u8]) -> Result<Vec<OscMessage>, OscError> {
    let mut out = Vec::new();
    decode_into(packet, 0, &mut out)?;
    Ok(out)
}

/// True if the datagram is a bundle rather than a bare message
pub fn is_bundle(packet: &[u8]) -> bool {
    packet.starts_with(BUNDLE_TAG)
}

fn decode_into(packet: &[u8], depth: usize, out: &mut Vec<OscMessage>) -> Result<(), OscError> {
    if !is_bundle(packet) {
        out.push(OscMessage::decode(packet)?);
        return Ok(());
    }
    if depth >= MAX_BUNDLE_DEPTH {
        return Err(OscError::BundleTooDeep);
    }

    let mut reader = Reader::new(packet);
    reader.take(BUNDLE_TAG.len())?;
    // Time tag: the mixer always sends "immediately", and we dispatch on arrival anyway
    reader.take(8)?;

    while !reader.is_empty() {
        let size = i32::from_be_bytes(reader.take_array()?);
        if size <= 0 {
            return Err(OscError::InvalidElementSize(size));
        }
        let element = reader.take(size as usize)?;
        decode_into(element, depth + 1, out)?;
    }
    Ok(())
}

fn put_padded_str(buf: &mut BytesMut, s: &str) {
    buf.put_slice(s.as_bytes());
    buf.put_u8(0);
    put_padding(buf, s.len() + 1);
}

fn put_padding(buf: &mut BytesMut, written: usize) {
    let pad = (4 - written % 4) % 4;
    buf.put_bytes(0, pad);
}

/// Bounds-checked cursor over a datagram
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], OscError> {
        if self.remaining() < len {
            return Err(OscError::Truncated {
                expected: len,
                actual: self.remaining(),
            });
        }
        let buf = self.buf;
        let slice = &buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], OscError> {
        let slice = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    /// Skip alignment padding after `len` bytes of content. Tolerates a
    /// missing trailing pad at the end of the packet.
    fn skip_padding(&mut self, len: usize) {
        let pad = (4 - len % 4) % 4;
        self.pos = (self.pos + pad).min(self.buf.len());
    }

    fn read_str(&mut self, what: &'static str) -> Result<String, OscError> {
        let rest = &self.buf[self.pos..];
        let nul = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(OscError::UnterminatedString(what))?;
        let s = std::str::from_utf8(&rest[..nul])
            .map_err(|_| OscError::InvalidUtf8(what))?
            .to_string();
        self.pos += nul + 1;
        self.skip_padding(nul + 1);
        Ok(s)
    }
}
