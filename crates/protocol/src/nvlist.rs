//! XDR-encoded name-value lists.
//!
//! The outer BEGIN of a compound stream carries its properties as a packed
//! name-value list. The encoding is the XDR flavor used by ZFS: a 4-byte
//! header (`encoding`, `endian`, two reserved bytes) followed by the list
//! body — `version:i32, flags:u32`, a sequence of pairs, and an 8-zero-byte
//! terminator. Each pair is framed by its encoded and decoded sizes, then
//! carries an XDR string name, a type tag, an element count, and the value.
//! All integers in the body are big-endian regardless of the header's
//! endian byte, which only describes the packing host.
//!
//! The splitter rewrites `uint64`, `string`, and nested-list values and
//! must not disturb anything else, so every other value type is carried
//! opaquely: the raw value bytes and the original decoded size are kept and
//! re-emitted verbatim. Decoded sizes for rewritten pairs are recomputed
//! with the canonical in-memory size formula so receivers allocate exactly
//! what the C library would have asked for.

use thiserror::Error;

/// Errors raised while unpacking or packing a name-value list.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum NvlistError {
    /// The buffer ended before the structure it announced.
    #[error("name-value list truncated at byte {at}")]
    Truncated {
        /// Offset at which more bytes were required.
        at: usize,
    },
    /// The header does not declare XDR encoding.
    #[error("unsupported name-value encoding {encoding:#x}")]
    BadEncoding {
        /// Encoding byte found in the header.
        encoding: u8,
    },
    /// A pair announced an encoded size too small to hold its own framing.
    #[error("name-value pair for {name:?} has impossible encoded size {size}")]
    BadPairSize {
        /// Name of the offending pair, if it decoded.
        name: String,
        /// Announced encoded size.
        size: i32,
    },
    /// A string value is not valid UTF-8.
    #[error("name-value string is not valid UTF-8")]
    BadString,
    /// Bytes remained after the top-level terminator.
    #[error("{remaining} trailing bytes after name-value list")]
    TrailingBytes {
        /// Count of unconsumed bytes.
        remaining: usize,
    },
    /// An element count does not match the value type's expectation.
    #[error("name-value pair for {name:?} has element count {nelem} for a scalar type")]
    BadElementCount {
        /// Name of the offending pair.
        name: String,
        /// Announced element count.
        nelem: i32,
    },
}

/// `NV_UNIQUE_NAME`: names within the list are unique; adds replace.
pub const UNIQUE_NAME: u32 = 0x1;

const ENCODING_XDR: u8 = 1;

#[cfg(target_endian = "big")]
const HOST_ENDIAN_BYTE: u8 = 0;
#[cfg(target_endian = "little")]
const HOST_ENDIAN_BYTE: u8 = 1;

// data_type_t tags the codec understands natively; everything else rides
// through as an opaque value.
const TYPE_BOOLEAN: i32 = 1;
const TYPE_UINT64: i32 = 8;
const TYPE_STRING: i32 = 9;
const TYPE_NVLIST: i32 = 19;
const TYPE_BOOLEAN_VALUE: i32 = 21;

// In-memory size bookkeeping mirrored from the C library: a pair decodes
// into an aligned header-plus-name block followed by an aligned value.
const NVPAIR_HEADER_SIZE: usize = 16;
const EMBEDDED_LIST_SIZE: usize = 32;

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

fn align8(n: usize) -> usize {
    (n + 7) & !7
}

/// A single name/value entry.
#[derive(Clone, Debug, PartialEq)]
pub struct NvPair {
    name: String,
    value: NvValue,
}

impl NvPair {
    /// Builds a pair.
    #[must_use]
    pub fn new(name: impl Into<String>, value: NvValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// The pair's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pair's value.
    #[must_use]
    pub fn value(&self) -> &NvValue {
        &self.value
    }
}

/// Decoded value of a pair.
#[derive(Clone, Debug, PartialEq)]
pub enum NvValue {
    /// Presence flag with no payload.
    Boolean,
    /// Explicit boolean value.
    BooleanValue(bool),
    /// Unsigned 64-bit integer (snapshot guids).
    Uint64(u64),
    /// NUL-terminated string (snapshot names).
    String(String),
    /// Nested list (`fss`, per-filesystem entries, `snaps`, `snapprops`).
    List(NvList),
    /// Any value type the splitter never rewrites, preserved verbatim.
    Opaque {
        /// Original `data_type_t` tag.
        data_type: i32,
        /// Original element count.
        nelem: i32,
        /// Raw XDR value bytes.
        bytes: Vec<u8>,
        /// Original announced in-memory size, re-emitted unchanged.
        decode_size: i32,
    },
}

/// An ordered name-value list.
#[derive(Clone, Debug, PartialEq)]
pub struct NvList {
    version: i32,
    flags: u32,
    pairs: Vec<NvPair>,
}

impl Default for NvList {
    fn default() -> Self {
        Self::new()
    }
}

impl NvList {
    /// Creates an empty unique-name list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: 0,
            flags: UNIQUE_NAME,
            pairs: Vec::new(),
        }
    }

    /// Creates an empty list inheriting `other`'s version and flags.
    #[must_use]
    pub fn like(other: &Self) -> Self {
        Self {
            version: other.version,
            flags: other.flags,
            pairs: Vec::new(),
        }
    }

    /// Iterates the pairs in encoding order.
    pub fn iter(&self) -> impl Iterator<Item = &NvPair> {
        self.pairs.iter()
    }

    /// Number of pairs in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Reports whether the list holds no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Looks up a value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&NvValue> {
        self.pairs.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Adds a pair, replacing any same-named pair when the list carries
    /// the unique-name flag.
    pub fn add(&mut self, name: impl Into<String>, value: NvValue) {
        let name = name.into();
        if self.flags & UNIQUE_NAME != 0 {
            if let Some(existing) = self.pairs.iter_mut().find(|p| p.name == name) {
                existing.value = value;
                return;
            }
        }
        self.pairs.push(NvPair { name, value });
    }

    /// Adds a `uint64` pair.
    pub fn add_uint64(&mut self, name: impl Into<String>, value: u64) {
        self.add(name, NvValue::Uint64(value));
    }

    /// Adds a string pair.
    pub fn add_string(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.add(name, NvValue::String(value.into()));
    }

    /// Adds a nested-list pair.
    pub fn add_list(&mut self, name: impl Into<String>, value: Self) {
        self.add(name, NvValue::List(value));
    }

    /// Copies an existing pair over unchanged.
    pub fn add_pair(&mut self, pair: &NvPair) {
        self.add(pair.name.clone(), pair.value.clone());
    }

    /// Unpacks an XDR-encoded blob.
    pub fn unpack(buf: &[u8]) -> Result<Self, NvlistError> {
        let mut r = XdrReader::new(buf);
        let encoding = r.u8()?;
        if encoding != ENCODING_XDR {
            return Err(NvlistError::BadEncoding { encoding });
        }
        r.u8()?; // packing-host endian, irrelevant to XDR bodies
        r.u8()?;
        r.u8()?;

        let list = Self::decode_body(&mut r)?;
        if r.remaining() != 0 {
            return Err(NvlistError::TrailingBytes {
                remaining: r.remaining(),
            });
        }
        Ok(list)
    }

    /// Packs the list into an XDR-encoded blob.
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        let mut out = vec![ENCODING_XDR, HOST_ENDIAN_BYTE, 0, 0];
        self.encode_body(&mut out);
        out
    }

    fn decode_body(r: &mut XdrReader<'_>) -> Result<Self, NvlistError> {
        let version = r.i32()?;
        let flags = r.u32()?;
        let mut pairs = Vec::new();

        loop {
            let encode_size = r.i32()?;
            let decode_size = r.i32()?;
            if encode_size == 0 && decode_size == 0 {
                break;
            }

            let before_name = r.pos();
            let name = r.string()?;
            let data_type = r.i32()?;
            let nelem = r.i32()?;

            // Everything after the two size words, the name, the type, and
            // the element count is value bytes.
            let framing = 8 + (r.pos() - before_name);
            let value_len = usize::try_from(encode_size)
                .ok()
                .and_then(|s| s.checked_sub(framing))
                .ok_or(NvlistError::BadPairSize {
                    name: name.clone(),
                    size: encode_size,
                })?;

            let value = match data_type {
                TYPE_BOOLEAN => NvValue::Boolean,
                TYPE_BOOLEAN_VALUE => {
                    expect_scalar(&name, nelem)?;
                    NvValue::BooleanValue(r.i32()? != 0)
                }
                TYPE_UINT64 => {
                    expect_scalar(&name, nelem)?;
                    NvValue::Uint64(r.u64()?)
                }
                TYPE_STRING => {
                    expect_scalar(&name, nelem)?;
                    NvValue::String(r.string()?)
                }
                TYPE_NVLIST => {
                    expect_scalar(&name, nelem)?;
                    NvValue::List(Self::decode_body(r)?)
                }
                _ => NvValue::Opaque {
                    data_type,
                    nelem,
                    bytes: r.bytes(value_len)?.to_vec(),
                    decode_size,
                },
            };

            pairs.push(NvPair { name, value });
        }

        Ok(Self {
            version,
            flags,
            pairs,
        })
    }

    fn encode_body(&self, out: &mut Vec<u8>) {
        put_i32(out, self.version);
        put_u32(out, self.flags);
        for pair in &self.pairs {
            pair.encode(out);
        }
        // List terminator: zero encoded and decoded sizes.
        put_i32(out, 0);
        put_i32(out, 0);
    }
}

impl NvPair {
    fn encode(&self, out: &mut Vec<u8>) {
        let mut value = Vec::new();
        let (data_type, nelem) = match &self.value {
            NvValue::Boolean => (TYPE_BOOLEAN, 0),
            NvValue::BooleanValue(b) => {
                put_i32(&mut value, i32::from(*b));
                (TYPE_BOOLEAN_VALUE, 1)
            }
            NvValue::Uint64(v) => {
                value.extend_from_slice(&v.to_be_bytes());
                (TYPE_UINT64, 1)
            }
            NvValue::String(s) => {
                put_string(&mut value, s);
                (TYPE_STRING, 1)
            }
            NvValue::List(l) => {
                l.encode_body(&mut value);
                (TYPE_NVLIST, 1)
            }
            NvValue::Opaque {
                data_type,
                nelem,
                bytes,
                ..
            } => {
                value.extend_from_slice(bytes);
                (*data_type, *nelem)
            }
        };

        let name_field = 4 + align4(self.name.len());
        let encode_size = 8 + name_field + 8 + value.len();

        put_i32(out, encode_size as i32);
        put_i32(out, self.decode_size());
        put_string(out, &self.name);
        put_i32(out, data_type);
        put_i32(out, nelem);
        out.extend_from_slice(&value);
    }

    /// In-memory size a C receiver allocates for this pair: the aligned
    /// pair header plus NUL-terminated name, then the aligned value.
    fn decode_size(&self) -> i32 {
        let value_size = match &self.value {
            NvValue::Boolean => 0,
            NvValue::BooleanValue(_) => 4,
            NvValue::Uint64(_) => 8,
            NvValue::String(s) => s.len() + 1,
            NvValue::List(_) => EMBEDDED_LIST_SIZE,
            NvValue::Opaque { decode_size, .. } => return *decode_size,
        };
        (align8(NVPAIR_HEADER_SIZE + self.name.len() + 1) + align8(value_size)) as i32
    }
}

fn expect_scalar(name: &str, nelem: i32) -> Result<(), NvlistError> {
    if nelem == 1 {
        Ok(())
    } else {
        Err(NvlistError::BadElementCount {
            name: name.to_owned(),
            nelem,
        })
    }
}

fn put_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_string(out: &mut Vec<u8>, s: &str) {
    put_u32(out, s.len() as u32);
    out.extend_from_slice(s.as_bytes());
    out.resize(out.len() + (align4(s.len()) - s.len()), 0);
}

struct XdrReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> XdrReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], NvlistError> {
        if self.remaining() < n {
            return Err(NvlistError::Truncated { at: self.buf.len() });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, NvlistError> {
        Ok(self.bytes(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, NvlistError> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i32(&mut self) -> Result<i32, NvlistError> {
        Ok(self.u32()? as i32)
    }

    fn u64(&mut self) -> Result<u64, NvlistError> {
        let b = self.bytes(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn string(&mut self) -> Result<String, NvlistError> {
        let len = self.u32()? as usize;
        let bytes = self.bytes(align4(len))?;
        std::str::from_utf8(&bytes[..len])
            .map(ToOwned::to_owned)
            .map_err(|_| NvlistError::BadString)
    }
}
