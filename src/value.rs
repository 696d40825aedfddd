//! Typed command-value codec
//!
//! Job orders carry their command value as a string with a leading
//! parenthesized type tag followed by the literal, e.g. `(DOUBLE)12.5` or
//! `(BOOLEAN)true`. This module decodes that string into a typed scalar
//! suitable for writing to a control point.
//!
//! Decoding is deliberately infallible from the caller's point of view:
//! any malformed input yields `None` ("value not convertible") so one bad
//! job can never corrupt the rest of a batch.

use std::fmt;

/// A typed scalar decoded from a job's encoded command value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// Boolean, from the `BOOLEAN` tag.
    Boolean(bool),
    /// 64-bit float, from the `DOUBLE` tag.
    Double(f64),
    /// 32-bit float, from the `FLOAT` tag.
    Float(f32),
    /// 32-bit signed integer, from the `LONG` tag.
    Int32(i32),
    /// 16-bit signed integer, from the `SHORT` tag.
    Int16(i16),
    /// 16-bit unsigned integer, from the `WORD` tag.
    UInt16(u16),
    /// 32-bit unsigned integer, from the `DWORD` tag.
    UInt32(u32),
    /// 8-bit unsigned integer, from the `BYTE` tag.
    Byte(u8),
    /// Single character, from the `CHAR` tag.
    Char(char),
    /// Verbatim string, from the `STRING` tag.
    Text(String),
}

impl TypedValue {
    /// Decode an encoded command value of the form `(TAG)literal`.
    ///
    /// The tag is matched case-insensitively. Returns `None` when the
    /// leading `(TAG)` marker is missing, the tag is unknown, or the
    /// literal does not parse for the tagged type (including overflow).
    ///
    /// Numeric literals always use `.` as the decimal separator; the host
    /// locale has no effect, so `(DOUBLE)12,5` is not convertible.
    #[must_use]
    pub fn decode(encoded: &str) -> Option<Self> {
        let rest = encoded.strip_prefix('(')?;
        let close = rest.find(')')?;
        let tag = &rest[..close];
        let literal = &rest[close + 1..];

        match tag.to_ascii_uppercase().as_str() {
            "BOOLEAN" => literal.parse().ok().map(Self::Boolean),
            "DOUBLE" => literal.parse().ok().map(Self::Double),
            "FLOAT" => literal.parse().ok().map(Self::Float),
            "LONG" => literal.parse().ok().map(Self::Int32),
            "SHORT" => literal.parse().ok().map(Self::Int16),
            "WORD" => literal.parse().ok().map(Self::UInt16),
            "DWORD" => literal.parse().ok().map(Self::UInt32),
            "BYTE" => literal.parse().ok().map(Self::Byte),
            "CHAR" => {
                let mut chars = literal.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Self::Char(c)),
                    _ => None,
                }
            }
            "STRING" => Some(Self::Text(literal.to_string())),
            _ => None,
        }
    }

    /// Name of the decoded type, used in telemetry messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "Boolean",
            Self::Double(_) => "Double",
            Self::Float(_) => "Float",
            Self::Int32(_) => "Int32",
            Self::Int16(_) => "Int16",
            Self::UInt16(_) => "UInt16",
            Self::UInt32(_) => "UInt32",
            Self::Byte(_) => "Byte",
            Self::Char(_) => "Char",
            Self::Text(_) => "String",
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}
