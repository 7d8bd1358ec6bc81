//! Byte sizes and relative offsets as spelled in gadget layout documents.
//!
//! Sizes follow the `<number>[M|G]` grammar where `M` is mebibytes, `G` is
//! gibibytes, and a bare number is a byte count. Relative offsets follow
//! `[<structure-name>+]<size>` and are capped at 4 GiB.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SizeError {
    #[error("no numerical prefix")]
    NoNumericalPrefix,
    #[error("\"{0}\" is not a number")]
    NotANumber(String),
    #[error("size cannot be negative")]
    Negative,
    #[error("invalid suffix \"{0}\"")]
    InvalidSuffix(String),
    #[error("size is too large")]
    TooLarge,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelativeOffsetError {
    #[error("missing volume name")]
    MissingVolumeName,
    #[error("missing offset")]
    MissingOffset,
    #[error("cannot parse offset \"{text}\": {source}")]
    Offset { text: String, source: SizeError },
    #[error("offset above 4G limit")]
    AboveLimit,
}

/// A byte count parsed from the `<number>[M|G]` grammar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Size(pub u64);

impl Size {
    /// One kibibyte.
    pub const KIB: Size = Size(1 << 10);
    /// One mebibyte.
    pub const MIB: Size = Size(1 << 20);
    /// One gibibyte.
    pub const GIB: Size = Size(1 << 30);

    /// `count` mebibytes.
    pub const fn mib(count: u64) -> Size {
        Size(count * Self::MIB.0)
    }

    /// `count` gibibytes.
    pub const fn gib(count: u64) -> Size {
        Size(count * Self::GIB.0)
    }

    /// Raw byte count.
    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = SizeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        // the numeral is the longest prefix of digits and minus signs, so a
        // leading sign lands in the numeral and not in the suffix
        let split = text
            .find(|c: char| !c.is_ascii_digit() && c != '-')
            .unwrap_or(text.len());
        let (numeral, suffix) = text.split_at(split);
        if numeral.is_empty() {
            return Err(SizeError::NoNumericalPrefix);
        }
        let number: i64 = numeral
            .parse()
            .map_err(|_| SizeError::NotANumber(numeral.to_owned()))?;
        if number < 0 {
            return Err(SizeError::Negative);
        }
        let base = number as u64;
        let scaled = match suffix {
            "" => Some(base),
            "M" => base.checked_mul(Self::MIB.0),
            "G" => base.checked_mul(Self::GIB.0),
            _ => return Err(SizeError::InvalidSuffix(suffix.to_owned())),
        };
        scaled.map(Size).ok_or(SizeError::TooLarge)
    }
}

impl<'de> Deserialize<'de> for Size {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(SizeVisitor)
    }
}

struct SizeVisitor;

impl Visitor<'_> for SizeVisitor {
    type Value = Size;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a size in bytes, optionally with an M or G suffix")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Size, E> {
        self.visit_str(&value.to_string())
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Size, E> {
        self.visit_str(&value.to_string())
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Size, E> {
        value
            .parse()
            .map_err(|e| E::custom(format!("cannot parse size \"{value}\": {e}")))
    }
}

/// A byte offset optionally anchored to the start of another named structure
/// in the same volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelativeOffset {
    /// Name of the structure the offset is relative to, if any.
    pub relative_to: Option<String>,
    /// Offset from the anchor, or from the start of the volume.
    pub offset: Size,
}

impl RelativeOffset {
    /// Upper bound for the offset component (4 GiB).
    pub const LIMIT: Size = Size::gib(4);
}

impl fmt::Display for RelativeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.relative_to {
            Some(name) => write!(f, "{name}+{}", self.offset),
            None => write!(f, "{}", self.offset),
        }
    }
}

impl FromStr for RelativeOffset {
    type Err = RelativeOffsetError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (relative_to, size_text) = match text.split_once('+') {
            Some((name, rest)) => {
                if name.is_empty() {
                    return Err(RelativeOffsetError::MissingVolumeName);
                }
                (Some(name.to_owned()), rest)
            }
            None => (None, text),
        };
        if size_text.is_empty() {
            return Err(RelativeOffsetError::MissingOffset);
        }
        let offset: Size = size_text
            .parse()
            .map_err(|source| RelativeOffsetError::Offset {
                text: size_text.to_owned(),
                source,
            })?;
        if offset > Self::LIMIT {
            return Err(RelativeOffsetError::AboveLimit);
        }
        Ok(RelativeOffset {
            relative_to,
            offset,
        })
    }
}

impl<'de> Deserialize<'de> for RelativeOffset {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RelativeOffsetVisitor)
    }
}

struct RelativeOffsetVisitor;

impl Visitor<'_> for RelativeOffsetVisitor {
    type Value = RelativeOffset;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a relative offset like \"1234\" or \"mbr+92\"")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<RelativeOffset, E> {
        self.visit_str(&value.to_string())
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<RelativeOffset, E> {
        self.visit_str(&value.to_string())
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<RelativeOffset, E> {
        value
            .parse()
            .map_err(|e| E::custom(format!("cannot parse relative offset \"{value}\": {e}")))
    }
}
