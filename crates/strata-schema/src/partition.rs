//! Classification of the structure `type` field against the volume schema.

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PartitionTypeError {
    #[error("type is not specified")]
    NotSpecified,
    #[error("invalid format")]
    InvalidFormat,
    #[error("invalid format of hybrid type")]
    InvalidHybridFormat,
    #[error("MBR structure type with non-MBR schema \"{0}\"")]
    MbrWithNonMbrSchema(String),
    #[error("GUID structure type with non-GPT schema \"{0}\"")]
    GuidWithNonGptSchema(String),
}

/// Closed classification of a structure's partition type encoding.
///
/// Produced once during validation; downstream consumers match on the
/// variant and never re-inspect the raw string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionType {
    /// The legacy `mbr` token marking the protective boot sector region.
    Legacy,
    /// A raw region with no partition table entry.
    Bare,
    /// A two-digit MBR partition type code, like `EF`.
    Mbr(String),
    /// A GPT partition type GUID.
    Guid(String),
    /// A dual MBR code plus GPT GUID spelling, valid under either schema.
    Hybrid { code: String, guid: String },
}

impl PartitionType {
    /// Classify a raw `type` string against the volume's declared schema.
    ///
    /// `declared_schema` is the schema string exactly as written in the
    /// document; an empty string means GPT for the consistency checks but is
    /// quoted verbatim in mismatch errors.
    pub fn classify(raw: &str, declared_schema: &str) -> Result<Self, PartitionTypeError> {
        if raw.is_empty() {
            return Err(PartitionTypeError::NotSpecified);
        }
        match raw {
            "mbr" => return Ok(PartitionType::Legacy),
            "bare" => return Ok(PartitionType::Bare),
            _ => {}
        }
        let schema_is_mbr = declared_schema == "mbr";
        if is_mbr_type_code(raw) {
            if !schema_is_mbr {
                return Err(PartitionTypeError::MbrWithNonMbrSchema(
                    declared_schema.to_owned(),
                ));
            }
            return Ok(PartitionType::Mbr(raw.to_owned()));
        }
        if is_guid(raw) {
            if schema_is_mbr {
                return Err(PartitionTypeError::GuidWithNonGptSchema(
                    declared_schema.to_owned(),
                ));
            }
            return Ok(PartitionType::Guid(raw.to_owned()));
        }
        if let Some((code, guid)) = raw.split_once(',') {
            if is_mbr_type_code(code) && is_guid(guid) {
                return Ok(PartitionType::Hybrid {
                    code: code.to_owned(),
                    guid: guid.to_owned(),
                });
            }
            return Err(PartitionTypeError::InvalidHybridFormat);
        }
        Err(PartitionTypeError::InvalidFormat)
    }

    /// Whether the structure gets no entry in the partition table.
    pub fn is_raw(&self) -> bool {
        matches!(self, PartitionType::Legacy | PartitionType::Bare)
    }
}

impl fmt::Display for PartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionType::Legacy => f.write_str("mbr"),
            PartitionType::Bare => f.write_str("bare"),
            PartitionType::Mbr(code) => f.write_str(code),
            PartitionType::Guid(guid) => f.write_str(guid),
            PartitionType::Hybrid { code, guid } => write!(f, "{code},{guid}"),
        }
    }
}

impl Serialize for PartitionType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Two uppercase hex digits.
fn is_mbr_type_code(text: &str) -> bool {
    text.len() == 2 && text.bytes().all(|b| matches!(b, b'0'..=b'9' | b'A'..=b'F'))
}

/// The 8-4-4-4-12 GUID layout, hex case-insensitive.
fn is_guid(text: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let parts: Vec<&str> = text.split('-').collect();
    parts.len() == GROUPS.len()
        && parts
            .iter()
            .zip(GROUPS)
            .all(|(part, len)| part.len() == len && part.bytes().all(|b| b.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUID: &str = "21686148-6449-6E6F-744E-656564454649";

    #[test]
    fn classifies_legacy_and_bare_under_any_schema() {
        for schema in ["", "gpt", "mbr"] {
            assert_eq!(
                PartitionType::classify("mbr", schema).unwrap(),
                PartitionType::Legacy
            );
            assert_eq!(
                PartitionType::classify("bare", schema).unwrap(),
                PartitionType::Bare
            );
        }
    }

    #[test]
    fn classifies_mbr_type_codes_only_under_mbr_schema() {
        assert_eq!(
            PartitionType::classify("0C", "mbr").unwrap(),
            PartitionType::Mbr("0C".to_owned())
        );
        assert_eq!(
            PartitionType::classify("EF", "mbr").unwrap(),
            PartitionType::Mbr("EF".to_owned())
        );
        assert_eq!(
            PartitionType::classify("0C", "gpt").unwrap_err().to_string(),
            "MBR structure type with non-MBR schema \"gpt\""
        );
        assert_eq!(
            PartitionType::classify("0C", "").unwrap_err().to_string(),
            "MBR structure type with non-MBR schema \"\""
        );
    }

    #[test]
    fn classifies_guids_only_under_gpt_schema() {
        assert_eq!(
            PartitionType::classify(GUID, "gpt").unwrap(),
            PartitionType::Guid(GUID.to_owned())
        );
        assert_eq!(
            PartitionType::classify(GUID, "").unwrap(),
            PartitionType::Guid(GUID.to_owned())
        );
        let lower = GUID.to_lowercase();
        assert_eq!(
            PartitionType::classify(&lower, "gpt").unwrap(),
            PartitionType::Guid(lower.clone())
        );
        assert_eq!(
            PartitionType::classify(GUID, "mbr").unwrap_err().to_string(),
            "GUID structure type with non-GPT schema \"mbr\""
        );
    }

    #[test]
    fn classifies_hybrid_types_under_any_schema() {
        let hybrid = format!("EF,{GUID}");
        for schema in ["", "gpt", "mbr"] {
            assert_eq!(
                PartitionType::classify(&hybrid, schema).unwrap(),
                PartitionType::Hybrid {
                    code: "EF".to_owned(),
                    guid: GUID.to_owned(),
                }
            );
        }
    }

    #[test]
    fn rejects_missing_type() {
        assert_eq!(
            PartitionType::classify("", "gpt").unwrap_err(),
            PartitionTypeError::NotSpecified
        );
    }

    #[test]
    fn rejects_malformed_plain_types() {
        for bogus in ["1234", "FG", "0g", "cc", "21686148-6449-6E6F-744E"] {
            assert_eq!(
                PartitionType::classify(bogus, "mbr").unwrap_err(),
                PartitionTypeError::InvalidFormat,
                "{bogus}"
            );
        }
    }

    #[test]
    fn rejects_malformed_hybrid_types() {
        let bad = [
            format!(",{GUID}"),
            "EF,".to_owned(),
            format!("123,{GUID}"),
            format!("EF,{GUID}2"),
            format!("EF,{GUID},00"),
        ];
        for bogus in &bad {
            assert_eq!(
                PartitionType::classify(bogus, "gpt").unwrap_err(),
                PartitionTypeError::InvalidHybridFormat,
                "{bogus}"
            );
        }
    }

    #[test]
    fn renders_the_wire_spelling() {
        let hybrid = format!("EF,{GUID}");
        let cases = [
            ("mbr", "gpt"),
            ("bare", "gpt"),
            ("0C", "mbr"),
            (GUID, "gpt"),
            (hybrid.as_str(), "mbr"),
        ];
        for (spelling, schema) in cases {
            let parsed = PartitionType::classify(spelling, schema).unwrap();
            assert_eq!(parsed.to_string(), spelling);
            assert_eq!(
                serde_json::to_string(&parsed).unwrap(),
                format!("\"{spelling}\"")
            );
        }
    }
}
