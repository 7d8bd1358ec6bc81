//! Serde mirror of the gadget layout wire format.
//!
//! Every field is optional and unknown keys are ignored: documents in the
//! wild carry device-specific extras (`device-tree`, `device-tree-origin`)
//! that are not part of the layout schema. Null stanzas decode as absent.

use crate::size::{RelativeOffset, Size};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;

/// Top-level wire document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawDocument {
    pub defaults: Option<BTreeMap<String, Option<BTreeMap<String, serde_yaml::Value>>>>,
    pub connections: Option<Vec<Option<RawConnection>>>,
    pub volumes: Option<BTreeMap<String, RawVolume>>,
}

/// One `connections:` entry as written.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RawConnection {
    pub plug: Option<String>,
    pub slot: Option<String>,
}

/// One volume as written.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RawVolume {
    pub schema: Option<String>,
    pub bootloader: Option<String>,
    pub id: Option<String>,
    pub structure: Option<Vec<RawStructure>>,
}

/// One structure entry as written.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RawStructure {
    pub name: Option<String>,
    #[serde(rename = "filesystem-label")]
    pub label: Option<String>,
    pub offset: Option<Size>,
    pub offset_write: Option<RelativeOffset>,
    pub size: Option<Size>,
    #[serde(rename = "type")]
    pub partition_type: Option<String>,
    pub role: Option<String>,
    pub id: Option<String>,
    pub filesystem: Option<String>,
    pub content: Option<Vec<RawContent>>,
    pub update: Option<RawUpdate>,
}

/// One content entry as written. Which fields are meaningful depends on
/// whether the owning structure is bare or carries a filesystem.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RawContent {
    pub source: Option<String>,
    pub target: Option<String>,
    pub unpack: Option<bool>,
    pub image: Option<String>,
    pub offset: Option<Size>,
    pub offset_write: Option<RelativeOffset>,
    pub size: Option<Size>,
}

/// Update policy as written.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RawUpdate {
    #[serde(default, deserialize_with = "edition_scalar")]
    pub edition: Option<u32>,
    pub preserve: Option<Vec<String>>,
}

// `edition` arrives as a bare integer or a digit string; either way it must
// fit a non-negative 32-bit number.
fn edition_scalar<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EditionVisitor;

    impl Visitor<'_> for EditionVisitor {
        type Value = Option<u32>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative edition number")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            self.visit_str(&value.to_string())
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            self.visit_str(&value.to_string())
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            match value.parse::<u32>() {
                Ok(edition) => Ok(Some(edition)),
                Err(_) => Err(E::custom(format!(
                    "\"edition\" must be a positive number, not \"{value}\""
                ))),
            }
        }
    }

    deserializer.deserialize_any(EditionVisitor)
}
