//! Volume validation: schema and bootloader resolution, per-structure
//! checks, name uniqueness, and cross-structure reference resolution.

use crate::raw::RawVolume;
use crate::size::RelativeOffset;
use crate::structure::{Structure, StructureError};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Partitioning schema of a volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    #[default]
    Gpt,
    Mbr,
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Schema::Gpt => "gpt",
            Schema::Mbr => "mbr",
        })
    }
}

/// Bootloaders a volume may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bootloader {
    Grub,
    UBoot,
    AndroidBoot,
}

impl fmt::Display for Bootloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Bootloader::Grub => "grub",
            Bootloader::UBoot => "u-boot",
            Bootloader::AndroidBoot => "android-boot",
        })
    }
}

/// Positional reference to a structure, rendered as `#2` or `#2 ("name")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureRef {
    pub index: usize,
    pub name: String,
}

impl fmt::Display for StructureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)?;
        if !self.name.is_empty() {
            write!(f, " (\"{}\")", self.name)?;
        }
        Ok(())
    }
}

/// Positional reference to a content entry, rendered like [`StructureRef`]
/// with the image name standing in for the structure name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRef {
    pub index: usize,
    pub image: String,
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)?;
        if !self.image.is_empty() {
            write!(f, " (\"{}\")", self.image)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VolumeError {
    #[error("invalid name")]
    InvalidName,
    #[error("invalid schema \"{0}\"")]
    UnknownSchema(String),
    #[error("invalid structure {at}: {source}")]
    Structure {
        at: StructureRef,
        source: StructureError,
    },
    #[error("structure name \"{0}\" is not unique")]
    DuplicateStructureName(String),
    #[error("structure {at} refers to an unknown structure \"{target}\"")]
    UnknownOffsetReference { at: StructureRef, target: String },
    #[error("structure {at}, content {content} refers to an unknown structure \"{target}\"")]
    UnknownContentReference {
        at: StructureRef,
        content: ContentRef,
        target: String,
    },
    #[error("bootloader must be one of grub, u-boot or android-boot")]
    UnknownBootloader,
}

/// One validated volume: a logical disk or image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Volume {
    /// Partitioning schema, GPT when the document leaves it out.
    pub schema: Schema,
    pub bootloader: Option<Bootloader>,
    /// Disk identifier, empty when unset.
    pub id: String,
    /// Structures in declaration order; the order defines on-disk placement
    /// when no explicit offsets are given.
    pub structure: Vec<Structure>,
}

impl RawVolume {
    /// Validate this volume under `name` and build the resolved form.
    pub fn resolve(&self, name: &str) -> Result<Volume, VolumeError> {
        if !is_valid_volume_name(name) {
            return Err(VolumeError::InvalidName);
        }
        let schema = match self.schema.as_deref().unwrap_or_default() {
            "" | "gpt" => Schema::Gpt,
            "mbr" => Schema::Mbr,
            other => return Err(VolumeError::UnknownSchema(other.to_owned())),
        };

        let raw_structures = self.structure.as_deref().unwrap_or_default();
        let mut structure = Vec::with_capacity(raw_structures.len());
        let mut names = HashSet::new();
        for (index, raw) in raw_structures.iter().enumerate() {
            let resolved = raw.resolve(self).map_err(|source| VolumeError::Structure {
                at: StructureRef {
                    index,
                    name: raw.name.clone().unwrap_or_default(),
                },
                source,
            })?;
            if !resolved.name.is_empty() && !names.insert(resolved.name.clone()) {
                return Err(VolumeError::DuplicateStructureName(resolved.name.clone()));
            }
            structure.push(resolved);
        }

        // relative offsets resolve by structure name once all names are known
        for (index, entry) in structure.iter().enumerate() {
            let at = || StructureRef {
                index,
                name: entry.name.clone(),
            };
            if let Some(target) = relative_target(entry.offset_write.as_ref()) {
                if !names.contains(target) {
                    return Err(VolumeError::UnknownOffsetReference {
                        at: at(),
                        target: target.to_owned(),
                    });
                }
            }
            for (content_index, content) in entry.content.iter().enumerate() {
                if let Some(target) = relative_target(content.offset_write.as_ref()) {
                    if !names.contains(target) {
                        return Err(VolumeError::UnknownContentReference {
                            at: at(),
                            content: ContentRef {
                                index: content_index,
                                image: content.image_name().to_owned(),
                            },
                            target: target.to_owned(),
                        });
                    }
                }
            }
        }

        let bootloader = match self.bootloader.as_deref().unwrap_or_default() {
            "" => None,
            "grub" => Some(Bootloader::Grub),
            "u-boot" => Some(Bootloader::UBoot),
            "android-boot" => Some(Bootloader::AndroidBoot),
            _ => return Err(VolumeError::UnknownBootloader),
        };

        Ok(Volume {
            schema,
            bootloader,
            id: self.id.clone().unwrap_or_default(),
            structure,
        })
    }
}

fn relative_target(offset_write: Option<&RelativeOffset>) -> Option<&str> {
    offset_write.and_then(|ow| ow.relative_to.as_deref())
}

/// ASCII letters, digits, and hyphens, not starting with a hyphen.
fn is_valid_volume_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphanumeric() && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}
