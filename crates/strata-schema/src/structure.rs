//! Structure validation: one partition or raw region within a volume.
//!
//! Validation runs fail-fast in a fixed order (type, role, filesystem,
//! content, update) so a broken document always reports the same first
//! problem.

use crate::partition::{PartitionType, PartitionTypeError};
use crate::raw::{RawContent, RawStructure, RawVolume};
use crate::size::{RelativeOffset, Size};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Largest usable boot sector region: 512 bytes minus the partition table
/// and the two-byte signature.
pub const MBR_REGION_SIZE: Size = Size(446);

/// Well-known structure purposes that activate extra constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Boot sector region, at offset 0 and at most 446 bytes.
    Mbr,
    /// Partition holding the boot assets.
    SystemBoot,
    /// Writable user data partition.
    SystemData,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Mbr => "mbr",
            Role::SystemBoot => "system-boot",
            Role::SystemData => "system-data",
        })
    }
}

/// Filesystems a structure may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Filesystem {
    Vfat,
    Ext4,
    /// Explicitly declared raw, as opposed to leaving the field out.
    None,
}

impl fmt::Display for Filesystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Filesystem::Vfat => "vfat",
            Filesystem::Ext4 => "ext4",
            Filesystem::None => "none",
        })
    }
}

/// What a content entry places into its structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentPayload {
    /// A raw image blob written verbatim into a bare structure.
    Image {
        image: String,
        offset: Option<Size>,
        size: Option<Size>,
    },
    /// Files copied into the structure's mounted filesystem.
    Copy {
        source: String,
        target: String,
        unpack: bool,
    },
}

/// One validated content entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    pub payload: ContentPayload,
    /// Location to patch with this content's start address once placed.
    pub offset_write: Option<RelativeOffset>,
}

impl Content {
    /// Image file name, empty for copy content. Positional error text quotes
    /// this when present.
    pub fn image_name(&self) -> &str {
        match &self.payload {
            ContentPayload::Image { image, .. } => image,
            ContentPayload::Copy { .. } => "",
        }
    }
}

/// Update policy for one structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Update {
    /// Generation number; bumping it marks the structure for an update pass.
    pub edition: u32,
    /// Files kept intact when the structure is rewritten.
    pub preserve: Vec<String>,
}

/// One validated partition or raw region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Structure {
    /// Structure name, empty when unnamed. Named structures are unique
    /// within their volume and addressable by relative offsets.
    pub name: String,
    /// Filesystem label, empty when unset.
    #[serde(rename = "filesystem-label")]
    pub label: String,
    /// Explicit start position, if any.
    pub offset: Option<Size>,
    /// Location to patch with this structure's start address.
    pub offset_write: Option<RelativeOffset>,
    pub size: Size,
    #[serde(rename = "type")]
    pub partition_type: PartitionType,
    /// Effective role, including the implicit mbr role implied by the legacy
    /// `type: mbr` spelling.
    pub role: Option<Role>,
    /// Partition identifier, empty when unset.
    pub id: String,
    pub filesystem: Option<Filesystem>,
    pub content: Vec<Content>,
    pub update: Update,
}

impl Structure {
    /// Whether the structure carries a mountable filesystem.
    pub fn has_filesystem(&self) -> bool {
        !self.partition_type.is_raw()
            && matches!(self.filesystem, Some(Filesystem::Vfat | Filesystem::Ext4))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleError {
    #[error("unsupported role")]
    Unsupported,
    #[error("conflicting type: \"{0}\"")]
    ConflictingType(String),
    #[error("conflicting legacy type: \"mbr\"")]
    ConflictingLegacyType,
    #[error("mbr structures cannot be larger than 446 bytes")]
    MbrOversized,
    #[error("mbr structure must start at offset 0")]
    MbrMisplaced,
    #[error("mbr structure must not specify partition ID")]
    MbrWithId,
    #[error("mbr structures must not specify a file system")]
    MbrWithFilesystem,
    #[error("role of this kind must have an implicit label or \"writable\", not \"{0}\"")]
    ForeignLabel(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("cannot use non-image content for bare file system")]
    FilesOnBare,
    #[error("missing image file name")]
    MissingImage,
    #[error("cannot use image content for non-bare file system")]
    ImageOnFilesystem,
    #[error("missing source or target")]
    MissingSourceOrTarget,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpdateError {
    #[error("preserving files during update is not supported for non-filesystem structures")]
    PreserveWithoutFilesystem,
    #[error("duplicate \"preserve\" entry \"{0}\"")]
    DuplicatePreserve(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("invalid type \"{raw_type}\": {source}")]
    Type {
        raw_type: String,
        source: PartitionTypeError,
    },
    #[error("invalid role \"{role}\": {source}")]
    Role { role: String, source: RoleError },
    #[error("invalid implicit role \"{role}\": {source}")]
    ImplicitRole { role: String, source: RoleError },
    #[error("invalid filesystem \"{0}\"")]
    UnknownFilesystem(String),
    #[error("invalid content #{index}: {source}")]
    Content { index: usize, source: ContentError },
    #[error(transparent)]
    Update(#[from] UpdateError),
}

impl RawStructure {
    /// Validate this structure in the context of its owning volume and build
    /// the resolved form.
    pub fn resolve(&self, volume: &RawVolume) -> Result<Structure, StructureError> {
        let raw_type = self.partition_type.as_deref().unwrap_or_default();
        let declared_schema = volume.schema.as_deref().unwrap_or_default();
        let partition_type =
            PartitionType::classify(raw_type, declared_schema).map_err(|source| {
                StructureError::Type {
                    raw_type: raw_type.to_owned(),
                    source,
                }
            })?;

        let declared_role = self.role.as_deref().unwrap_or_default();
        let role = self.resolve_role().map_err(|source| {
            if declared_role.is_empty() {
                StructureError::ImplicitRole {
                    role: raw_type.to_owned(),
                    source,
                }
            } else {
                StructureError::Role {
                    role: declared_role.to_owned(),
                    source,
                }
            }
        })?;

        let filesystem = match self.filesystem.as_deref().unwrap_or_default() {
            "" => None,
            "vfat" => Some(Filesystem::Vfat),
            "ext4" => Some(Filesystem::Ext4),
            "none" => Some(Filesystem::None),
            other => return Err(StructureError::UnknownFilesystem(other.to_owned())),
        };

        // image content goes into bare structures, file content into
        // filesystem ones; an omitted or `none` filesystem counts as bare
        let bare =
            raw_type == "bare" || !matches!(filesystem, Some(Filesystem::Vfat | Filesystem::Ext4));
        let raw_content = self.content.as_deref().unwrap_or_default();
        let mut content = Vec::with_capacity(raw_content.len());
        for (index, entry) in raw_content.iter().enumerate() {
            let resolved = if bare {
                entry.resolve_image()
            } else {
                entry.resolve_copy()
            }
            .map_err(|source| StructureError::Content { index, source })?;
            content.push(resolved);
        }

        let update = self.resolve_update(!bare)?;

        Ok(Structure {
            name: self.name.clone().unwrap_or_default(),
            label: self.label.clone().unwrap_or_default(),
            offset: self.offset,
            offset_write: self.offset_write.clone(),
            size: self.size.unwrap_or_default(),
            partition_type,
            role,
            id: self.id.clone().unwrap_or_default(),
            filesystem,
            content,
            update,
        })
    }

    fn resolve_role(&self) -> Result<Option<Role>, RoleError> {
        let raw_type = self.partition_type.as_deref().unwrap_or_default();
        let declared = match self.role.as_deref().unwrap_or_default() {
            "" => None,
            "mbr" => Some(Role::Mbr),
            "system-boot" => Some(Role::SystemBoot),
            "system-data" => Some(Role::SystemData),
            _ => return Err(RoleError::Unsupported),
        };

        if matches!(declared, Some(Role::SystemBoot | Role::SystemData)) {
            if raw_type == "bare" {
                return Err(RoleError::ConflictingType("bare".to_owned()));
            }
            if raw_type == "mbr" {
                return Err(RoleError::ConflictingLegacyType);
            }
        }

        // the legacy `type: mbr` spelling implies the mbr role
        let effective = match declared {
            None if raw_type == "mbr" => Some(Role::Mbr),
            other => other,
        };

        match effective {
            Some(Role::Mbr) => {
                if self.size.unwrap_or_default() > MBR_REGION_SIZE {
                    return Err(RoleError::MbrOversized);
                }
                if self.offset.is_some_and(|offset| offset != Size(0)) {
                    return Err(RoleError::MbrMisplaced);
                }
                if self.id.as_deref().is_some_and(|id| !id.is_empty()) {
                    return Err(RoleError::MbrWithId);
                }
                if !matches!(self.filesystem.as_deref().unwrap_or_default(), "" | "none") {
                    return Err(RoleError::MbrWithFilesystem);
                }
            }
            Some(Role::SystemData) => {
                let label = self.label.as_deref().unwrap_or_default();
                if !label.is_empty() && label != "writable" {
                    return Err(RoleError::ForeignLabel(label.to_owned()));
                }
            }
            _ => {}
        }
        Ok(effective)
    }

    fn resolve_update(&self, has_filesystem: bool) -> Result<Update, UpdateError> {
        let raw = self.update.clone().unwrap_or_default();
        let preserve = raw.preserve.unwrap_or_default();
        if !has_filesystem && !preserve.is_empty() {
            return Err(UpdateError::PreserveWithoutFilesystem);
        }
        let mut seen = HashSet::with_capacity(preserve.len());
        for path in &preserve {
            if !seen.insert(path.as_str()) {
                return Err(UpdateError::DuplicatePreserve(path.clone()));
            }
        }
        Ok(Update {
            edition: raw.edition.unwrap_or_default(),
            preserve,
        })
    }
}

impl RawContent {
    fn resolve_image(&self) -> Result<Content, ContentError> {
        if self.source.as_deref().is_some_and(|s| !s.is_empty())
            || self.target.as_deref().is_some_and(|t| !t.is_empty())
        {
            return Err(ContentError::FilesOnBare);
        }
        let image = self.image.as_deref().unwrap_or_default();
        if image.is_empty() {
            return Err(ContentError::MissingImage);
        }
        Ok(Content {
            payload: ContentPayload::Image {
                image: image.to_owned(),
                offset: self.offset,
                size: self.size,
            },
            offset_write: self.offset_write.clone(),
        })
    }

    fn resolve_copy(&self) -> Result<Content, ContentError> {
        if self.image.as_deref().is_some_and(|i| !i.is_empty()) {
            return Err(ContentError::ImageOnFilesystem);
        }
        let source = self.source.as_deref().unwrap_or_default();
        let target = self.target.as_deref().unwrap_or_default();
        if source.is_empty() || target.is_empty() {
            return Err(ContentError::MissingSourceOrTarget);
        }
        Ok(Content {
            payload: ContentPayload::Copy {
                source: source.to_owned(),
                target: target.to_owned(),
                unpack: self.unpack.unwrap_or_default(),
            },
            offset_write: self.offset_write.clone(),
        })
    }
}
