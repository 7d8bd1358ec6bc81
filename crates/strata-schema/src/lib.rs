//! Gadget layout document parsing and validation.
//!
//! A gadget layout document describes how a device image is put together:
//! one or more volumes, each a sequence of partitions and raw regions, plus
//! system-wide defaults and interface connections. This crate decodes the
//! YAML wire format ([`raw`]), resolves the scalar grammars ([`Size`],
//! [`RelativeOffset`]), classifies partition types ([`PartitionType`]), and
//! validates the whole document into the typed [`Document`] model consumed
//! by image builders and update tooling. Parsing is pure: no file or device
//! access happens here.

pub mod document;
pub mod partition;
pub mod raw;
pub mod size;
pub mod structure;
pub mod volume;

pub use document::{
    parse_layout, parse_layout_value, Connection, ConnectionError, Document, DocumentError,
    Endpoint, EndpointKind, LayoutMode, ReadError,
};
pub use partition::{PartitionType, PartitionTypeError};
pub use size::{RelativeOffset, RelativeOffsetError, Size, SizeError};
pub use structure::{
    Content, ContentError, ContentPayload, Filesystem, Role, RoleError, Structure, StructureError,
    Update, UpdateError, MBR_REGION_SIZE,
};
pub use volume::{Bootloader, ContentRef, Schema, StructureRef, Volume, VolumeError};
