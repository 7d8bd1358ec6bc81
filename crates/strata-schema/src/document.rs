//! Top-level gadget layout parsing: defaults, connections, volumes, and the
//! bootloader invariant.

use crate::raw::{RawConnection, RawDocument};
use crate::volume::{Volume, VolumeError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Validation mode for a parse pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LayoutMode {
    /// Core devices: volumes with exactly one bootloader are required.
    #[default]
    Strict,
    /// Classic devices: an entirely empty document is acceptable.
    Relaxed,
}

/// Which side of a connection an endpoint string belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Plug,
    Slot,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndpointKind::Plug => "plug",
            EndpointKind::Slot => "slot",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("gadget connection plug cannot be empty")]
    EmptyPlug,
    #[error("in gadget connection {kind}: expected \"(<snap-id>|system):name\" not \"{value}\"")]
    Endpoint { kind: EndpointKind, value: String },
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Decode(#[from] serde_yaml::Error),
    #[error("default stanza not keyed by \"system\" or snap-id: {0}")]
    ForeignDefaultsKey(String),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("invalid volume \"{name}\": {source}")]
    Volume { name: String, source: VolumeError },
    #[error("bootloader must be one of grub, u-boot or android-boot")]
    InvalidBootloader,
    #[error("bootloader not declared in any volume")]
    MissingBootloader,
    #[error("too many ({0}) bootloaders declared")]
    TooManyBootloaders(usize),
}

/// Document-level failure carrying the stable prefix callers match on.
#[derive(Debug, Error)]
#[error("cannot read gadget snap details: {source}")]
pub struct ReadError {
    #[from]
    source: DocumentError,
}

/// One capability connection endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    /// The literal `system` or a snap identifier.
    pub snap_id: String,
    /// Interface name on that snap.
    pub name: String,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.snap_id, self.name)
    }
}

/// A plug-to-slot interface connection declared by the gadget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub plug: Endpoint,
    /// Resolved slot; defaults to `system:<plug name>` when left out.
    pub slot: Endpoint,
}

/// A fully validated gadget layout document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    /// Per-snap default configuration, keyed by `system` or snap-id and
    /// passed through opaquely.
    pub defaults: BTreeMap<String, BTreeMap<String, serde_yaml::Value>>,
    pub connections: Vec<Connection>,
    /// Volumes keyed by name.
    pub volumes: BTreeMap<String, Volume>,
}

/// Parse and validate a gadget layout document from YAML text.
pub fn parse_layout(input: &str, mode: LayoutMode) -> Result<Document, ReadError> {
    let raw: Option<RawDocument> = serde_yaml::from_str(input).map_err(DocumentError::Decode)?;
    Ok(raw.unwrap_or_default().resolve(mode)?)
}

/// Validate an already-decoded document tree.
pub fn parse_layout_value(tree: serde_yaml::Value, mode: LayoutMode) -> Result<Document, ReadError> {
    let raw: Option<RawDocument> = serde_yaml::from_value(tree).map_err(DocumentError::Decode)?;
    Ok(raw.unwrap_or_default().resolve(mode)?)
}

impl RawDocument {
    /// Validate the document and resolve defaults, connections, and volumes.
    pub fn resolve(self, mode: LayoutMode) -> Result<Document, DocumentError> {
        let mut defaults = BTreeMap::new();
        for (key, options) in self.defaults.into_iter().flatten() {
            if key != "system" && !is_snap_id(&key) {
                return Err(DocumentError::ForeignDefaultsKey(key));
            }
            defaults.insert(key, options.unwrap_or_default());
        }

        let mut connections = Vec::new();
        for raw in self.connections.into_iter().flatten() {
            connections.push(resolve_connection(raw.unwrap_or_default())?);
        }

        let raw_volumes = self.volumes.unwrap_or_default();
        if mode == LayoutMode::Relaxed && raw_volumes.is_empty() {
            // volumes are not required on classic devices
            return Ok(Document {
                defaults,
                connections,
                volumes: BTreeMap::new(),
            });
        }

        let mut volumes = BTreeMap::new();
        let mut bootloaders = 0usize;
        for (name, raw) in raw_volumes {
            let volume = raw.resolve(&name).map_err(|source| match source {
                // a bad bootloader is a document-level problem, not a
                // volume-scoped one
                VolumeError::UnknownBootloader => DocumentError::InvalidBootloader,
                source => DocumentError::Volume {
                    name: name.clone(),
                    source,
                },
            })?;
            if volume.bootloader.is_some() {
                bootloaders += 1;
            }
            volumes.insert(name, volume);
        }

        match bootloaders {
            0 => Err(DocumentError::MissingBootloader),
            1 => Ok(Document {
                defaults,
                connections,
                volumes,
            }),
            n => Err(DocumentError::TooManyBootloaders(n)),
        }
    }
}

fn resolve_connection(raw: RawConnection) -> Result<Connection, ConnectionError> {
    let plug = match raw.plug {
        None => return Err(ConnectionError::EmptyPlug),
        Some(text) => parse_endpoint(EndpointKind::Plug, &text)?,
    };
    let slot = match raw.slot {
        Some(text) => parse_endpoint(EndpointKind::Slot, &text)?,
        None => Endpoint {
            snap_id: "system".to_owned(),
            name: plug.name.clone(),
        },
    };
    Ok(Connection { plug, slot })
}

fn parse_endpoint(kind: EndpointKind, text: &str) -> Result<Endpoint, ConnectionError> {
    let invalid = || ConnectionError::Endpoint {
        kind,
        value: text.to_owned(),
    };
    let Some((snap_id, name)) = text.split_once(':') else {
        return Err(invalid());
    };
    if snap_id.is_empty() || name.is_empty() || name.contains(':') {
        return Err(invalid());
    }
    Ok(Endpoint {
        snap_id: snap_id.to_owned(),
        name: name.to_owned(),
    })
}

/// Snap identifiers are 32 lowercase ASCII letters and digits.
fn is_snap_id(text: &str) -> bool {
    text.len() == 32
        && text
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}
