pub mod completions;
pub mod inspect;
pub mod validate;

use std::path::Path;
use strata_schema::{parse_layout, Document, LayoutMode, Size};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_LAYOUT_ERROR: u8 = 2;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn layout_mode(relaxed: bool) -> LayoutMode {
    if relaxed {
        LayoutMode::Relaxed
    } else {
        LayoutMode::Strict
    }
}

pub fn read_layout_text(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read layout {}: {e}", path.display()))
}

/// Read a layout file and parse it in the requested mode.
pub fn load_layout(path: &Path, relaxed: bool) -> Result<Document, String> {
    let input = read_layout_text(path)?;
    parse_layout(&input, layout_mode(relaxed)).map_err(|e| e.to_string())
}

/// Render a size the way layout documents spell it: `50M`, `2G`, or raw
/// bytes when no suffix divides evenly.
pub fn format_size(size: Size) -> String {
    let bytes = size.bytes();
    if bytes > 0 && bytes % Size::GIB.bytes() == 0 {
        format!("{}G", bytes / Size::GIB.bytes())
    } else if bytes > 0 && bytes % Size::MIB.bytes() == 0 {
        format!("{}M", bytes / Size::MIB.bytes())
    } else {
        bytes.to_string()
    }
}

pub fn colorize_role(role: &str) -> String {
    use console::Style;
    match role {
        "mbr" => Style::new().yellow().apply_to(role).to_string(),
        "system-boot" => Style::new().cyan().apply_to(role).to_string(),
        "system-data" => Style::new().green().apply_to(role).to_string(),
        other => other.to_owned(),
    }
}
