use super::{json_pretty, layout_mode, read_layout_text, EXIT_LAYOUT_ERROR, EXIT_SUCCESS};
use console::Style;
use serde::Serialize;
use std::path::Path;
use strata_schema::parse_layout;
use tracing::debug;

#[derive(Serialize)]
struct Report {
    valid: bool,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    volumes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    structures: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(layout: &Path, relaxed: bool, json_output: bool) -> Result<u8, String> {
    let input = read_layout_text(layout)?;
    debug!(path = %layout.display(), relaxed, "validating layout");

    match parse_layout(&input, layout_mode(relaxed)) {
        Ok(document) => {
            let volumes = document.volumes.len();
            let structures: usize = document.volumes.values().map(|v| v.structure.len()).sum();
            if json_output {
                let report = Report {
                    valid: true,
                    path: layout.display().to_string(),
                    volumes: Some(volumes),
                    structures: Some(structures),
                    error: None,
                };
                println!("{}", json_pretty(&report)?);
            } else {
                let tick = Style::new().green().apply_to("✓");
                println!(
                    "{tick} {}: {volumes} volumes, {structures} structures",
                    layout.display()
                );
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            let message = e.to_string();
            if json_output {
                let report = Report {
                    valid: false,
                    path: layout.display().to_string(),
                    volumes: None,
                    structures: None,
                    error: Some(message),
                };
                println!("{}", json_pretty(&report)?);
            } else {
                let cross = Style::new().red().apply_to("✗");
                println!("{cross} {}: {message}", layout.display());
            }
            Ok(EXIT_LAYOUT_ERROR)
        }
    }
}
