use super::{colorize_role, format_size, json_pretty, load_layout, EXIT_SUCCESS};
use std::path::Path;
use strata_schema::Volume;

pub fn run(layout: &Path, relaxed: bool, json: bool) -> Result<u8, String> {
    let document = load_layout(layout, relaxed)?;
    if json {
        println!("{}", json_pretty(&document)?);
        return Ok(EXIT_SUCCESS);
    }

    if !document.defaults.is_empty() {
        println!("defaults:     {} stanzas", document.defaults.len());
    }
    if !document.connections.is_empty() {
        println!("connections:");
        for connection in &document.connections {
            println!("  {} -> {}", connection.plug, connection.slot);
        }
    }
    if document.volumes.is_empty() {
        println!("no volumes declared");
    }
    for (name, volume) in &document.volumes {
        print_volume(name, volume);
    }
    Ok(EXIT_SUCCESS)
}

fn print_volume(name: &str, volume: &Volume) {
    println!("volume: {name}");
    println!("  schema:      {}", volume.schema);
    match &volume.bootloader {
        Some(bootloader) => println!("  bootloader:  {bootloader}"),
        None => println!("  bootloader:  (none)"),
    }
    if !volume.id.is_empty() {
        println!("  id:          {}", volume.id);
    }
    if volume.structure.is_empty() {
        return;
    }

    println!(
        "  {:<5} {:<16} {:<12} {:<5} {:<16} {:<8} {:<8} TYPE",
        "IDX", "NAME", "ROLE", "FS", "LABEL", "SIZE", "CONTENT"
    );
    for (index, structure) in volume.structure.iter().enumerate() {
        let role = structure
            .role
            .map_or_else(String::new, |r| colorize_role(&r.to_string()));
        let filesystem = structure
            .filesystem
            .map_or_else(String::new, |f| f.to_string());
        println!(
            "  {:<5} {:<16} {:<12} {:<5} {:<16} {:<8} {:<8} {}",
            format!("#{index}"),
            structure.name,
            role,
            filesystem,
            structure.label,
            format_size(structure.size),
            structure.content.len(),
            structure.partition_type,
        );
    }
}
