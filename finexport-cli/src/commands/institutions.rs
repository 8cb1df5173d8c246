//! Institutions command - list the registry in processing order

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use super::load_registry;
use crate::output;

pub fn run(path: Option<&Path>, json: bool) -> Result<()> {
    let registry = load_registry(path)?;

    if json {
        let entries: Vec<_> = registry
            .lookup_all()
            .iter()
            .map(|(alias, institution)| {
                json!({
                    "alias": alias,
                    "id": institution.id,
                    "display_name": institution.display_name,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{}", "Supported Institutions".bold());
    println!();

    let mut table = output::create_table();
    table.set_header(vec!["Alias", "Institution ID", "Name"]);
    for (alias, institution) in registry.lookup_all() {
        table.add_row(vec![
            alias.as_str(),
            institution.id.as_str(),
            institution.display_name.as_str(),
        ]);
    }
    println!("{}", table);
    Ok(())
}
