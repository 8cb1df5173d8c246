//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Two-column name/value table without a header
pub fn key_value_table<I, K, V>(rows: I) -> Table
where
    I: IntoIterator<Item = (K, V)>,
    K: ToString,
    V: ToString,
{
    let mut table = create_table();
    for (key, value) in rows {
        table.add_row(vec![key.to_string().bold().to_string(), value.to_string()]);
    }
    table
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}
