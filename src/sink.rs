//! Result sinks: JSON documents and terminal tables

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::results::ConsequenceTable;

/// `{"headers": [...], "rows": [[...], ...]}`
pub fn to_json(table: &ConsequenceTable) -> Value {
    json!({
        "headers": table.headers(),
        "rows": table.rows(),
    })
}

pub fn write_json(table: &ConsequenceTable, path: &Path) -> Result<()> {
    let body = serde_json::to_string_pretty(&to_json(table))?;
    fs::write(path, body).with_context(|| format!("writing results to {}", path.display()))?;
    Ok(())
}

/// Fixed-width rendering with one line per row
pub fn format_table(table: &ConsequenceTable) -> String {
    let cells: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect();

    let widths: Vec<usize> = table
        .headers()
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|row| row[i].len())
                .fold(h.len(), usize::max)
        })
        .collect();

    let line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut output = String::new();
    output.push_str(&line(table.headers().iter().map(String::as_str).collect()));
    output.push('\n');
    output.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    output.push('\n');
    for row in &cells {
        output.push_str(&line(row.iter().map(String::as_str).collect()));
        output.push('\n');
    }
    output
}
