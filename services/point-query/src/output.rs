//! Rendering query results.

use anyhow::Result;
use clap::ValueEnum;
use std::fmt::{self, Write};

use crate::query::QueryResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub fn render(result: &QueryResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Table => {
            let mut out = String::new();
            write_table(&mut out, result)?;
            Ok(out)
        }
    }
}

fn write_table<W: Write>(out: &mut W, result: &QueryResult) -> fmt::Result {
    writeln!(
        out,
        "# {:.4}°N {:.4}°E, model elevation {:.0} m",
        result.latitude,
        result.longitude,
        result.model_elevation.numeric()
    )?;

    let labels: Vec<String> = result
        .columns
        .iter()
        .map(|column| format!("{} ({})", column.variable, column.values.unit.symbol()))
        .collect();
    let widths: Vec<usize> = labels.iter().map(|l| l.chars().count().max(12)).collect();

    let mut header = format!("{:<20}", "time");
    for (label, width) in labels.iter().zip(&widths) {
        write!(header, " {:>width$}", label, width = *width)?;
    }
    writeln!(out, "{}", header.trim_end())?;

    for (row, timestamp) in result.time.iter().enumerate() {
        let mut line = format!("{:<20}", timestamp.format("%Y-%m-%dT%H:%M"));
        for (column, width) in result.columns.iter().zip(&widths) {
            let cell = match column.values.data.get(row) {
                Some(value) if !value.is_nan() => format!("{:.2}", value),
                _ => "-".to_string(),
            };
            write!(line, " {:>width$}", cell, width = *width)?;
        }
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}
