//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cli::args::{OutputFormat, QcacheArgs};
use crate::error::Result;
use crate::qcache::stats::QcacheStatus;

/// Result structure for the simulate command.
#[derive(Debug, Serialize, Deserialize)]
pub struct SimulationReport {
    pub queries: usize,
    pub threads: usize,
    pub hits: usize,
    pub misses: usize,
    pub mismatches: usize,
    pub duration_ms: u64,
    pub queries_per_second: f64,
    pub status: QcacheStatus,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &QcacheArgs) -> Result<()> {
    if args.output_format == OutputFormat::Json {
        let json = if args.pretty {
            serde_json::to_string_pretty(result)?
        } else {
            serde_json::to_string(result)?
        };
        println!("{json}");
        return Ok(());
    }

    if args.output_format == OutputFormat::Human && args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;
    for line in render_lines(&value, 0, args.output_format == OutputFormat::Human) {
        println!("{line}");
    }
    Ok(())
}

/// Render a report as indented `key: value` lines.
///
/// Reports are flat records with at most nested records, which is valid
/// YAML as is. Human output additionally prints byte counts in units.
fn render_lines(value: &Value, depth: usize, human: bool) -> Vec<String> {
    let Value::Object(fields) = value else {
        return vec![scalar(value)];
    };

    let indent = "  ".repeat(depth);
    let mut lines = Vec::with_capacity(fields.len());
    for (key, field) in fields {
        if field.is_object() {
            lines.push(format!("{indent}{key}:"));
            lines.extend(render_lines(field, depth + 1, human));
            continue;
        }

        let rendered = match field.as_u64() {
            Some(bytes) if human && key.ends_with("bytes") => format_bytes(bytes),
            _ => scalar(field),
        };
        lines.push(format!("{indent}{key}: {rendered}"));
    }
    lines
}

fn scalar(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// Byte count in binary units with one decimal, e.g. `16.0 MB`.
fn format_bytes(bytes: u64) -> String {
    const STEP: f64 = 1024.0;

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut size = bytes as f64 / STEP;
    let mut unit = "KB";
    for larger in ["MB", "GB", "TB"] {
        if size < STEP {
            break;
        }
        size /= STEP;
        unit = larger;
    }
    format!("{size:.1} {unit}")
}
