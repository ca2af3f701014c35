//! CLI Output Formatting.
//!
//! Text output is styled with `console`; JSON output is one document per call.

use console::style;
use serde::{Deserialize, Serialize};

use crate::utils::math::format_wad;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
    /// Pretty JSON format
    JsonPretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMATTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Output formatter for CLI
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create new formatter
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Get format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json | OutputFormat::JsonPretty)
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.is_json() {
            self.print_json(&serde_json::json!({ "status": "success", "message": message }));
        } else {
            println!("{} {}", style("✓").green(), message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        if self.is_json() {
            self.print_json(&serde_json::json!({ "status": "error", "message": message }));
        } else {
            eprintln!("{} {}", style("✗").red().bold(), message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.is_json() {
            self.print_json(&serde_json::json!({ "status": "warning", "message": message }));
        } else {
            println!("{} {}", style("⚠").yellow(), message);
        }
    }

    /// Print a serializable value (text mode prints it as an indented tree)
    pub fn data<T: Serialize + ?Sized>(&self, data: &T) {
        if self.is_json() {
            self.print_json(data);
        } else {
            match serde_json::to_value(data) {
                Ok(json) => self.print_text(&json, 0),
                // u128 amounts above u64::MAX have no `Value` form
                Err(_) => {
                    if let Ok(json) = serde_json::to_string_pretty(data) {
                        println!("{}", json);
                    }
                }
            }
        }
    }

    /// Print key-value pairs under a title
    pub fn section(&self, title: &str, rows: &[(&str, String)]) {
        if self.is_json() {
            let map: serde_json::Map<String, serde_json::Value> = rows
                .iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
                .collect();
            self.print_json(&serde_json::json!({ title: map }));
            return;
        }

        println!("{} {}", style("→").cyan(), style(title).bold());
        let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in rows {
            println!("  {:width$}  {}", key, style(value).green(), width = width);
        }
    }

    fn print_json<T: Serialize + ?Sized>(&self, data: &T) {
        let output = if matches!(self.format, OutputFormat::JsonPretty) {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        };
        if let Ok(json) = output {
            println!("{}", json);
        }
    }

    fn print_text(&self, json: &serde_json::Value, indent: usize) {
        let prefix = "  ".repeat(indent);
        match json {
            serde_json::Value::Object(map) => {
                for (key, value) in map {
                    if value.is_object() || value.is_array() {
                        println!("{}{}:", prefix, style(key).bold());
                        self.print_text(value, indent + 1);
                    } else {
                        println!("{}{}: {}", prefix, style(key).bold(), format_value(value));
                    }
                }
            }
            serde_json::Value::Array(arr) => {
                for (i, item) in arr.iter().enumerate() {
                    println!("{}[{}]:", prefix, i);
                    self.print_text(item, indent + 1);
                }
            }
            _ => println!("{}{}", prefix, format_value(json)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALUE FORMATTING
// ═══════════════════════════════════════════════════════════════════════════════

/// Format a JSON value for text output
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "-".into(),
        other => other.to_string(),
    }
}

/// An 18-decimal amount with its unit
pub fn format_amount(amount: u128, unit: &str) -> String {
    format!("{} {}", format_wad(amount), unit)
}

/// A collateralization ratio; unbounded ratios (no debt) print as infinity
pub fn format_ratio(ratio: u128) -> String {
    if ratio == u128::MAX {
        "∞".into()
    } else {
        format!("{}%", ratio)
    }
}

/// A basis-point rate as a percentage
pub fn format_rate(rate_bps: u128) -> String {
    format!("{}.{:02}%", rate_bps / 100, rate_bps % 100)
}
