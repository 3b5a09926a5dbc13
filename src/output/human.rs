//! Human-friendly terminal output.

use console::style;
use serde_json::Value;
use tracing::debug;

use super::{Output, VersionInfo};
use crate::adapter::PhotoDir;
use crate::diff::Change;
use crate::error::CameraError;
use crate::events::CameraEvent;

/// Styled text output. `console` drops the colors when stdout is not a
/// terminal or `NO_COLOR` is set.
#[derive(Debug, Default)]
pub struct HumanOutput;

impl HumanOutput {
    pub const fn new() -> Self {
        Self
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn render_change(change: &Change) -> String {
    let side = |v: &Option<Value>| v.as_ref().map_or_else(|| "(none)".to_string(), render_value);
    format!("{} -> {}", side(&change.before), side(&change.after))
}

impl Output for HumanOutput {
    fn success(&self, message: &str) {
        println!("{} {message}", style("[OK]").green().bold());
    }

    fn error(&self, error: &CameraError) {
        debug!(error = %error, recoverable = error.is_user_recoverable(), "Outputting error");
        eprintln!("{} {}", style("[ERR]").red().bold(), style(error).bold());
        if let Some(suggestion) = error.suggestion() {
            eprintln!("  {} {}", style("Suggestion:").yellow(), style(suggestion).dim());
        }
    }

    fn document(&self, title: &str, value: &Value) {
        println!("{}", style(title).bold().underlined());
        match value {
            Value::Object(map) => {
                let width = map.keys().map(String::len).max().unwrap_or(0);
                for (key, value) in map {
                    println!("  {:width$}  {}", style(key).cyan(), render_value(value));
                }
            }
            other => println!("  {}", render_value(other)),
        }
    }

    fn list(&self, title: &str, items: &[String]) {
        println!("{}", style(title).bold().underlined());
        for item in items {
            println!("  {item}");
        }
    }

    fn url(&self, url: &str) {
        println!("{url}");
    }

    fn event(&self, event: &CameraEvent) {
        let stamp = chrono::Local::now().format("%H:%M:%S%.3f");
        let name = style(event.kind()).magenta().bold();
        match event.differences() {
            Some(differences) => {
                println!("{} {name}", style(stamp).dim());
                for (key, change) in differences.iter() {
                    println!("    {}: {}", style(key).cyan(), render_change(change));
                }
            }
            None => println!("{} {name}", style(stamp).dim()),
        }
    }

    fn photos(&self, dirs: &[PhotoDir]) {
        if dirs.is_empty() {
            println!("No photos on the card");
            return;
        }
        for dir in dirs {
            println!(
                "{} ({} files)",
                style(&dir.name).bold(),
                dir.files.len()
            );
            for file in &dir.files {
                println!("  {file}");
            }
        }
    }

    fn version_info(&self, info: &VersionInfo) {
        println!("{} {}", style("grctl").bold().cyan(), info.version);
        println!("  commit   {} (dirty: {})", info.git_sha, info.git_dirty);
        println!("  built    {}", info.build_timestamp);
        println!("  rustc    {}", info.rustc);
        println!("  target   {}", info.target);
    }
}
