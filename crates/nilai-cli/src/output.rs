//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use nilai_core::{Classification, ImportReport, Label, MarkSummary};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print the result of an import
    pub fn print_report(&self, report: &ImportReport) {
        match self.format {
            OutputFormat::Human => {
                let counts = &report.result;
                println!(
                    "Imported {} mark(s): {} added, {} skipped, {} failed",
                    counts.total, counts.added, counts.skipped, counts.failed
                );

                let Some(details) = &report.details else {
                    return;
                };
                if details.is_empty() {
                    return;
                }
                println!();
                for (mark_id, result) in details {
                    println!("{} {}", classification_label(result.result), mark_id);
                    for warning in &result.warnings {
                        println!("    warning: {}", warning);
                    }
                    for error in &result.errors {
                        match error.error_code {
                            Some(code) => println!("    error [{}]: {}", code, error.error_message),
                            None => println!("    error: {}", error.error_message),
                        }
                    }
                }
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {
                let counts = &report.result;
                println!("{} {} {}", counts.added, counts.skipped, counts.failed);
            }
        }
    }

    /// Print a list of marks
    pub fn print_marks(&self, marks: &[MarkSummary]) {
        match self.format {
            OutputFormat::Human => {
                if marks.is_empty() {
                    println!("No marks found.");
                    return;
                }
                for mark in marks {
                    let archived = if mark.archived_on.is_some() { " [archived]" } else { "" };
                    println!(
                        "{:>5} | {}{} | {} | {}",
                        mark.user_mark_id,
                        truncate(&mark.title, 35),
                        archived,
                        truncate(&mark.url, 45),
                        mark.label.as_deref().unwrap_or("-")
                    );
                    if !mark.tags.is_empty() {
                        println!("      #{}", mark.tags.join(" #"));
                    }
                }
                println!("\n{} mark(s)", marks.len());
            }
            OutputFormat::Json => print_json(&marks),
            OutputFormat::Quiet => {
                for mark in marks {
                    println!("{}", mark.url);
                }
            }
        }
    }

    /// Print a list of labels
    pub fn print_labels(&self, labels: &[Label]) {
        match self.format {
            OutputFormat::Human => {
                if labels.is_empty() {
                    println!("No labels found.");
                    return;
                }
                for label in labels {
                    let scope = if label.is_system() { "system" } else { "user" };
                    println!("{:>5} | {} ({})", label.id, label.name, scope);
                }
                println!("\n{} label(s)", labels.len());
            }
            OutputFormat::Json => print_json(&labels),
            OutputFormat::Quiet => {
                for label in labels {
                    println!("{}", label.name);
                }
            }
        }
    }

    /// Print a list of tags
    pub fn print_tags(&self, tags: &[(String, i64)]) {
        match self.format {
            OutputFormat::Human => {
                if tags.is_empty() {
                    println!("No tags found.");
                    return;
                }
                for (name, count) in tags {
                    println!("{} ({})", name, count);
                }
                println!("\n{} tag(s)", tags.len());
            }
            OutputFormat::Json => {
                let json_tags: Vec<_> = tags
                    .iter()
                    .map(|(name, count)| serde_json::json!({"name": name, "count": count}))
                    .collect();
                print_json(&json_tags);
            }
            OutputFormat::Quiet => {
                for (name, _) in tags {
                    println!("{}", name);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn classification_label(classification: Classification) -> &'static str {
    match classification {
        Classification::Added => "added  ",
        Classification::Skipped => "skipped",
        Classification::Failed => "FAILED ",
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("ünïcödé títlé", 8), "ünïcö...");
    }

    #[test]
    fn test_classification_labels_align() {
        let widths: Vec<_> = [
            Classification::Added,
            Classification::Skipped,
            Classification::Failed,
        ]
        .into_iter()
        .map(|c| classification_label(c).len())
        .collect();
        assert!(widths.iter().all(|w| *w == widths[0]));
    }
}
