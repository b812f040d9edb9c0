//! Structured per-file outcomes and run-wide aggregation.
//!
//! Outcomes are collected as data during the run; the notification text
//! is rendered from them only at send time.

use std::path::Path;

use stevedore_core::DiscoveredFile;

use crate::parser::ImportCounts;

/// Result of importing a single file. A failure carries the artifact id
/// of the captured output when one was stored.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Imported {
        file: DiscoveredFile,
        counts: ImportCounts,
    },
    Failed {
        file: DiscoveredFile,
        reason: String,
        exit_code: Option<i64>,
        log_id: Option<String>,
    },
}

/// Everything one run produced, in processing order.
#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: Vec<FileOutcome>,
}

impl RunReport {
    pub fn push(&mut self, outcome: FileOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[FileOutcome] {
        &self.outcomes
    }

    /// Run totals. Each failed file counts as exactly one error unit on
    /// top of the parsed counters.
    pub fn totals(&self) -> ImportCounts {
        let mut totals = ImportCounts::default();
        for outcome in &self.outcomes {
            match outcome {
                FileOutcome::Imported { counts, .. } => {
                    totals.messages += counts.messages;
                    totals.warnings += counts.warnings;
                    totals.errors += counts.errors;
                }
                FileOutcome::Failed { .. } => totals.errors += 1,
            }
        }
        totals
    }

    /// A quiet run produced nothing worth notifying about.
    pub fn is_quiet(&self) -> bool {
        self.totals().total() == 0
    }

    /// Render the notification body: one line per noteworthy file.
    /// Imported files with all-zero counts produce no line.
    pub fn summary_lines(&self, base_url: &str) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|outcome| summary_line(outcome, base_url))
            .collect()
    }
}

fn summary_line(outcome: &FileOutcome, base_url: &str) -> Option<String> {
    match outcome {
        FileOutcome::Imported { file, counts } => {
            if counts.is_empty() {
                return None;
            }
            let mut line = format!("- {}:", display_name(&file.name));
            if counts.messages > 0 {
                line.push_str(&format!(" {} NEW", counts.messages));
            }
            if counts.warnings > 0 {
                line.push_str(&format!(" {} WARNINGS", counts.warnings));
            }
            if counts.errors > 0 {
                line.push_str(&format!(" {} ERRORS", counts.errors));
            }
            Some(line)
        }
        FileOutcome::Failed {
            file,
            reason,
            exit_code,
            log_id,
        } => {
            let mut line = match exit_code {
                Some(code) => {
                    let mut described = format!("- {}: exit code {}", display_name(&file.name), code);
                    if let Some(meaning) = exit_code_message(*code) {
                        described.push_str(&format!(" ({meaning})"));
                    }
                    described
                }
                None => format!("- {}: {}", display_name(&file.name), reason),
            };
            if let Some(id) = log_id {
                line.push_str(&format!(" [View Log]({base_url}/logs/{id})"));
            }
            Some(line)
        }
    }
}

/// File name with the extension stripped, upper-cased for the summary.
pub(crate) fn display_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
        .to_uppercase()
}

/// Human-readable meanings for the import command's documented exit
/// codes. Unknown codes render without a meaning suffix.
pub(crate) fn exit_code_message(exit_code: i64) -> Option<&'static str> {
    match exit_code {
        1 => Some("generic error or unspecified problem during import"),
        64 => Some("cannot connect to the application"),
        65 => Some("invalid path provided"),
        66 => Some("path is not allowed"),
        67 => Some("there are no files in the provided directory"),
        68 => Some("cannot read configuration file"),
        69 => Some("cannot parse configuration file"),
        70 => Some("the importable file cannot be found"),
        71 => Some("the importable file cannot be read"),
        72 => Some("too many errors processing the data in the importable file"),
        73 => Some("nothing was imported during this run"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> DiscoveredFile {
        DiscoveredFile {
            name: name.to_string(),
            path: format!("/import/{name}"),
            extension: ".json".to_string(),
        }
    }

    fn counts(messages: u64, warnings: u64, errors: u64) -> ImportCounts {
        ImportCounts {
            messages,
            warnings,
            errors,
        }
    }

    #[test]
    fn totals_sum_parsed_counts() {
        let mut report = RunReport::default();
        report.push(FileOutcome::Imported {
            file: file("a.json"),
            counts: counts(2, 1, 0),
        });
        report.push(FileOutcome::Imported {
            file: file("b.json"),
            counts: counts(4, 0, 3),
        });

        assert_eq!(report.totals(), counts(6, 1, 3));
        assert!(!report.is_quiet());
    }

    #[test]
    fn each_failure_counts_as_exactly_one_error_unit() {
        let mut report = RunReport::default();
        report.push(FileOutcome::Failed {
            file: file("a.json"),
            reason: "deadline".to_string(),
            exit_code: None,
            log_id: None,
        });
        report.push(FileOutcome::Imported {
            file: file("b.json"),
            counts: counts(0, 0, 0),
        });

        assert_eq!(report.totals(), counts(0, 0, 1));
    }

    #[test]
    fn empty_report_is_quiet() {
        let report = RunReport::default();
        assert!(report.is_quiet());
        assert_eq!(report.totals(), ImportCounts::default());
        assert!(report.summary_lines("http://localhost").is_empty());
    }

    #[test]
    fn imported_line_names_the_file_and_non_zero_counts_only() {
        let mut report = RunReport::default();
        report.push(FileOutcome::Imported {
            file: file("accounts.json"),
            counts: counts(2, 0, 1),
        });

        let lines = report.summary_lines("http://localhost");
        assert_eq!(lines, vec!["- ACCOUNTS: 2 NEW 1 ERRORS"]);
    }

    #[test]
    fn all_zero_import_emits_no_line() {
        let mut report = RunReport::default();
        report.push(FileOutcome::Imported {
            file: file("accounts.json"),
            counts: counts(0, 0, 0),
        });
        assert!(report.summary_lines("http://localhost").is_empty());
    }

    #[test]
    fn failed_line_carries_exit_code_meaning_and_log_link() {
        let mut report = RunReport::default();
        report.push(FileOutcome::Failed {
            file: file("accounts.json"),
            reason: "output did not match".to_string(),
            exit_code: Some(64),
            log_id: Some("abc-123".to_string()),
        });

        let lines = report.summary_lines("http://importer.local");
        assert_eq!(
            lines,
            vec![
                "- ACCOUNTS: exit code 64 (cannot connect to the application) \
                 [View Log](http://importer.local/logs/abc-123)"
            ]
        );
    }

    #[test]
    fn failed_line_without_exit_code_falls_back_to_the_reason() {
        let mut report = RunReport::default();
        report.push(FileOutcome::Failed {
            file: file("accounts.json"),
            reason: "command did not finish within 3600s".to_string(),
            exit_code: None,
            log_id: None,
        });

        let lines = report.summary_lines("http://localhost");
        assert_eq!(
            lines,
            vec!["- ACCOUNTS: command did not finish within 3600s"]
        );
    }

    #[test]
    fn unknown_exit_code_renders_without_a_meaning() {
        let mut report = RunReport::default();
        report.push(FileOutcome::Failed {
            file: file("accounts.json"),
            reason: String::new(),
            exit_code: Some(42),
            log_id: None,
        });

        assert_eq!(
            report.summary_lines("http://localhost"),
            vec!["- ACCOUNTS: exit code 42"]
        );
    }

    #[test]
    fn display_name_strips_only_the_final_extension() {
        assert_eq!(display_name("accounts.json"), "ACCOUNTS");
        assert_eq!(display_name("2024.backup.json"), "2024.BACKUP");
        assert_eq!(display_name("noext"), "NOEXT");
    }
}
