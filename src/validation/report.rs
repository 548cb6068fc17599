//! Validation report formatting.

use super::{ValidationIssue, ValidationResult, ValidationSeverity};

/// Formats a validation result into a human-readable report.
pub fn format_report(result: &ValidationResult) -> String {
    let errors: Vec<_> = result.errors().collect();
    let warnings: Vec<_> = result.warnings().collect();

    if errors.is_empty() && warnings.is_empty() {
        return "Configuration is valid.".to_string();
    }

    let mut report = String::new();

    if !errors.is_empty() {
        report.push_str("\nConfig Validation Failed\n");
        report.push_str("========================\n\n");
        for issue in &errors {
            report.push_str(&format_issue(issue));
            report.push('\n');
        }
    }

    if !warnings.is_empty() {
        if !errors.is_empty() {
            report.push_str("Warnings:\n");
            report.push_str("---------\n\n");
        }
        for issue in &warnings {
            report.push_str(&format_issue(issue));
            report.push('\n');
        }
    }

    report.push_str("---\n");
    report.push_str(&format!(
        "{} warning(s), {} error(s)\n",
        warnings.len(),
        errors.len()
    ));

    if !errors.is_empty() {
        report.push_str("No files were converted.\n");
    }

    report
}

fn format_issue(issue: &ValidationIssue) -> String {
    let prefix = match issue.severity {
        ValidationSeverity::Error => "ERROR",
        ValidationSeverity::Warning => "WARNING",
    };

    let mut output = format!("{} {}\n", prefix, issue.path);
    output.push_str(&format!("  └─ {}\n", issue.message));

    if let Some(suggestion) = &issue.suggestion {
        output.push_str(&format!("     {}\n", suggestion));
    }

    output
}
