//! Display formatting for CLI output

use console::style;
use crdform_core::{Diagnostic, Diagnostics, Severity};
use crdform_core::schema::Attribute;

/// One diagnostic, Terraform style
pub fn format_diagnostic(diag: &Diagnostic) -> String {
    let marker = match diag.severity {
        Severity::Error => style("✗ Error:").red().bold(),
        Severity::Warning => style("⚠ Warning:").yellow().bold(),
    };
    let mut out = format!("{} {}", marker, diag.summary);
    if let Some(path) = &diag.path {
        out.push_str(&format!("\n    with {}", style(path).cyan()));
    }
    if !diag.detail.is_empty() {
        out.push_str(&format!("\n    {}", diag.detail));
    }
    out
}

/// Print all diagnostics and return (errors, warnings)
pub fn print_diagnostics(diags: &Diagnostics) -> (usize, usize) {
    for diag in diags.iter() {
        println!("  {}", format_diagnostic(diag));
    }
    count(diags)
}

/// Same as [`print_diagnostics`], for commands whose stdout is data
pub fn print_diagnostics_to_stderr(diags: &Diagnostics) -> (usize, usize) {
    for diag in diags.iter() {
        eprintln!("{}", format_diagnostic(diag));
    }
    count(diags)
}

fn count(diags: &Diagnostics) -> (usize, usize) {
    let errors = diags.errors().count();
    (errors, diags.len() - errors)
}

/// Attribute tree as an indented listing
pub fn format_schema(attributes: &[Attribute]) -> String {
    let mut out = String::new();
    write_attributes(&mut out, attributes, 0);
    out
}

fn write_attributes(out: &mut String, attributes: &[Attribute], depth: usize) {
    for attr in attributes {
        let indent = "  ".repeat(depth);
        let mut flags = Vec::new();
        if attr.required {
            flags.push("required");
        }
        if attr.optional {
            flags.push("optional");
        }
        if attr.computed {
            flags.push("computed");
        }
        if attr.sensitive {
            flags.push("sensitive");
        }
        out.push_str(&format!(
            "{}{} ({}) [{}]\n",
            indent,
            attr.name,
            attr.ty.describe(),
            flags.join(", ")
        ));
        if let Some(nested) = attr.attributes() {
            write_attributes(out, nested, depth + 1);
        }
    }
}
