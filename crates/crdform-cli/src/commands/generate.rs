//! Generate command - resource type definitions from CRD manifests

use console::style;
use crdform_core::crd::{CrdParser, resource_types};
use crdform_core::Diagnostics;
use std::path::{Path, PathBuf};

use crate::context::read_file;
use crate::display::print_diagnostics_to_stderr;
use crate::error::{CliError, Result};

/// Definitions are written in the format `--schemas` reads back
pub fn run(crds: &[PathBuf], output: Option<&Path>) -> Result<()> {
    let mut types = Vec::new();
    let mut diags = Diagnostics::new();

    for path in crds {
        let yaml = read_file(path)?;
        for crd in CrdParser::parse_all(&yaml)? {
            let (generated, warnings) = resource_types(&crd);
            diags.extend(warnings);
            for rt in generated {
                for (_, problems) in rt.validate_implementation() {
                    diags.extend(problems);
                }
                types.push(rt);
            }
        }
    }

    let (errors, warnings) = print_diagnostics_to_stderr(&diags);
    if errors > 0 {
        return Err(CliError::diagnostics_failed("Generation", errors, warnings));
    }

    let yaml = serde_yaml::to_string(&types)
        .map_err(|e| CliError::validation("Unable to serialize definitions", e.to_string()))?;
    match output {
        Some(path) => {
            std::fs::write(path, yaml).map_err(|e| CliError::io_at(path, e))?;
            eprintln!(
                "{} Generated {} resource type(s) into {}",
                style("✓").green().bold(),
                types.len(),
                path.display()
            );
        }
        None => print!("{yaml}"),
    }
    Ok(())
}
