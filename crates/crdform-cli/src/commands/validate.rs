//! Validate command - plan-time checks of a plan file

use console::style;
use crdform_core::{Diagnostics, ResourceType, Value, Variant, schema};
use crdform_kube::ResourceHandler;
use std::path::PathBuf;
use std::sync::Arc;

use crate::context::{Context, Document};
use crate::display::{print_diagnostics, print_diagnostics_to_stderr};
use crate::error::{CliError, Result};

/// Plan-time diagnostics for one variant
pub fn plan_diagnostics(rt: &Arc<ResourceType>, variant: Variant, values: &Value) -> Diagnostics {
    match variant {
        // Resource validation also checks the wait blocks
        Variant::Resource => ResourceHandler::new(Arc::clone(rt)).validate_config(values),
        other => schema::validate_config(&rt.schema(other), values),
    }
}

/// Print diagnostics to stderr and fail if any is an error
pub fn ensure_valid(rt: &Arc<ResourceType>, variant: Variant, values: &Value) -> Result<()> {
    let diags = plan_diagnostics(rt, variant, values);
    let (errors, warnings) = print_diagnostics_to_stderr(&diags);
    if errors > 0 {
        return Err(CliError::diagnostics_failed("Validation", errors, warnings));
    }
    Ok(())
}

pub fn run(ctx: &Context, plans: &[PathBuf]) -> Result<()> {
    let mut errors = 0;
    let mut warnings = 0;

    for plan in plans {
        let doc = Document::read(plan)?;
        let (rt, variant) = ctx.catalog.resolve(&doc.type_name, Variant::Resource)?;
        println!(
            "{} Validating {} ({})",
            style("→").blue(),
            plan.display(),
            rt.type_name(variant)
        );

        let diags = plan_diagnostics(&rt, variant, &doc.value());
        if diags.is_empty() {
            println!("  {} No issues", style("✓").green());
        }
        let (e, w) = print_diagnostics(&diags);
        errors += e;
        warnings += w;
    }

    println!();
    if errors > 0 {
        return Err(CliError::diagnostics_failed("Validation", errors, warnings));
    }
    println!("{} Validation passed", style("✓").green().bold());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crdform_core::builtin::certificate;
    use serde_json::json;

    #[test]
    fn test_resource_plan_checks_wait_blocks() {
        let rt = Arc::new(certificate());
        let plan = Value::from(json!({
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {"secret_name": "web-tls", "issuer_ref": {"name": "letsencrypt"}},
            "wait_for_upsert": [{"jsonpath": "status.conditions[?(@.type==", "value": "True"}]
        }));

        let diags = plan_diagnostics(&rt, Variant::Resource, &plan);
        assert!(diags.has_error());

        // manifests have no wait blocks at all
        let diags = plan_diagnostics(&rt, Variant::Manifest, &plan);
        assert!(diags.has_error());
    }

    #[test]
    fn test_valid_manifest_plan() {
        let rt = Arc::new(certificate());
        let plan = Value::from(json!({
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {"secret_name": "web-tls", "issuer_ref": {"name": "letsencrypt"}}
        }));
        assert!(ensure_valid(&rt, Variant::Manifest, &plan).is_ok());
    }
}
