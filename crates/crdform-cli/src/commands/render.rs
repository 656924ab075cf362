//! Render command - manifests from plan files, no cluster needed

use crdform_core::{Variant, schema};
use crdform_kube::ManifestHandler;
use std::path::{Path, PathBuf};

use super::validate::ensure_valid;
use crate::context::{Context, Document};
use crate::error::{CliError, Result};

/// Render every plan as a manifest; resource type names render their manifest variant
pub fn render_all(ctx: &Context, plans: &[PathBuf]) -> Result<String> {
    let mut documents = Vec::with_capacity(plans.len());
    for plan in plans {
        let doc = Document::read(plan)?;
        let (rt, _) = ctx.catalog.resolve(&doc.type_name, Variant::Manifest)?;

        let mut values = doc.value();
        ensure_valid(&rt, Variant::Manifest, &values)?;
        schema::apply_defaults(&rt.schema(Variant::Manifest), &mut values);

        let handler = ManifestHandler::new(rt);
        let state = handler.read(&values)?;
        let yaml = state.get("yaml").as_str().unwrap_or_default().to_string();
        tracing::debug!(plan = %plan.display(), id = ?state.get("id").as_str(), "rendered plan");
        documents.push(yaml);
    }
    Ok(documents.join("---\n"))
}

pub fn run(ctx: &Context, plans: &[PathBuf], output: Option<&Path>) -> Result<()> {
    let rendered = render_all(ctx, plans)?;
    match output {
        Some(path) => {
            std::fs::write(path, &rendered).map_err(|e| CliError::io_at(path, e))?;
            eprintln!(
                "{} Wrote {} manifest(s) to {}",
                console::style("✓").green(),
                plans.len(),
                path.display()
            );
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
