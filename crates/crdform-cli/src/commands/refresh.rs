//! Refresh command - re-read a tracked resource from the cluster

use console::style;
use crdform_core::Variant;
use crdform_kube::{ReadOutcome, ResourceHandler};
use std::path::Path;

use crate::context::{Context, Document};
use crate::error::{CliError, Result};

pub async fn run(ctx: &Context, state_path: &Path) -> Result<()> {
    let doc = Document::read(state_path)?;
    let rt = ctx.cluster_type(&doc.type_name, Variant::Resource)?;

    let mut handler = ResourceHandler::new(rt);
    handler.configure(ctx.provider().await?)?;

    match handler.read(&doc.value()).await? {
        ReadOutcome::Present(state) => {
            Document::new(doc.type_name, &state).write(state_path)?;
            println!(
                "{} Refreshed {}",
                style("✓").green().bold(),
                style(state.get("id").as_str().unwrap_or_default()).cyan()
            );
        }
        ReadOutcome::Gone => {
            std::fs::remove_file(state_path).map_err(|e| CliError::io_at(state_path, e))?;
            println!(
                "{} {} no longer exists; removed {}",
                style("⚠").yellow(),
                doc.value().get("id").as_str().unwrap_or_default(),
                state_path.display()
            );
        }
    }
    Ok(())
}
