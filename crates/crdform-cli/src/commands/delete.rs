//! Delete command - remove a tracked resource

use console::style;
use crdform_core::Variant;
use crdform_kube::ResourceHandler;
use std::path::Path;

use crate::context::{Context, Document};
use crate::error::{CliError, Result};

pub async fn run(ctx: &Context, state_path: &Path, keep_state: bool) -> Result<()> {
    let doc = Document::read(state_path)?;
    let rt = ctx.cluster_type(&doc.type_name, Variant::Resource)?;
    let state = doc.value();
    let id = state.get("id").as_str().unwrap_or_default().to_string();

    let mut handler = ResourceHandler::new(rt);
    handler.configure(ctx.provider().await?)?;

    println!("{} Deleting {}", style("→").blue(), style(&id).cyan());
    handler.delete(&state).await?;

    if !keep_state {
        std::fs::remove_file(state_path).map_err(|e| CliError::io_at(state_path, e))?;
    }
    println!("{} Deleted {}", style("✓").green().bold(), style(&id).cyan());
    Ok(())
}
