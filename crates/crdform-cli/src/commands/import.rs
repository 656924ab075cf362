//! Import command - start tracking an existing object

use console::style;
use crdform_core::Variant;
use crdform_kube::{ReadOutcome, ResourceHandler};
use std::path::Path;

use crate::context::{Context, Document};
use crate::error::{CliError, Result};

/// Seed state from the id, then read the object unless offline.
///
/// Writes the state to `output`, or prints it.
pub async fn run(ctx: &Context, type_name: &str, id: &str, output: Option<&Path>) -> Result<()> {
    let rt = ctx.cluster_type(type_name, Variant::Resource)?;
    let mut handler = ResourceHandler::new(rt);
    let seeded = handler.import_state(id)?;

    let state = if ctx.config.offline {
        eprintln!(
            "{} Offline: state for {} is seeded from the id only; run `crdform refresh` once connected",
            style("⚠").yellow(),
            id
        );
        seeded
    } else {
        handler.configure(ctx.provider().await?)?;
        match handler.read(&seeded).await? {
            ReadOutcome::Present(state) => state,
            ReadOutcome::Gone => {
                return Err(CliError::validation(
                    "Cannot import non-existent remote object",
                    format!("{type_name} {id} was not found in the cluster"),
                ));
            }
        }
    };

    let doc = Document::new(type_name, &state);
    match output {
        Some(path) => {
            doc.write(path)?;
            eprintln!(
                "{} Imported {} into {}",
                style("✓").green().bold(),
                style(id).cyan(),
                path.display()
            );
        }
        None => print!("{}", doc.to_yaml()?),
    }
    Ok(())
}
