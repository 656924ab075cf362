//! Apply command - create or update a resource through server-side apply

use console::style;
use crdform_core::{Value, Variant, schema};
use crdform_kube::{HandlerError, ResourceHandler};
use std::path::Path;

use super::validate::ensure_valid;
use crate::context::{Context, Document, default_state_path};
use crate::error::{CliError, Result};

pub async fn run(ctx: &Context, plan_path: &Path, state_path: Option<&Path>) -> Result<()> {
    let doc = Document::read(plan_path)?;
    let rt = ctx.cluster_type(&doc.type_name, Variant::Resource)?;
    let state_path = state_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_state_path(plan_path));

    let mut plan = doc.value();
    ensure_valid(&rt, Variant::Resource, &plan)?;
    schema::apply_defaults(&rt.schema(Variant::Resource), &mut plan);

    let mut handler = ResourceHandler::new(rt);
    handler.configure(ctx.provider().await?)?;

    let prior = if state_path.exists() {
        let prior = Document::read(&state_path)?;
        if prior.type_name != doc.type_name {
            return Err(CliError::usage_with_help(
                format!(
                    "{} tracks a {}, not a {}",
                    state_path.display(),
                    prior.type_name,
                    doc.type_name
                ),
                "pass a different --state file",
            ));
        }
        Some(prior.value())
    } else {
        None
    };

    let state = apply_plan(&handler, &doc.type_name, &plan, prior.as_ref(), &state_path).await?;
    println!(
        "{} Applied {} (resource version {})",
        style("✓").green().bold(),
        style(state.get("id").as_str().unwrap_or_default()).cyan(),
        state
            .get_path("metadata.resource_version")
            .as_str()
            .unwrap_or("unknown")
    );
    println!("  State written to {}", state_path.display());
    Ok(())
}

/// Create or update, then write the state file.
///
/// A create whose upsert wait times out still leaves the object in the
/// cluster, so the planned state is recorded before the timeout is returned.
async fn apply_plan(
    handler: &ResourceHandler,
    type_name: &str,
    plan: &Value,
    prior: Option<&Value>,
    state_path: &Path,
) -> Result<Value> {
    let result = match prior {
        Some(prior) => {
            println!(
                "{} Updating {}",
                style("→").blue(),
                style(prior.get("id").as_str().unwrap_or_default()).cyan()
            );
            handler.update(plan, prior).await
        }
        None => {
            println!("{} Creating {}", style("→").blue(), handler.type_name());
            handler.create(plan).await
        }
    };

    let state = match result {
        Ok(state) => state,
        Err(err @ HandlerError::UpsertTimedOut { .. }) if prior.is_none() => {
            let pending = handler.planned_state(plan)?;
            Document::new(type_name.to_string(), &pending).write(state_path)?;
            tracing::warn!(state = %state_path.display(), "wait timed out, recorded planned state");
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    Document::new(type_name.to_string(), &state).write(state_path)?;
    Ok(state)
}
