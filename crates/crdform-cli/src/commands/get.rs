//! Get command - read an object through the data source variant

use crdform_core::{Value, Variant, parse_import_id};
use crdform_kube::DataSourceHandler;

use crate::context::{Context, Document};
use crate::error::{CliError, Result};

/// `id` takes the import id format: `<namespace>/<name>` or `<name>`
pub async fn run(ctx: &Context, type_name: &str, id: &str) -> Result<()> {
    let rt = ctx.cluster_type(type_name, Variant::DataSource)?;
    let object = parse_import_id(id, rt.identity.namespaced).map_err(|diag| CliError::Usage {
        message: format!("{}: {}", diag.summary, diag.detail),
        help: None,
    })?;

    let mut metadata = Value::object();
    metadata.set("name", Value::String(object.name.clone()));
    if let Some(namespace) = &object.namespace {
        metadata.set("namespace", Value::String(namespace.clone()));
    }
    let mut config = Value::object();
    config.set("metadata", metadata);

    let mut handler = DataSourceHandler::new(rt);
    handler.configure(ctx.provider().await?)?;
    let state = handler.read(&config).await?;

    print!("{}", Document::new(type_name, &state).to_yaml()?);
    Ok(())
}
