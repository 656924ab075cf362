//! Schema command - show the attribute schema of a type

use clap::ValueEnum;
use crdform_core::Variant;

use crate::context::Context;
use crate::display::format_schema;
use crate::error::{CliError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VariantArg {
    Resource,
    DataSource,
    Manifest,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Resource => Variant::Resource,
            VariantArg::DataSource => Variant::DataSource,
            VariantArg::Manifest => Variant::Manifest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaFormat {
    /// Indented attribute tree
    Tree,
    /// Full attribute definitions
    Yaml,
}

/// `<type>_manifest` selects the manifest variant regardless of `--variant`
pub fn run(ctx: &Context, type_name: &str, variant: VariantArg, format: SchemaFormat) -> Result<()> {
    let (rt, variant) = ctx.catalog.resolve(type_name, variant.into())?;
    let schema = rt.schema(variant);

    match format {
        SchemaFormat::Tree => {
            println!("{} ({})", rt.type_name(variant), variant);
            if let Some(description) = &rt.description {
                println!("{description}");
            }
            println!();
            print!("{}", format_schema(&schema));
        }
        SchemaFormat::Yaml => {
            let yaml = serde_yaml::to_string(&schema)
                .map_err(|e| CliError::validation("Unable to serialize schema", e.to_string()))?;
            print!("{yaml}");
        }
    }
    Ok(())
}
