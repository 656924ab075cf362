//! Types command - list registered resource types

use console::style;
use crdform_core::Variant;

use crate::context::Context;
use crate::error::Result;

pub fn run(ctx: &Context, manifests: bool) -> Result<()> {
    println!(
        "{} {} resource type(s)",
        style("→").blue(),
        ctx.catalog.len()
    );

    for rt in ctx.catalog.iter() {
        let scope = if rt.identity.namespaced {
            "namespaced"
        } else {
            "cluster"
        };
        println!(
            "  {}  {} ({}, {})",
            style(rt.type_name(Variant::Resource)).cyan(),
            rt.identity.kind,
            rt.identity.api_version(),
            scope
        );
        if manifests {
            println!("  {}", style(rt.type_name(Variant::Manifest)).dim());
        }
    }
    Ok(())
}
