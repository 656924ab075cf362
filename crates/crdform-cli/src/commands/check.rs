//! Check command - verify every registered schema is internally consistent

use console::style;

use crate::context::Context;
use crate::display::print_diagnostics;
use crate::error::{CliError, Result};

pub fn run(ctx: &Context) -> Result<()> {
    println!(
        "{} Checking {} resource type(s)",
        style("→").blue(),
        ctx.catalog.len()
    );

    let mut errors = 0;
    let mut warnings = 0;
    for rt in ctx.catalog.iter() {
        for (variant, diags) in rt.validate_implementation() {
            let name = rt.type_name(variant);
            if diags.is_empty() {
                println!("  {} {} ({})", style("✓").green(), name, variant);
                continue;
            }
            println!("  {} {} ({})", style("✗").red(), name, variant);
            let (e, w) = print_diagnostics(&diags);
            errors += e;
            warnings += w;
        }
    }

    println!();
    if errors > 0 {
        return Err(CliError::diagnostics_failed("Schema check", errors, warnings));
    }
    println!("{} All schemas are valid", style("✓").green().bold());
    Ok(())
}
