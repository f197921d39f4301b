//! `tether hello`.

use anyhow::{Context, Result};
use tether_binding::{Binding, DylibSource};

use crate::OutputFormat;

/// Load the module and call `hello`.
pub(crate) fn run(source: DylibSource, format: OutputFormat) -> Result<()> {
    let binding = Binding::new(source);
    let text = binding.hello().context("native hello failed")?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "hello": text })),
        OutputFormat::Text => println!("{text}"),
    }
    Ok(())
}
