//! `tether greeting`.

use anyhow::Result;

use crate::OutputFormat;

/// Print the host-side greeting.
pub(crate) fn run(format: OutputFormat) -> Result<()> {
    let greeting = tether_binding::greeting();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&greeting)?),
        OutputFormat::Text => println!("{}", greeting.message),
    }
    Ok(())
}
