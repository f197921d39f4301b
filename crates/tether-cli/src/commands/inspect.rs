//! `tether inspect`.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tether_binding::{
    DECLARED_OPERATIONS, DylibSource, ModuleManifest, ModuleSource, NativeExports,
    OperationDescriptor, verify,
};

use crate::OutputFormat;
use crate::theme::Theme;

/// Locate and open the module, then report its manifest against the
/// host's declarations.
///
/// Exits with an error when the module does not honor them.
pub(crate) fn run(source: DylibSource, format: OutputFormat) -> Result<()> {
    let path = source.resolve()?;
    let hash = file_hash(&path)?;
    let module = source
        .open()
        .with_context(|| format!("failed to load {}", path.display()))?;
    let manifest = module.manifest();
    let contract = verify(manifest, DECLARED_OPERATIONS);

    match format {
        OutputFormat::Json => {
            let report = json!({
                "path": path.display().to_string(),
                "blake3": hash,
                "module": manifest_json(manifest),
                "contract": match &contract {
                    Ok(()) => Value::from("ok"),
                    Err(mismatch) => Value::from(mismatch.to_string()),
                },
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        },
        OutputFormat::Text => {
            println!("{}", Theme::header("Native module"));
            println!("{}", Theme::separator());
            println!("{}", Theme::field("path", &path.display().to_string()));
            println!("{}", Theme::field("blake3", &hash));
            println!("{}", Theme::field("name", &manifest.name));
            println!("{}", Theme::field("version", &manifest.version));
            println!("{}", Theme::field("abi", &manifest.abi_version.to_string()));
            println!();
            println!("{}", Theme::header("Operations"));
            for op in &manifest.operations {
                let line = format!("  {}", signature(op));
                if is_declared(op) {
                    println!("{line}");
                } else {
                    println!("{}", Theme::dimmed(&format!("{line} (undeclared)")));
                }
            }
            println!();
            match &contract {
                Ok(()) => println!("{}", Theme::success("declarations verified")),
                Err(mismatch) => println!("{}", Theme::error(&mismatch.to_string())),
            }
        },
    }

    contract.context("native module does not honor the host declarations")
}

fn file_hash(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

fn is_declared(op: &OperationDescriptor) -> bool {
    DECLARED_OPERATIONS.iter().any(|sig| sig.name == op.name)
}

fn signature(op: &OperationDescriptor) -> String {
    let params = op
        .params
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ");
    let fallible = if op.fallible { " !" } else { "" };
    format!("{}({params}) -> {}{fallible}", op.name, op.ret)
}

fn manifest_json(manifest: &ModuleManifest) -> Value {
    let operations: Vec<Value> = manifest
        .operations
        .iter()
        .map(|op| {
            json!({
                "name": op.name,
                "params": op.params.iter().map(|t| t.name()).collect::<Vec<_>>(),
                "returns": op.ret.name(),
                "fallible": op.fallible,
                "declared": is_declared(op),
            })
        })
        .collect();
    json!({
        "name": manifest.name,
        "version": manifest.version,
        "abi_version": manifest.abi_version,
        "operations": operations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_binding::{HELLO, TypeTag};

    #[test]
    fn signature_renders_params_and_fallibility() {
        let op = OperationDescriptor {
            name: "greet".into(),
            params: vec![TypeTag::Text, TypeTag::Int],
            ret: TypeTag::Text,
            fallible: true,
        };
        assert_eq!(signature(&op), "greet(text, int) -> text !");
        assert_eq!(
            signature(&OperationDescriptor::from(&HELLO)),
            "hello() -> text"
        );
    }

    #[test]
    fn manifest_json_marks_undeclared_operations() {
        let manifest = ModuleManifest::new(
            "fixture",
            "1.0.0",
            vec![
                OperationDescriptor::from(&HELLO),
                OperationDescriptor {
                    name: "extra".into(),
                    params: Vec::new(),
                    ret: TypeTag::Unit,
                    fallible: false,
                },
            ],
        );
        let value = manifest_json(&manifest);
        assert_eq!(value["operations"][0]["declared"], true);
        assert_eq!(value["operations"][1]["declared"], false);
        assert_eq!(value["operations"][0]["returns"], "text");
    }
}
