//! CLI tool for inspecting and converting RTTI object streams.
//!
//! Provides commands for:
//! - Listing registered engine types
//! - Dumping the record structure of streams and assets
//! - Converting between the binary stream and JSON
//! - Verifying asset directories against their manifest

mod cli;

use std::fs;
use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;

use cli::{Cli, Commands};
use rtti_core::persistence::io_utils::write_atomic;
use rtti_core::persistence::{AssetStatus, AssetStore};
use rtti_core::serialization::inspect::{inspect_with_limit, StreamObject, StreamValue};
use rtti_core::types::register_engine_types;
use rtti_core::{RttiConfig, RttiContext, UnknownTypePolicy};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(cli, &mut stdout.lock())
}

fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let config = RttiConfig {
        strict_field_kinds: cli.strict,
        unknown_type_policy: if cli.substitute_unknown {
            UnknownTypePolicy::SubstituteNull
        } else {
            UnknownTypePolicy::Fail
        },
        ..Default::default()
    };
    let context = RttiContext::init(config, &[register_engine_types])
        .context("Failed to register engine types")?;

    match cli.command {
        Commands::Types { json } => list_types(&context, json, out),
        Commands::Inspect { file, json } => {
            let bytes = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let root = inspect_with_limit(&bytes, context.config().max_depth)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&root)?)?;
            } else {
                match root {
                    Some(root) => print_object(&context, &root, 0, out)?,
                    None => writeln!(out, "null")?,
                }
            }
            Ok(())
        }
        Commands::ToJson { file } => {
            let bytes = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let serializer = context.serializer();
            let object = serializer.deserialize(&bytes)?;
            let json = serializer.to_json(object.as_ref())?;
            writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
            Ok(())
        }
        Commands::FromJson { json, out: path } => {
            let text =
                fs::read_to_string(&json).with_context(|| format!("reading {}", json.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)?;
            let serializer = context.serializer();
            let object = serializer.from_json(&value)?;
            let bytes = serializer.serialize(object.as_ref())?;
            write_atomic(&path, &bytes)?;
            tracing::info!("Wrote {} bytes to {}", bytes.len(), path.display());
            Ok(())
        }
        Commands::Verify { dir } => {
            let store = AssetStore::with_dir(&dir, context.serializer());
            let reports = store.verify()?;
            let mut failed = 0;
            for report in &reports {
                match &report.status {
                    AssetStatus::Ok { objects } => {
                        writeln!(out, "ok        {} ({} objects)", report.name, objects)?
                    }
                    AssetStatus::Missing => {
                        failed += 1;
                        writeln!(out, "missing   {}", report.name)?
                    }
                    AssetStatus::ChecksumMismatch { expected, actual } => {
                        failed += 1;
                        writeln!(
                            out,
                            "corrupt   {} (expected {:08x}, got {:08x})",
                            report.name, expected, actual
                        )?
                    }
                    AssetStatus::Unreadable { message } => {
                        failed += 1;
                        writeln!(out, "unreadable {}: {}", report.name, message)?
                    }
                }
            }
            if failed > 0 {
                bail!("{} of {} assets failed verification", failed, reports.len());
            }
            Ok(())
        }
    }
}

fn list_types(context: &RttiContext, as_json: bool, out: &mut impl Write) -> Result<()> {
    let registry = context.registry();
    let mut types = Vec::new();
    for type_id in registry.type_ids() {
        let descriptor = registry.resolve(type_id)?;
        types.push(descriptor);
    }

    if as_json {
        let listing: Vec<_> = types
            .iter()
            .map(|descriptor| {
                json!({
                    "id": descriptor.id(),
                    "name": descriptor.name(),
                    "base": descriptor.base_id(),
                    "fields": descriptor.fields().iter().map(|field| json!({
                        "id": field.id(),
                        "name": field.name(),
                        "kind": field.kind(),
                        "plain_type": field.plain_type(),
                        "script_visible": field.is_script_visible(),
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&listing)?)?;
        return Ok(());
    }

    for descriptor in &types {
        match descriptor.base_id() {
            Some(base) => writeln!(out, "{:>6} {} : {}", descriptor.id(), descriptor.name(), base)?,
            None => writeln!(out, "{:>6} {}", descriptor.id(), descriptor.name())?,
        }
        for field in descriptor.fields() {
            let element = field
                .plain_type()
                .map(|plain| format!(" {}", plain))
                .unwrap_or_default();
            let hidden = if field.is_script_visible() { "" } else { " (hidden)" };
            writeln!(
                out,
                "         {:>3} {}: {}{}{}",
                field.id(),
                field.name(),
                field.kind(),
                element,
                hidden
            )?;
        }
    }
    Ok(())
}

/// Prints a stream record tree, naming types the registry knows.
fn print_object(
    context: &RttiContext,
    object: &StreamObject,
    indent: usize,
    out: &mut impl Write,
) -> Result<()> {
    let pad = "  ".repeat(indent);
    let name = |id: rtti_core::RttiId| {
        context
            .registry()
            .resolve(id)
            .map(|descriptor| descriptor.name().to_string())
            .unwrap_or_else(|_| "?".to_string())
    };

    writeln!(out, "{}{} ({})", pad, name(object.type_id), object.type_id)?;
    for level in &object.levels {
        writeln!(out, "{}  [{} ({})]", pad, name(level.type_id), level.type_id)?;
        for field in &level.fields {
            match &field.value {
                StreamValue::Plain(value) => {
                    writeln!(out, "{}    {} = {}", pad, field.field_id, serde_json::to_string(value)?)?
                }
                StreamValue::PlainArray(values) => {
                    writeln!(out, "{}    {} = {}", pad, field.field_id, serde_json::to_string(values)?)?
                }
                StreamValue::Pointer(None) => writeln!(out, "{}    {} = null", pad, field.field_id)?,
                StreamValue::Pointer(Some(nested)) | StreamValue::Value(nested) => {
                    writeln!(out, "{}    {} =", pad, field.field_id)?;
                    print_object(context, nested, indent + 3, out)?;
                }
                StreamValue::PointerArray(elements) => {
                    writeln!(out, "{}    {} = [{} elements]", pad, field.field_id, elements.len())?;
                    for element in elements {
                        match element {
                            Some(nested) => print_object(context, nested, indent + 3, out)?,
                            None => writeln!(out, "{}      null", pad)?,
                        }
                    }
                }
                StreamValue::Opaque { tag } => writeln!(
                    out,
                    "{}    {} = <{} bytes, kind {}>",
                    pad, field.field_id, field.payload_len, tag
                )?,
            }
        }
    }
    Ok(())
}
