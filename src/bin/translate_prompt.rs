//! translate-prompt — 将对话 JSON 转换为指定模型的请求消息
//!
//! Usage:
//!   translate-prompt translate <prompt.json> <model-id> [--registry <file>] [--uploads <dir>]
//!   translate-prompt parse-tools <model-id> <output.txt> [--registry <file>]
//!   translate-prompt dialects
//!
//! Diagnostics go to stderr; set `RUST_LOG=ai_dialects=debug` to see
//! dialect selection and trimming.

use anyhow::{bail, Context};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use ai_dialects::vision::{FileUploadEncoder, NoUploads, UploadEncoder};
use ai_dialects::{DialectRegistry, ModelConfig, ModelRegistry, Prompt};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let outcome = match args[1].as_str() {
        "translate" => cmd_translate(&args[2..]),
        "parse-tools" => cmd_parse_tools(&args[2..]),
        "dialects" => cmd_dialects(),
        "version" | "--version" | "-V" => {
            println!("translate-prompt {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"translate-prompt — 对话方言转换工具

USAGE:
    translate-prompt <COMMAND> [OPTIONS]

COMMANDS:
    translate <prompt.json> <model-id>    Print the translated messages as JSON
    parse-tools <model-id> <output.txt>   Print tool calls found in model output
    dialects                              List dialects in selection order
    version                               Show version information
    help                                  Show this help message

OPTIONS:
    --registry <file>    Model registry (YAML, or JSON by extension)
    --uploads <dir>      Directory that upload ids resolve against

ENVIRONMENT:
    RUST_LOG             Log filter, e.g. ai_dialects=debug"#
    );
}

/// Value following `flag`, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Arguments that are neither flags nor flag values.
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip = false;
    for arg in args {
        if skip {
            skip = false;
        } else if arg.starts_with("--") {
            skip = true;
        } else {
            out.push(arg.as_str());
        }
    }
    out
}

fn model_config(args: &[String], model_id: &str) -> anyhow::Result<ModelConfig> {
    let Some(path) = flag_value(args, "--registry") else {
        return Ok(ModelConfig::new(model_id));
    };
    let registry = ModelRegistry::from_path(path)
        .with_context(|| format!("loading model registry {path}"))?;
    Ok(registry.resolve(model_id)?.clone())
}

fn cmd_translate(args: &[String]) -> anyhow::Result<()> {
    let operands = positional(args);
    let &[prompt_path, model_id] = operands.as_slice() else {
        bail!("translate needs <prompt.json> <model-id>");
    };

    let raw = std::fs::read_to_string(prompt_path)
        .with_context(|| format!("reading prompt {prompt_path}"))?;
    let prompt = Prompt::from_json(&raw).with_context(|| format!("parsing prompt {prompt_path}"))?;
    let config = model_config(args, model_id)?;

    let uploads: Arc<dyn UploadEncoder> = match flag_value(args, "--uploads") {
        Some(dir) => Arc::new(FileUploadEncoder::new(PathBuf::from(dir))),
        None => Arc::new(NoUploads),
    };

    let payload = DialectRegistry::new().translate(&prompt, &config, uploads.as_ref())?;
    println!("{}", serde_json::to_string_pretty(&payload.to_json()?)?);
    Ok(())
}

fn cmd_parse_tools(args: &[String]) -> anyhow::Result<()> {
    let operands = positional(args);
    let &[model_id, output_path] = operands.as_slice() else {
        bail!("parse-tools needs <model-id> <output.txt>");
    };

    let output = std::fs::read_to_string(output_path)
        .with_context(|| format!("reading model output {output_path}"))?;
    let config = model_config(args, model_id)?;
    let prompt = Prompt::default();

    let registry = DialectRegistry::new();
    let dialect = registry.dialect_for(&prompt, &config, &NoUploads);
    let calls = dialect.tools_dialect().parse_tool_calls(&output);
    println!("{}", serde_json::to_string_pretty(&calls)?);
    Ok(())
}

fn cmd_dialects() -> anyhow::Result<()> {
    for name in DialectRegistry::new().names() {
        println!("{name}");
    }
    Ok(())
}
