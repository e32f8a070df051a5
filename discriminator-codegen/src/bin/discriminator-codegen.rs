/// CLI: compiles a JSON Schema with discriminated unions, then emits a
/// validator, checks instances, or prints the tag mappings.
///
/// Usage:
///   discriminator-codegen emit --target js < schema.json > validator.mjs
///   discriminator-codegen emit schema.json > validator.mjs
///   discriminator-codegen check schema.json a.json b.json
///   discriminator-codegen mapping schema.json
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use discriminator_codegen::{compile_with, emit_js, CompileOptions, DiscriminatorOption, Validator};

#[derive(Parser, Debug)]
#[command(name = "discriminator-codegen", version, about)]
struct Cli {
    /// JSON file with compile options, e.g. {"discriminator": {"strict": false}}.
    #[arg(long, global = true)]
    options: Option<PathBuf>,

    /// Ignore `discriminator`; `oneOf` keeps its plain semantics.
    #[arg(long, global = true)]
    no_discriminator: bool,

    /// Tolerate an author-supplied discriminator `mapping`.
    #[arg(long, global = true, conflicts_with = "no_discriminator")]
    lenient_mapping: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a schema and print the generated validator.
    Emit {
        #[arg(long, short, value_enum, default_value_t = Target::Js)]
        target: Target,
        /// Schema file; read from stdin when omitted.
        schema: Option<PathBuf>,
    },
    /// Validate instance files. Exits with status 1 when any is invalid.
    Check {
        schema: PathBuf,
        #[arg(required = true)]
        instances: Vec<PathBuf>,
    },
    /// Print every discriminator's location, tag name and tag mapping.
    Mapping { schema: PathBuf },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Target {
    #[value(alias = "javascript")]
    Js,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = load_options(&cli)?;

    match &cli.command {
        Command::Emit { target, schema } => {
            let schema = read_json(schema.as_deref())?;
            let compiled = compile_with(&schema, &options).context("invalid schema")?;
            let code = match target {
                Target::Js => emit_js::emit(&compiled),
            };
            print!("{code}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { schema, instances } => {
            let schema = read_json(Some(schema))?;
            let validator = Validator::with_options(&schema, &options).context("invalid schema")?;
            let mut invalid = 0usize;
            for path in instances {
                let instance = read_json(Some(path))?;
                match validator.validate(&instance) {
                    Ok(()) => println!("{}: valid", path.display()),
                    Err(errors) => {
                        invalid += 1;
                        println!("{}: invalid", path.display());
                        for err in errors {
                            println!("  {err} ({})", err.schema_path);
                        }
                    }
                }
            }
            tracing::info!(checked = instances.len(), invalid, "checked instances");
            Ok(if invalid == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Mapping { schema } => {
            let schema = read_json(Some(schema))?;
            let compiled = compile_with(&schema, &options).context("invalid schema")?;
            let listing: Vec<Value> = compiled
                .discriminators()
                .into_iter()
                .map(|d| {
                    json!({
                        "location": d.location,
                        "tagName": d.tag_name,
                        "mapping": d.mapping,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Options file first, then flags on top.
fn load_options(cli: &Cli) -> Result<CompileOptions> {
    let mut options = match &cli.options {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid options in {}", path.display()))?
        }
        None => CompileOptions::default(),
    };
    if cli.no_discriminator {
        options.discriminator = DiscriminatorOption::Enabled(false);
    } else if cli.lenient_mapping {
        options.discriminator = DiscriminatorOption::Configured { strict: false };
    }
    tracing::debug!(?options, "compile options");
    Ok(options)
}

/// Parse JSON from `path`, or from stdin when `None`.
fn read_json(path: Option<&Path>) -> Result<Value> {
    let (text, source) = match path {
        Some(path) => (
            std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?,
            path.display().to_string(),
        ),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("cannot read stdin")?;
            (buf, "<stdin>".to_string())
        }
    };
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {source}"))
}
