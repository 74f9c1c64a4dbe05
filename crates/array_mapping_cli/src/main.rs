mod loader;

use std::path::{Path, PathBuf};

use array_mapping::{
    validate_mapping_spec, FunctionRegistry, MappingPlan, MappingSpec, ResolveError,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "array-mapping")]
#[command(version, about = "Map nested JSON/YAML documents using declarative YAML rules")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Validate(ValidateArgs),
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct ValidateArgs {
    #[arg(short = 's', long)]
    spec: PathBuf,
    #[arg(short = 'e', long, default_value = "text")]
    error_format: ErrorFormat,
}

#[derive(Args)]
struct ResolveArgs {
    #[arg(short = 's', long)]
    spec: PathBuf,
    #[arg(short = 'i', long)]
    input: PathBuf,
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
    /// Treat the input as an array and resolve every element.
    #[arg(long)]
    each: bool,
    /// Report every configuration error before resolving.
    #[arg(long)]
    validate: bool,
    #[arg(long)]
    pretty: bool,
    #[arg(short = 'e', long, default_value = "text")]
    error_format: ErrorFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ErrorFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match cli.command {
        Commands::Validate(args) => run_validate(args),
        Commands::Resolve(args) => run_resolve(args),
    };
    std::process::exit(exit_code);
}

fn init_logging(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        })
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_validate(args: ValidateArgs) -> i32 {
    let spec = match load_spec(&args.spec) {
        Ok(spec) => spec,
        Err(code) => return code,
    };

    let registry = FunctionRegistry::with_builtins();
    match validate_mapping_spec(&spec, &registry) {
        Ok(()) => {
            info!(rules = spec.len(), "mapping spec is valid");
            0
        }
        Err(errors) => {
            emit_errors(&errors, None, args.error_format);
            2
        }
    }
}

fn run_resolve(args: ResolveArgs) -> i32 {
    let spec = match load_spec(&args.spec) {
        Ok(spec) => spec,
        Err(code) => return code,
    };
    let registry = FunctionRegistry::with_builtins();

    if args.validate {
        if let Err(errors) = validate_mapping_spec(&spec, &registry) {
            emit_errors(&errors, None, args.error_format);
            return 2;
        }
    }

    let plan = match MappingPlan::compile(&spec, &registry) {
        Ok(plan) => plan,
        Err(err) => {
            emit_errors(&[err], None, args.error_format);
            return 2;
        }
    };

    let input = match loader::load_input(&args.input) {
        Ok(input) => input,
        Err(err) => {
            eprintln!("{:#}", err);
            return 1;
        }
    };

    let output = if args.each {
        match resolve_each(&plan, input, args.error_format) {
            Ok(output) => output,
            Err(code) => return code,
        }
    } else {
        match plan.resolve(&input) {
            Ok(output) => output,
            Err(err) => {
                emit_errors(&[err], None, args.error_format);
                return 3;
            }
        }
    };

    let output_text = if args.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    };
    let output_text = match output_text {
        Ok(text) => text,
        Err(err) => {
            eprintln!("failed to serialize output JSON: {}", err);
            return 1;
        }
    };

    match args.output {
        Some(path) => {
            if let Err(err) = loader::write_output(&path, &output_text) {
                eprintln!("{:#}", err);
                return 1;
            }
        }
        None => println!("{}", output_text),
    }

    0
}

fn resolve_each(
    plan: &MappingPlan<'_>,
    input: JsonValue,
    error_format: ErrorFormat,
) -> Result<JsonValue, i32> {
    let items = match input {
        JsonValue::Array(items) => items,
        _ => {
            eprintln!("input must be an array when --each is set");
            return Err(1);
        }
    };

    let mut outputs = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match plan.resolve(item) {
            Ok(output) => outputs.push(output),
            Err(err) => {
                debug!(index, rule = err.rule(), "resolution failed");
                emit_errors(&[err], Some(index), error_format);
                return Err(3);
            }
        }
    }
    info!(count = outputs.len(), "resolved input items");
    Ok(JsonValue::Array(outputs))
}

fn load_spec(path: &Path) -> Result<MappingSpec, i32> {
    loader::load_spec(path).map_err(|err| {
        eprintln!("{:#}", err);
        1
    })
}

fn emit_errors(errors: &[ResolveError], index: Option<usize>, format: ErrorFormat) {
    match format {
        ErrorFormat::Text => {
            for err in errors {
                let mut parts = Vec::new();
                parts.push(format!("E {}", err.kind().as_str()));
                parts.push(format!("rule={}", err.rule()));
                if let Some(index) = index {
                    parts.push(format!("index={}", index));
                }
                parts.push(format!("msg=\"{}\"", err));
                eprintln!("{}", parts.join(" "));
            }
        }
        ErrorFormat::Json => {
            let values: Vec<_> = errors.iter().map(|err| error_json(err, index)).collect();
            eprintln!("{}", serde_json::to_string(&values).unwrap_or_default());
        }
    }
}

fn error_json(err: &ResolveError, index: Option<usize>) -> JsonValue {
    let kind = err.kind();
    let error_type = if kind.is_configuration() {
        "validation"
    } else {
        "resolve"
    };
    let mut value = json!({
        "type": error_type,
        "code": kind.as_str(),
        "rule": err.rule(),
        "message": err.to_string(),
    });

    if let Some(index) = index {
        value["index"] = json!(index);
    }
    match err {
        ResolveError::RequiredFieldMissing { field, .. }
        | ResolveError::ConditionalRequiredFieldMissing { field, .. } => {
            value["field"] = json!(field);
        }
        ResolveError::InvalidDependencyReference {
            dependency, reason, ..
        } => {
            value["dependency"] = json!(dependency);
            value["reason"] = json!(reason.as_str());
        }
        _ => {}
    }

    value
}
