//! Form Schema CLI
//!
//! Command-line interface for resolving form schemas, computing default
//! form state and addressing trees, and validating form data.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

use form_schema::{
    compute_default_form_state, load_schema, load_schema_auto, retrieve_schema, to_id_schema,
    to_path_schema, validate, ArrayMinItems, ConstAsDefaults, EmptyObjectFields, IdOptions,
    StateOptions, ValidateError,
};

#[derive(Parser)]
#[command(name = "form-schema")]
#[command(about = "Resolve form schemas and compute form state")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a schema against form data into a single effective schema
    Resolve {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Form data file (no data if not specified)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Compute default form state for a schema
    Defaults {
        /// Schema source: file path or URL
        schema: String,

        /// Form data file to overlay on the defaults
        #[arg(long)]
        data: Option<PathBuf>,

        /// How object properties without form data are populated
        #[arg(long, value_enum, default_value = "populate-all")]
        empty_object_fields: EmptyObjectFieldsArg,

        /// When arrays are padded up to minItems
        #[arg(long, value_enum, default_value = "always")]
        array_min_items: ArrayMinItemsArg,

        /// Whether const/single-enum values act as defaults
        #[arg(long, value_enum, default_value = "always")]
        const_as_defaults: ConstAsDefaultsArg,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the id schema (DOM id per field)
    Ids {
        /// Schema source: file path or URL
        schema: String,

        /// Form data file (drives array indices)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Id of the root field
        #[arg(long, default_value = "root")]
        id_prefix: String,

        /// Separator between id segments
        #[arg(long, default_value = "_")]
        id_separator: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the path schema (dotted logical path per field)
    Paths {
        /// Schema source: file path or URL
        schema: String,

        /// Form data file (drives array indices)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate form data against a resolved schema
    Validate {
        /// Schema source: file path or URL
        schema: String,

        /// Form data file to validate
        data: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmptyObjectFieldsArg {
    PopulateAll,
    PopulateRequired,
    Skip,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ArrayMinItemsArg {
    Always,
    RequiredOnly,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConstAsDefaultsArg {
    Always,
    Never,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve {
            schema,
            data,
            output,
            pretty,
        } => run_resolve(&schema, data.as_deref(), output, pretty),

        Commands::Defaults {
            schema,
            data,
            empty_object_fields,
            array_min_items,
            const_as_defaults,
            pretty,
        } => {
            let options = StateOptions::new()
                .empty_object_fields(match empty_object_fields {
                    EmptyObjectFieldsArg::PopulateAll => EmptyObjectFields::PopulateAll,
                    EmptyObjectFieldsArg::PopulateRequired => EmptyObjectFields::PopulateRequired,
                    EmptyObjectFieldsArg::Skip => EmptyObjectFields::Skip,
                })
                .array_min_items(match array_min_items {
                    ArrayMinItemsArg::Always => ArrayMinItems::Always,
                    ArrayMinItemsArg::RequiredOnly => ArrayMinItems::RequiredOnly,
                })
                .const_as_defaults(match const_as_defaults {
                    ConstAsDefaultsArg::Always => ConstAsDefaults::Always,
                    ConstAsDefaultsArg::Never => ConstAsDefaults::Never,
                });
            run_defaults(&schema, data.as_deref(), &options, pretty)
        }

        Commands::Ids {
            schema,
            data,
            id_prefix,
            id_separator,
            pretty,
        } => {
            let options = IdOptions::new().prefix(id_prefix).separator(id_separator);
            run_ids(&schema, data.as_deref(), &options, pretty)
        }

        Commands::Paths {
            schema,
            data,
            pretty,
        } => run_paths(&schema, data.as_deref(), pretty),

        Commands::Validate { schema, data, json } => run_validate(&schema, &data, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Load the schema and optional form data file named on the command line.
fn load_inputs(
    schema_source: &str,
    data_path: Option<&std::path::Path>,
) -> Result<(Value, Option<Value>), u8> {
    let schema = load_schema_auto(schema_source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let data = match data_path {
        Some(path) => Some(load_schema(path).map_err(|e| {
            eprintln!("Error loading form data: {}", e);
            e.exit_code() as u8
        })?),
        None => None,
    };

    Ok((schema, data))
}

fn print_value(value: &Value, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_resolve(
    schema_source: &str,
    data_path: Option<&std::path::Path>,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let (schema, data) = load_inputs(schema_source, data_path)?;

    let resolved = retrieve_schema(&schema, &schema, data.as_ref()).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    print_value(&resolved, output, pretty)
}

fn run_defaults(
    schema_source: &str,
    data_path: Option<&std::path::Path>,
    options: &StateOptions,
    pretty: bool,
) -> Result<(), u8> {
    let (schema, data) = load_inputs(schema_source, data_path)?;

    let state = compute_default_form_state(&schema, data.as_ref(), &schema, options)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    print_value(&state.unwrap_or(Value::Null), None, pretty)
}

fn run_ids(
    schema_source: &str,
    data_path: Option<&std::path::Path>,
    options: &IdOptions,
    pretty: bool,
) -> Result<(), u8> {
    let (schema, data) = load_inputs(schema_source, data_path)?;

    let ids = to_id_schema(&schema, None, &schema, data.as_ref(), options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    print_value(&ids, None, pretty)
}

fn run_paths(
    schema_source: &str,
    data_path: Option<&std::path::Path>,
    pretty: bool,
) -> Result<(), u8> {
    let (schema, data) = load_inputs(schema_source, data_path)?;

    let paths = to_path_schema(&schema, "", &schema, data.as_ref()).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    print_value(&paths, None, pretty)
}

fn run_validate(schema_source: &str, data_path: &std::path::Path, json: bool) -> Result<(), u8> {
    let (schema, data) = load_inputs(schema_source, Some(data_path))?;
    let data = data.unwrap_or(Value::Null);

    match validate(&schema, &data, &schema) {
        Ok(()) => {
            if json {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(ValidateError::Resolve(e)) => {
            if json {
                println!(r#"{{"valid":false,"error":"{}"}}"#, e);
            } else {
                eprintln!("Error: {}", e);
            }
            Err(e.exit_code() as u8)
        }
    }
}
