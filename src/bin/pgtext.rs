//! pgtext: PostgreSQL text-format literal tool
//!
//! Render values as SQL literals and inspect array, record and bit-string
//! text produced by the backend.
//!
//! # Usage
//!
//! ```bash
//! # Render a literal
//! pgtext encode text "it's"
//! pgtext encode 'numeric(5,2)' 3.14 --cast
//!
//! # Inspect backend output
//! pgtext array int4 '[0:1]={7,8}'
//! pgtext record '(1,"a,b",)' --columns int4,text,bool
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use pgtext::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pgtext")]
#[command(version)]
#[command(about = "PostgreSQL text-format literal codec", long_about = None)]
#[command(after_help = "EXAMPLES:
    pgtext encode timestamptz '2024-01-02 03:04:05+02' --cast
    pgtext encode 'int4[]' '{{1,2},{3,NULL}}'
    pgtext array text '{a,\"b c\",NULL}'
    pgtext shape '{{1,2},{3,4}}'
    pgtext decode --oid 1007 '[0:1]={5,6}'")]
struct Cli {
    /// Config file (defaults to <config dir>/pgtext/config.toml)
    #[arg(long, global = true, env = "PGTEXT_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a value as a SQL literal
    Encode {
        /// Target type, e.g. `int4`, `varchar(10)`, `numeric(5,2)` or `text[]`
        kind: String,
        /// Value in PostgreSQL text input form
        value: Option<String>,
        /// Prefix the literal with its type name
        #[arg(long)]
        cast: bool,
    },
    /// Decode array text
    Array {
        /// Element type
        kind: String,
        /// Array text, e.g. `{1,2,3}`
        text: String,
        /// Declared dimensions (inferred when omitted)
        #[arg(long)]
        dims: Option<usize>,
    },
    /// Decode composite record text
    Record {
        /// Record text, e.g. `(1,"a,b",)`
        text: String,
        /// Column types; any column count is accepted when omitted
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },
    /// Decode a bit string and print its literal
    Bits {
        /// `B'0101'`, `X'1F'` or bare `0101`
        text: String,
    },
    /// Print the shape of array text
    Shape {
        /// Array text
        text: String,
    },
    /// Decode backend output of a column given its type OID
    Decode {
        /// Type OID from the row description, e.g. 23 or 1007
        #[arg(long)]
        oid: u32,
        /// Text-format value
        text: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("pgtext=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = CodecConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    let codec = Codec::new(config);

    match &cli.command {
        Commands::Encode { kind, value, cast } => {
            encode_command(&codec, kind, value.as_deref(), *cast, cli.format)
        }
        Commands::Array { kind, text, dims } => {
            array_command(&codec, kind, text, *dims, cli.format)
        }
        Commands::Record { text, columns } => record_command(&codec, text, columns, cli.format),
        Commands::Bits { text } => bits_command(&codec, text, cli.format),
        Commands::Shape { text } => shape_command(text, cli.format),
        Commands::Decode { oid, text } => decode_command(&codec, *oid, text, cli.format),
    }
}

fn encode_command(
    codec: &Codec,
    kind: &str,
    value: Option<&str>,
    cast: bool,
    format: OutputFormat,
) -> Result<()> {
    let cast = cast || codec.config().type_cast;

    let literal = if let Some(elem) = kind.trim().strip_suffix("[]") {
        let elem_kind: SqlTypeKind = elem.parse()?;
        let text = value.context("an array literal needs a value")?;
        let shape = infer_shape(text)?;
        let (array, shape) = codec.decode_array(text, elem_kind, shape.ndim())?;
        let mut buf = String::new();
        encode_array_literal_shaped(
            &mut buf,
            elem_kind,
            &array,
            Some(&shape),
            codec.config().array_bounds,
            cast,
        )?;
        buf
    } else {
        let ty: SqlType = kind.parse()?;
        let value = match value {
            Some(text) => PgValue::from_text(ty.kind(), text)?,
            None => PgValue::Null,
        };
        let mut buf = String::new();
        encode_typed_literal(&mut buf, &ty, &value, cast)?;
        buf
    };

    match format {
        OutputFormat::Text => println!("{}", literal),
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "type": kind.trim(), "literal": literal })
        ),
    }
    Ok(())
}

fn array_command(
    codec: &Codec,
    kind: &str,
    text: &str,
    dims: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let elem_kind: SqlTypeKind = kind.parse()?;
    let dims = match dims {
        Some(n) => n,
        None => infer_shape(text)?.ndim(),
    };
    let (array, shape) = codec.decode_array(text, elem_kind, dims)?;
    let items = PgValue::Array(array).to_json();

    match format {
        OutputFormat::Text => {
            println!("{} {}", "Shape:".green().bold(), describe_shape(&shape));
            println!("{} {}", "Items:".green().bold(), items);
        }
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "bounds": shape.to_string(),
                "lengths": shape.lengths(),
                "items": items,
            })
        ),
    }
    Ok(())
}

fn record_command(codec: &Codec, text: &str, columns: &[String], format: OutputFormat) -> Result<()> {
    let record_type = if columns.is_empty() {
        RecordType::Unlimited
    } else {
        RecordType::Columns(
            columns
                .iter()
                .map(|c| c.parse::<SqlTypeKind>())
                .collect::<CodecResult<Vec<_>>>()?,
        )
    };
    let values = codec.decode_record(text, &record_type)?;

    match format {
        OutputFormat::Text => {
            println!("{} {}", "Columns:".green().bold(), values.len());
            for (i, value) in values.iter().enumerate() {
                let shown = match value {
                    PgValue::Null => "NULL".dimmed().to_string(),
                    other => other.to_json().to_string(),
                };
                println!("  {} = {}", format!("${}", i + 1).cyan(), shown);
            }
        }
        OutputFormat::Json => println!(
            "{}",
            serde_json::Value::Array(values.iter().map(PgValue::to_json).collect())
        ),
    }
    Ok(())
}

fn bits_command(codec: &Codec, text: &str, format: OutputFormat) -> Result<()> {
    let bits = codec.decode_bits(text)?;
    let mut literal = String::new();
    encode_bits(&mut literal, &bits);

    match format {
        OutputFormat::Text => {
            println!("{}", literal);
            if !bits.is_empty() {
                println!("{} {} bit(s)", "Length:".dimmed(), bits.len());
            }
        }
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "bits": bits.to_string(), "length": bits.len(), "literal": literal })
        ),
    }
    Ok(())
}

fn shape_command(text: &str, format: OutputFormat) -> Result<()> {
    let shape = infer_shape(text)?;
    match format {
        OutputFormat::Text => println!("{}", describe_shape(&shape)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "bounds": shape.to_string(),
                "lengths": shape.lengths(),
                "default_bounds": shape.is_default_bounds(),
            })
        ),
    }
    Ok(())
}

fn decode_command(codec: &Codec, oid: u32, text: &str, format: OutputFormat) -> Result<()> {
    let value = codec
        .decode_by_oid(text, oid)
        .with_context(|| format!("failed to decode value of type oid {}", oid))?;

    match format {
        OutputFormat::Text => {
            println!("{} {}", "Type:".green().bold(), value.type_label());
            println!("{} {}", "Value:".green().bold(), value.to_json());
        }
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "oid": oid, "type": value.type_label(), "value": value.to_json() })
        ),
    }
    Ok(())
}

/// `2x3 [1:2][1:3]`
fn describe_shape(shape: &ArrayShape) -> String {
    let lengths: Vec<String> = shape.lengths().iter().map(|n| n.to_string()).collect();
    format!("{} {}", lengths.join("x").yellow(), shape.to_string().dimmed())
}
