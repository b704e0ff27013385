use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use sheetframe_io::{read_excel_with_format, sheet_names, ReadOptions, Table};

#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(about = "Decode one sheet of an XLSX/XLS workbook and print it as a table.")]
struct Args {
    /// Workbook to read.
    path: PathBuf,

    /// Sheet name (or worksheet part name such as `sheet2`). Defaults to the first sheet.
    #[arg(long)]
    sheet: Option<String>,

    /// Maximum uncompressed size of a single `.xlsx` package part.
    #[arg(long)]
    max_part_bytes: Option<u64>,

    /// List sheet names instead of decoding a sheet (`.xlsx` only).
    #[arg(long)]
    list_sheets: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    path: String,
    format: String,
    rows: usize,
    columns: usize,
    table: &'a Table,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let defaults = ReadOptions::default();
    let options = ReadOptions {
        sheet: args.sheet.clone(),
        max_part_bytes: args.max_part_bytes.unwrap_or(defaults.max_part_bytes),
    };

    if args.list_sheets {
        let names = sheet_names(&args.path, &options)
            .with_context(|| format!("list sheets of {}", args.path.display()))?;
        match args.format {
            OutputFormat::Text => {
                for name in names {
                    println!("{name}");
                }
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&names)?),
        }
        return Ok(());
    }

    let (format, table) = read_excel_with_format(&args.path, &options)
        .with_context(|| format!("read {}", args.path.display()))?;
    let (rows, columns) = table.shape();

    match args.format {
        OutputFormat::Text => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            writeln!(out, "Workbook: {}", args.path.display())?;
            writeln!(out, "  format: {format:?}")?;
            writeln!(out, "  shape: {rows} rows x {columns} columns")?;
            writeln!(out)?;
            writeln!(out, "{}", table.columns().join("\t"))?;
            for row in table.rows() {
                let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
                writeln!(out, "{}", cells.join("\t"))?;
            }
        }
        OutputFormat::Json => {
            let report = JsonReport {
                path: args.path.display().to_string(),
                format: format!("{format:?}"),
                rows,
                columns,
                table: &table,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
