//! CLI tool for tasklist

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use tasklist::{Config, Field, FieldSelector, ProcessRecord};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "Snapshot the process table with only the fields you ask for", long_about = None)]
#[command(version)]
struct Cli {
    /// Comma-separated fields to collect, or "all" (default from config)
    #[arg(short = 'F', long)]
    fields: Option<String>,

    /// Output format (json or text)
    #[arg(short, long)]
    format: Option<String>,

    /// Configuration file (default: ~/.config/tasklist/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sort column (pid, name, cpu, pmem)
    #[arg(short, long)]
    sort: Option<String>,

    /// Reverse the sort order
    #[arg(short, long)]
    reverse: bool,

    /// Omit the header row in text output
    #[arg(long)]
    no_header: bool,

    /// List the available field names and exit
    #[arg(long)]
    list_fields: bool,
}

#[cfg(feature = "cli")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::init();

    if cli.list_fields {
        for field in Field::ALL {
            println!("{}", field);
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let mut fields = match &cli.fields {
        Some(list) => list.parse::<FieldSelector>()?,
        None => config.selector(),
    };

    let sort_column = cli
        .sort
        .clone()
        .unwrap_or_else(|| config.output.sort_column.clone());
    let sort_field: Field = sort_column.parse()?;
    if !matches!(sort_field, Field::Pid | Field::Name | Field::Cpu | Field::Pmem) {
        return Err(format!("Cannot sort by {} (use pid, name, cpu or pmem)", sort_field).into());
    }
    // the sort key has to be collected even if it is not shown
    let shown = fields;
    fields.set(sort_field, true);

    let mut records = tasklist::snapshot(fields)?;
    sort_records(&mut records, sort_field);
    if cli.reverse == config.output.sort_ascending {
        records.reverse();
    }

    let format = cli
        .format
        .clone()
        .unwrap_or_else(|| config.output.format.clone());
    match format.as_str() {
        "json" => {
            let rows: Vec<_> = records.iter().map(|r| r.project(&shown)).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        "text" => print_table(&records, &shown, config.output.show_header && !cli.no_header),
        other => return Err(format!("Unknown output format: {} (use text or json)", other).into()),
    }

    Ok(())
}

/// Ascending order on one of the sortable columns
#[cfg(feature = "cli")]
fn sort_records(records: &mut [ProcessRecord], field: Field) {
    match field {
        Field::Name => records.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
        Field::Cpu => records.sort_by(|a, b| a.cpu.total_cmp(&b.cpu)),
        Field::Pmem => records.sort_by_key(|r| r.pmem),
        _ => records.sort_by_key(|r| r.pid),
    }
}

#[cfg(feature = "cli")]
fn column_width(field: Field) -> usize {
    match field {
        Field::Pid | Field::Ppid | Field::Threads | Field::Priority => 8,
        Field::Cpu => 7,
        Field::Owner => 16,
        Field::Name => 24,
        Field::Vmem | Field::Pmem | Field::Utime | Field::Stime => 12,
        Field::Starttime => 20,
        Field::Path | Field::Cmdline => 0,
    }
}

#[cfg(feature = "cli")]
fn cell(record: &ProcessRecord, field: Field) -> String {
    match field {
        Field::Cpu => format!("{:.1}", record.cpu),
        Field::Pmem => format!("{:.1}M", record.pmem_mb()),
        Field::Starttime => chrono::DateTime::from_timestamp_millis(record.starttime as i64)
            .filter(|_| record.starttime > 0)
            .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string()),
        _ => match record.value(field) {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        },
    }
}

#[cfg(feature = "cli")]
fn print_table(records: &[ProcessRecord], fields: &FieldSelector, header: bool) {
    let columns: Vec<Field> = fields.fields().collect();
    let line = |cells: Vec<String>| {
        let mut out = String::new();
        for (field, text) in columns.iter().zip(cells) {
            let width = column_width(*field);
            if width == 0 {
                out.push_str(&text);
            } else {
                out.push_str(&format!("{:<width$}", text, width = width));
            }
            out.push(' ');
        }
        out.trim_end().to_string()
    };

    if header {
        println!(
            "{}",
            line(columns.iter().map(|f| f.name().to_uppercase()).collect())
        );
    }
    for record in records {
        println!("{}", line(columns.iter().map(|f| cell(record, *f)).collect()));
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features not enabled. Please compile with --features cli");
    std::process::exit(1);
}
