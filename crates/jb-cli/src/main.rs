//! Jamabandi Area CLI
//!
//! Command-line tool for converting land records into Kila/Kanal/Marla/Sarshai totals.

use clap::{Parser, Subcommand, ValueEnum};
use jb_core::{
    convert_table, export_csv, parse_file, parse_str, run_batch, scan_directory, BatchFile,
    ColumnNames, Conversion, Delimiter, Report, Table, UnitSystem,
};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jb-cli")]
#[command(about = "Jamabandi Land Area Calculator", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a record table and print its totals
    Convert {
        /// Path to the record file (reads stdin when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[command(flatten)]
        input: InputArgs,

        /// Write the converted table to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a JSON report of the totals to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Output format for the summary
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Maximum number of rows to display
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Parse and display a record file without converting it
    Parse {
        /// Path to the record file
        #[arg(short, long)]
        file: PathBuf,

        /// Field separator (tab, comma, semicolon); detected when omitted
        #[arg(short, long)]
        delimiter: Option<Delimiter>,
    },

    /// Convert a Kanal/Marla pair into Sarshai
    ToSarshai {
        #[arg(long, allow_hyphen_values = true)]
        kanal: i64,

        #[arg(long, allow_hyphen_values = true)]
        marla: i64,
    },

    /// Decompose a Sarshai count into Kila, Kanal, Marla and Sarshai
    Decompose {
        /// Total in Sarshai
        #[arg(allow_hyphen_values = true)]
        sarshai: i64,
    },

    /// Scan directories for record files
    Scan {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,
    },

    /// Run a batch conversion job
    Batch {
        /// Path to batch file (JSON)
        #[arg(short, long)]
        batch: PathBuf,

        /// Output format for the summary
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create a batch file template
    CreateBatch {
        /// Output path for the batch file
        #[arg(short, long)]
        output: PathBuf,

        /// Root directories to include
        #[arg(short, long)]
        root: Vec<PathBuf>,

        /// Output directory for converted files
        #[arg(long)]
        export_dir: PathBuf,
    },
}

/// Options describing how to read a record table
#[derive(clap::Args)]
struct InputArgs {
    /// Field separator (tab, comma, semicolon); detected when omitted
    #[arg(short, long)]
    delimiter: Option<Delimiter>,

    /// Name of the Kanal column
    #[arg(long, default_value = "Kanal")]
    kanal_column: String,

    /// Name of the Marla column
    #[arg(long, default_value = "Marla")]
    marla_column: String,
}

impl InputArgs {
    fn column_names(&self) -> ColumnNames {
        ColumnNames {
            kanal: self.kanal_column.clone(),
            marla: self.marla_column.clone(),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(command: Commands) -> jb_core::Result<()> {
    let units = UnitSystem::JAMABANDI;

    match command {
        Commands::Convert {
            file,
            input,
            output,
            report,
            format,
            limit,
        } => cmd_convert(
            &units,
            file.as_deref(),
            &input,
            output.as_deref(),
            report.as_deref(),
            format,
            limit,
        ),
        Commands::Parse { file, delimiter } => cmd_parse(&file, delimiter),
        Commands::ToSarshai { kanal, marla } => cmd_to_sarshai(&units, kanal, marla),
        Commands::Decompose { sarshai } => cmd_decompose(&units, sarshai),
        Commands::Scan { root } => cmd_scan(&root),
        Commands::Batch { batch, format } => cmd_batch(&units, &batch, format),
        Commands::CreateBatch {
            output,
            root,
            export_dir,
        } => cmd_create_batch(&output, &root, &export_dir),
    }
}

fn read_table(file: Option<&Path>, delimiter: Option<Delimiter>) -> jb_core::Result<Table> {
    match file {
        Some(path) => parse_file(path, delimiter),
        None => {
            let mut content = String::new();
            io::stdin().read_to_string(&mut content)?;
            parse_str(&content, "<stdin>", delimiter)
        }
    }
}

fn cmd_convert(
    units: &UnitSystem,
    file: Option<&Path>,
    input: &InputArgs,
    output: Option<&Path>,
    report_path: Option<&Path>,
    format: OutputFormat,
    limit: Option<usize>,
) -> jb_core::Result<()> {
    let table = read_table(file, input.delimiter)?;
    let conversion = convert_table(&table, units, &input.column_names())?;
    let report = Report::from_conversion(&conversion);

    match format {
        OutputFormat::Text => {
            print_table(&conversion.table, limit);
            println!();
            print_summary(&conversion);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    if let Some(path) = output {
        export_csv(&conversion.table, path)?;
        eprintln!("Exported {} rows to {}", conversion.row_count(), path.display());
    }

    if let Some(path) = report_path {
        report.save(path)?;
        eprintln!("Saved report to {}", path.display());
    }

    Ok(())
}

fn print_table(table: &Table, limit: Option<usize>) {
    let header: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    println!("{}", header.join("\t"));
    println!("{}", "-".repeat(header.len() * 12));

    let row_limit = limit.unwrap_or(table.row_count());
    for row in table.rows.iter().take(row_limit) {
        let values: Vec<String> = row.cells.iter().map(|c| c.to_string_value()).collect();
        println!("{}", values.join("\t"));
    }

    if table.row_count() > row_limit {
        println!("... ({} more rows)", table.row_count() - row_limit);
    }
}

fn print_summary(conversion: &Conversion) {
    println!("Raw Totals");
    println!("  Total Kanal: {}", conversion.raw.kanal);
    println!("  Total Marla: {}", conversion.raw.marla);
    println!();
    println!("Converted Totals");
    println!("  Kila:    {}", conversion.area.kila);
    println!("  Kanal:   {}", conversion.area.kanal);
    println!("  Marla:   {}", conversion.area.marla);
    println!("  Sarshai: {}", conversion.area.sarshai);
    println!();
    println!("Total Area: {}", conversion.area);

    if conversion.coerced_cells > 0 {
        println!("Note: {} non-numeric area cell(s) counted as 0", conversion.coerced_cells);
    }
    if conversion.rounded_rows > 0 {
        println!("Note: {} row(s) rounded to a whole Sarshai", conversion.rounded_rows);
    }
}

fn cmd_parse(file: &Path, delimiter: Option<Delimiter>) -> jb_core::Result<()> {
    let table = parse_file(file, delimiter)?;

    println!("File: {}", file.display());
    println!("Columns: {}", table.column_count());
    println!("Rows: {}", table.row_count());
    println!();

    print_table(&table, Some(10));

    Ok(())
}

fn cmd_to_sarshai(units: &UnitSystem, kanal: i64, marla: i64) -> jb_core::Result<()> {
    let sarshai = units
        .checked_to_base_units(kanal, marla)
        .ok_or(jb_core::Error::Overflow { row: 1 })?;

    println!("{} Kanal, {} Marla = {} Sarshai", kanal, marla, sarshai);
    println!("= {}", units.from_base_units(sarshai));

    Ok(())
}

fn cmd_decompose(units: &UnitSystem, sarshai: i64) -> jb_core::Result<()> {
    println!("{} Sarshai = {}", sarshai, units.from_base_units(sarshai));
    Ok(())
}

fn cmd_scan(roots: &[PathBuf]) -> jb_core::Result<()> {
    let result = scan_directory(roots)?;

    println!("Scanned {} root(s):", result.roots.len());
    for root in &result.roots {
        println!("  {}", root.display());
    }
    println!();
    println!("Found {} record file(s)", result.file_count());
    for file in &result.files {
        println!("  {}", file.path.display());
    }

    Ok(())
}

fn cmd_batch(units: &UnitSystem, batch_path: &Path, format: OutputFormat) -> jb_core::Result<()> {
    let batch = BatchFile::load(batch_path)?;
    let result = run_batch(&batch, units)?;

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Roots: {:?}", batch.roots);
    println!("Output: {}", batch.output_dir.display());
    println!();

    for file in &result.converted {
        println!(
            "  {} ({} rows): {}",
            file.source.display(),
            file.rows,
            file.area
        );
    }

    println!();
    println!("Batch complete:");
    println!("  {} file(s) converted", result.converted.len());
    println!("  Combined total: {} Sarshai", result.total_sarshai);
    println!("  Combined area: {}", result.area);

    if !result.errors.is_empty() {
        println!("\nErrors ({}):", result.errors.len());
        for (path, err) in &result.errors {
            println!("  {}: {}", path.display(), err);
        }
    }

    Ok(())
}

fn cmd_create_batch(output: &Path, roots: &[PathBuf], export_dir: &Path) -> jb_core::Result<()> {
    let batch = BatchFile {
        roots: if roots.is_empty() {
            vec![PathBuf::from("records")]
        } else {
            roots.to_vec()
        },
        output_dir: export_dir.to_path_buf(),
        columns: ColumnNames::default(),
        delimiter: None,
    };

    batch.save(output)?;
    println!("Created batch file: {}", output.display());
    println!();
    println!("Edit the file to configure your batch, then run:");
    println!("  jb-cli batch --batch {}", output.display());

    Ok(())
}
