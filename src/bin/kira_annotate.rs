use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_annotate::app::{AnnotateOptions, App, ProgressSink};
use kira_annotate::config::{ConfigLoader, DEFAULT_CONFIG_PATH};
use kira_annotate::error::{ErrorKind, KiraError};
use kira_annotate::input::GeneTable;
use kira_annotate::output::{JsonOutput, OutputTarget, TextOutput};

#[derive(Parser)]
#[command(name = "kira-annotate")]
#[command(about = "Annotate genes with local edge files (one wide TSV row per gene)")]
#[command(version, author)]
struct Cli {
    /// Gene symbols; appended after --genes-file rows when both are given
    #[arg(long, num_args = 1..)]
    genes: Vec<String>,

    /// Delimited file with a header holding a `gene`/`基因` column
    #[arg(long)]
    genes_file: Option<Utf8PathBuf>,

    /// 1-based gene column index in --genes-file, overrides header detection
    #[arg(long, requires = "genes_file")]
    gene_column: Option<usize>,

    /// Dataset config (YAML or JSON)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Output path, `-` for stdout
    #[arg(long, short)]
    out: Option<String>,

    /// Field separator for input and output
    #[arg(long, default_value = "\\t")]
    delimiter: String,

    /// Print the run summary as JSON on stderr
    #[arg(long)]
    json_summary: bool,

    /// More logging (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error.kind() {
        ErrorKind::Config | ErrorKind::InputFormat => 2,
        ErrorKind::Io => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let delimiter = parse_delimiter(&cli.delimiter)?;
    let resolved = ConfigLoader::resolve(Some(&cli.config))?;

    let table = match &cli.genes_file {
        Some(path) => {
            let mut table = GeneTable::from_path(path, delimiter, cli.gene_column)?;
            table.append_genes(&cli.genes);
            table
        }
        None => GeneTable::from_genes(&cli.genes)?,
    };

    let app = App::new(resolved, AnnotateOptions { delimiter });
    let target = OutputTarget::from_arg(cli.out.as_deref());
    let sink: &dyn ProgressSink = if cli.json_summary || cli.quiet {
        &JsonOutput
    } else {
        &TextOutput
    };

    let report = app.annotate(&table, &target, sink)?;

    if cli.json_summary {
        JsonOutput::print_report(&report).into_diagnostic()?;
    } else if !cli.quiet {
        TextOutput::print_report(&report).into_diagnostic()?;
    }
    Ok(())
}

fn parse_delimiter(value: &str) -> miette::Result<u8> {
    match value {
        "\\t" | "\t" | "tab" => Ok(b'\t'),
        other if other.len() == 1 && other.is_ascii() => Ok(other.as_bytes()[0]),
        other => Err(miette::Report::msg(format!(
            "delimiter must be a single ASCII character, got {other:?}"
        ))),
    }
}
