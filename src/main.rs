use clap::{Parser, Subcommand};
use log::{info, warn};
use procurement_extractor::processor::{INVOICE_DOCUMENT_NAME, TICKET_DOCUMENT_NAME};
use procurement_extractor::samples::{
    placeholder_pdf, sample_master_workbook, SAMPLE_INVOICE_TEXT, SAMPLE_TICKET_TEXT,
};
use procurement_extractor::{
    build_prompt, ExtractionRequest, ExtractionResult, InvoiceProcessor, MasterData,
    ProcessorConfig,
};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing_subscriber::{fmt, EnvFilter};

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];
const SAMPLE_MASTER_DATA_NAME: &str = "master_data.xlsx";

/// Extract purchase-order data from an invoice and its approval ticket
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an extraction on the documents in the data directory
    Run {
        /// Directory holding invoice.pdf, jira.pdf and the master data workbooks
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Also write the JSON and CSV results into this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Do not create placeholder files when inputs are missing
        #[arg(long)]
        no_samples: bool,
    },

    /// Look up a value in a master data workbook
    Lookup {
        /// Workbook to load
        #[arg(short, long)]
        workbook: PathBuf,

        /// Table key (workbook stem, or stem_sheet for multi-sheet workbooks)
        #[arg(short, long)]
        table: String,

        #[arg(long)]
        lookup_column: String,

        #[arg(long)]
        value: String,

        #[arg(long)]
        return_column: String,
    },

    /// Print the extraction prompt built from the given workbooks
    Prompt {
        /// Workbooks to include as master data
        #[arg(required = true)]
        workbooks: Vec<PathBuf>,
    },
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SPREADSHEET_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn read_workbooks(paths: &[PathBuf]) -> Result<BTreeMap<String, Vec<u8>>, Box<dyn Error>> {
    let mut workbooks = BTreeMap::new();
    for path in paths {
        workbooks.insert(file_name(path), fs::read(path).await?);
    }
    Ok(workbooks)
}

async fn spreadsheets_in(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_spreadsheet(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Creates placeholder documents and a sample vendor workbook for a first run.
async fn create_sample_files(data_dir: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(data_dir).await?;

    let samples = [
        (INVOICE_DOCUMENT_NAME, SAMPLE_INVOICE_TEXT),
        (TICKET_DOCUMENT_NAME, SAMPLE_TICKET_TEXT),
    ];
    for (name, text) in samples {
        let path = data_dir.join(name);
        if !fs::try_exists(&path).await? {
            info!("Creating placeholder {}", path.display());
            fs::write(&path, placeholder_pdf(text)).await?;
        }
    }

    if spreadsheets_in(data_dir).await?.is_empty() {
        let path = data_dir.join(SAMPLE_MASTER_DATA_NAME);
        info!("Creating sample master data workbook {}", path.display());
        fs::write(&path, sample_master_workbook()?).await?;
    }

    Ok(())
}

async fn write_outputs(
    output_dir: &Path,
    result: &ExtractionResult,
) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(output_dir).await?;
    let stamp = chrono::Local::now().format("%Y%m%dT%H%M%S");

    let json_path = output_dir.join(format!("extraction_{}.json", stamp));
    fs::write(&json_path, serde_json::to_string_pretty(result)?).await?;
    info!("Wrote {}", json_path.display());

    if let ExtractionResult::Success(output) = result {
        let csv_path = output_dir.join(format!("extraction_{}.csv", stamp));
        fs::write(&csv_path, &output.csv_data).await?;
        info!("Wrote {}", csv_path.display());
    }

    Ok(())
}

async fn run(
    data_dir: &Path,
    output_dir: Option<&Path>,
    no_samples: bool,
) -> Result<bool, Box<dyn Error>> {
    let config = ProcessorConfig::from_env()?;

    if !no_samples {
        create_sample_files(data_dir).await?;
    }

    info!("Loading and encoding documents from {}", data_dir.display());
    let invoice = fs::read(data_dir.join(INVOICE_DOCUMENT_NAME)).await?;
    let ticket = fs::read(data_dir.join(TICKET_DOCUMENT_NAME)).await?;
    let workbooks = read_workbooks(&spreadsheets_in(data_dir).await?).await?;
    if workbooks.is_empty() {
        warn!("No master data workbooks found in {}", data_dir.display());
    }

    let request = ExtractionRequest::from_bytes(&invoice, &ticket, &workbooks);
    let processor = InvoiceProcessor::from_config(&config);

    info!("Running extraction with model {}", config.model);
    let result = processor.query(&request).await;

    println!("\n{} RESULTS {}", "=".repeat(20), "=".repeat(20));
    match &result {
        ExtractionResult::Success(output) => {
            println!("\n--- Final JSON Data ---");
            println!("{}", serde_json::to_string_pretty(&output.json_data)?);
            println!("\n--- Final CSV Data ---");
            println!("{}", output.csv_data);
        }
        ExtractionResult::Failure(failure) => {
            println!("An error occurred during processing: {}", failure.error);
            if let Some(raw) = &failure.raw_response {
                println!("Raw Response: {}", raw);
            }
        }
    }
    println!("{}", "=".repeat(49));

    if let Some(dir) = output_dir {
        write_outputs(dir, &result).await?;
    }

    Ok(result.is_success())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    setup_logging();

    let args = Args::parse();

    match args.command {
        Command::Run {
            data_dir,
            output_dir,
            no_samples,
        } => {
            if !run(&data_dir, output_dir.as_deref(), no_samples).await? {
                std::process::exit(1);
            }
        }
        Command::Lookup {
            workbook,
            table,
            lookup_column,
            value,
            return_column,
        } => {
            let master_data = MasterData::load(&read_workbooks(&[workbook]).await?);
            match master_data.lookup(&table, &lookup_column, &value, &return_column) {
                Ok(result) => println!("{}", result),
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            }
        }
        Command::Prompt { workbooks } => {
            let master_data = MasterData::load_required(&read_workbooks(&workbooks).await?)?;
            println!("{}", build_prompt(&master_data));
        }
    }

    Ok(())
}
