//! CLI tool for tickntie - inspects and builds evidence project archives
//!
//! Usage:
//!   tickntie_cli inspect <project.zip> [-o out.json]
//!   tickntie_cli pack <cells.csv> --evidence A1=receipt.png [-o out.zip]

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use tickntie::import::parse_csv;
use tickntie::render::header::image_dimensions;
use tickntie::{
    import_project, CellAddress, EvidenceConfig, EvidenceSession, HeaderRenderer, ImportReport,
    LinkTable, MemorySheet, Spreadsheet, Upload,
};

#[derive(Parser)]
#[command(name = "tickntie_cli")]
#[command(author, version, about = "Evidence project archive tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a project archive and print a JSON summary
    Inspect {
        /// Project archive (.zip)
        input: PathBuf,

        /// Output JSON file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a project archive from a CSV grid and evidence files
    Pack {
        /// Cell text as CSV
        cells: PathBuf,

        /// Evidence to attach, as ADDRESS=PATH (e.g. B3=scan.pdf)
        #[arg(short, long = "evidence", value_name = "ADDR=PATH")]
        evidence: Vec<String>,

        /// Session configuration JSON
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output archive (default: generated project name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { input, output } => inspect(&input, output.as_deref()),
        Commands::Pack {
            cells,
            evidence,
            config,
            output,
        } => pack(&cells, &evidence, config.as_deref(), output.as_deref()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    cells: Vec<CellSummary>,
    links: Vec<LinkSummary>,
    report: ImportReport,
}

#[derive(Serialize)]
struct CellSummary {
    address: CellAddress,
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkSummary {
    address: CellAddress,
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external: Option<String>,
}

fn inspect(input: &Path, output: Option<&Path>) -> Result<()> {
    let data = fs::read(input).with_context(|| format!("Failed to read '{}'", input.display()))?;

    let mut sheet = MemorySheet::new();
    let mut links = LinkTable::new();
    let report = import_project(&data, &mut sheet, &mut links)
        .with_context(|| format!("Failed to import '{}'", input.display()))?;

    let cells = sheet
        .iter()
        .map(|(address, text)| CellSummary {
            address,
            text: text.to_string(),
        })
        .collect();

    let links = links
        .iter()
        .map(|(address, link)| {
            let mut summary = LinkSummary {
                address,
                label: link.label.clone(),
                mime_type: None,
                size_bytes: None,
                width: None,
                height: None,
                external: None,
            };
            match link.locator.decode_inline() {
                Some(content) => {
                    let dims = image_dimensions(&content.bytes);
                    summary.width = dims.map(|(w, _)| w);
                    summary.height = dims.map(|(_, h)| h);
                    summary.size_bytes = Some(content.bytes.len());
                    summary.mime_type = Some(content.mime_type);
                }
                None => summary.external = Some(link.locator.as_str().to_string()),
            }
            summary
        })
        .collect();

    let json = serde_json::to_string_pretty(&Summary {
        cells,
        links,
        report,
    })
    .context("Failed to serialize summary")?;

    match output {
        Some(path) => {
            fs::write(path, &json).with_context(|| format!("Failed to write '{}'", path.display()))?;
            eprintln!("Written: {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn pack(
    cells_path: &Path,
    evidence: &[String],
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read '{}'", path.display()))?;
            EvidenceConfig::from_json(&json)?
        }
        None => EvidenceConfig::default(),
    };

    let csv = fs::read(cells_path)
        .with_context(|| format!("Failed to read '{}'", cells_path.display()))?;
    let mut sheet = MemorySheet::new();
    for cell in parse_csv(&csv) {
        sheet.set_cell_text(cell.address, &cell.text);
    }

    let mut session = EvidenceSession::new(sheet, Rc::new(HeaderRenderer), config);
    for spec in evidence {
        let Some((addr, path)) = spec.split_once('=') else {
            bail!("Expected ADDRESS=PATH, got '{spec}'");
        };
        let Some(addr) = CellAddress::parse(addr.trim()) else {
            bail!("Invalid cell address '{addr}'");
        };
        let path = Path::new(path.trim());
        let bytes = fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        session
            .attach_file(addr, &Upload::from_file_name(file_name, bytes))
            .map_err(|e| anyhow::anyhow!(e.user_message()))
            .with_context(|| format!("Cannot attach '{}' to {addr}", path.display()))?;
    }

    let archive = session.export(chrono::Utc::now())?;
    let target = output.map_or_else(|| PathBuf::from(&archive.file_name), Path::to_path_buf);
    fs::write(&target, &archive.bytes)
        .with_context(|| format!("Failed to write '{}'", target.display()))?;
    eprintln!(
        "Written: {} ({} evidence files, {} links)",
        target.display(),
        archive.evidence_count,
        session.links().len()
    );
    Ok(())
}
