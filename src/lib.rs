//! tickntie - evidence attachments for spreadsheet cells
//!
//! Attaches images and PDFs to individual cells of a spreadsheet and keeps
//! them attached while the sheet is edited:
//! - A link table keyed by cell address, reconciled against cell text
//! - A bounded, age-limited preview cache with single-flight rendering
//! - Portable project archives (`evidence/`, `workbook.xlsx`, `README.txt`)
//!
//! # Usage
//!
//! ```no_run
//! use std::rc::Rc;
//! use tickntie::{CellAddress, EvidenceConfig, EvidenceSession, HeaderRenderer, MemorySheet, Upload};
//!
//! # fn main() -> tickntie::Result<()> {
//! let mut session = EvidenceSession::new(MemorySheet::new(), Rc::new(HeaderRenderer), EvidenceConfig::default());
//! let upload = Upload::from_file_name("receipt.png", std::fs::read("receipt.png").unwrap_or_default());
//! session.attach_file(CellAddress::new(0, 0), &upload)?;
//! let archive = session.export(chrono::Utc::now())?;
//! std::fs::write(&archive.file_name, &archive.bytes).ok();
//! # Ok(())
//! # }
//! ```

// Core model
pub mod cell_ref;
pub mod config;
pub mod error;
pub mod links;
pub mod sheet;
pub mod types;

// Evidence lifecycle
pub mod ingest;
pub mod reconcile;
pub mod render;
pub mod session;

// Project archives
pub mod export;
pub mod hyperlinks;
pub mod import;
pub mod parser;
pub mod xml_helpers;

pub use cell_ref::CellAddress;
pub use config::{EvidenceConfig, Window};
pub use error::{ArchiveError, EvidenceError, RenderError, Result, ValidationError};
pub use export::{export_project, ExportOptions, ExportedArchive};
pub use import::{import_project, read_project, ImportPlan, ImportReport, SkippedLink};
pub use ingest::Upload;
pub use links::{LinkDiff, LinkMove, LinkTable};
pub use render::{HeaderRenderer, PreviewCache, Previewer, Renderer};
pub use session::{run_session, EvidenceSession, TickReport};
pub use sheet::{MemorySheet, Spreadsheet};
pub use types::*;
