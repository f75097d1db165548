//! Common test utilities: renderers with controllable timing, archive
//! readers and session builders.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::cell::Cell;
use std::io::{Cursor, Read};
use std::rc::Rc;
use std::sync::Arc;

use futures_util::future::{FutureExt, LocalBoxFuture};
use tokio::sync::Semaphore;
use zip::ZipArchive;

use tickntie::{
    CellAddress, ContentLocator, EvidenceConfig, EvidenceSession, HeaderRenderer, MemorySheet,
    RenderError, RenderedPreview, Renderer, Upload,
};

// Re-export fixtures for convenience
pub use super::fixtures::*;

// ============================================================================
// Addresses and uploads
// ============================================================================

pub fn addr(a1: &str) -> CellAddress {
    CellAddress::parse(a1).unwrap_or_else(|| panic!("bad cell reference {a1}"))
}

pub fn png_upload(name: &str, width: u32, height: u32) -> Upload {
    Upload::from_file_name(name, png(width, height))
}

pub fn pdf_upload(name: &str, seed: u8) -> Upload {
    Upload::from_file_name(name, pdf(seed))
}

pub fn png_locator(width: u32, height: u32) -> ContentLocator {
    ContentLocator::inline("image/png", &png(width, height))
}

// ============================================================================
// Sessions
// ============================================================================

pub fn session() -> EvidenceSession<MemorySheet> {
    session_with(EvidenceConfig::default())
}

pub fn session_with(config: EvidenceConfig) -> EvidenceSession<MemorySheet> {
    EvidenceSession::new(MemorySheet::new(), Rc::new(HeaderRenderer), config)
}

// ============================================================================
// Renderers
// ============================================================================

/// Renders like [`HeaderRenderer`] but each render waits for a permit.
///
/// Lets a test hold renders in flight and release them at a chosen point.
#[derive(Clone)]
pub struct GatedRenderer {
    calls: Rc<Cell<usize>>,
    gate: Arc<Semaphore>,
}

impl GatedRenderer {
    pub fn new() -> Self {
        Self {
            calls: Rc::new(Cell::new(0)),
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Let `n` pending or future renders finish.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Renderer for GatedRenderer {
    fn render(&self, locator: &ContentLocator) -> LocalBoxFuture<'static, Result<RenderedPreview, RenderError>> {
        self.calls.set(self.calls.get() + 1);
        let gate = Arc::clone(&self.gate);
        let locator = locator.clone();
        async move {
            if let Ok(permit) = gate.acquire_owned().await {
                permit.forget();
            }
            HeaderRenderer.render(&locator).await
        }
        .boxed_local()
    }
}

/// Fails the first `failures` renders, then behaves like [`HeaderRenderer`].
#[derive(Clone)]
pub struct FlakyRenderer {
    calls: Rc<Cell<usize>>,
    failures: usize,
}

impl FlakyRenderer {
    pub fn new(failures: usize) -> Self {
        Self {
            calls: Rc::new(Cell::new(0)),
            failures,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Renderer for FlakyRenderer {
    fn render(&self, locator: &ContentLocator) -> LocalBoxFuture<'static, Result<RenderedPreview, RenderError>> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if call < self.failures {
            futures_util::future::ready(Err(RenderError::TimedOut)).boxed_local()
        } else {
            HeaderRenderer.render(locator)
        }
    }
}

// ============================================================================
// Archive readers
// ============================================================================

/// Entry names of a ZIP archive, sorted.
pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).expect("not a zip archive");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

pub fn read_entry(bytes: &[u8], name: &str) -> Option<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("not a zip archive");
    let mut file = archive.by_name(name).ok()?;
    let mut out = Vec::new();
    file.read_to_end(&mut out).unwrap();
    Some(out)
}

pub fn read_text_entry(bytes: &[u8], name: &str) -> Option<String> {
    read_entry(bytes, name).map(|b| String::from_utf8(b).expect("entry is not UTF-8"))
}
