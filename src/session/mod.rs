//! Evidence session: one spreadsheet, its link table and its preview pipeline.
//!
//! The session is the only owner of evidence state. Hosts drive it either by
//! calling [`EvidenceSession::tick`] from their own loop or by running
//! [`run_session`] on a single-threaded runtime.

pub mod schedule;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::cell_ref::CellAddress;
use crate::config::EvidenceConfig;
use crate::error::Result;
use crate::export::{export_project, ExportOptions, ExportedArchive};
use crate::import::{read_project, ImportReport};
use crate::ingest::{ingest, Upload};
use crate::links::{LinkDiff, LinkTable};
use crate::reconcile::reconcile;
use crate::render::{clock_now, PreviewCache, Previewer, Renderer};
use crate::sheet::Spreadsheet;
use crate::types::{ContentLocator, EvidenceLink};

use schedule::PollSchedule;

/// What one [`EvidenceSession::tick`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub selection_changed: bool,
    /// Present when a reconciliation ran.
    pub diff: Option<LinkDiff>,
    /// Cache entries removed by an age sweep.
    pub swept: usize,
}

pub struct EvidenceSession<S: Spreadsheet> {
    sheet: S,
    links: LinkTable,
    previewer: Previewer,
    schedule: PollSchedule,
    config: EvidenceConfig,
    selected: Option<CellAddress>,
}

impl<S: Spreadsheet> std::fmt::Debug for EvidenceSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceSession")
            .field("links", &self.links.len())
            .field("selected", &self.selected)
            .field("previewer", &self.previewer)
            .finish_non_exhaustive()
    }
}

impl<S: Spreadsheet> EvidenceSession<S> {
    #[must_use]
    pub fn new(sheet: S, renderer: Rc<dyn Renderer>, config: EvidenceConfig) -> Self {
        let cache = PreviewCache::new(config.max_cache_entries, config.max_cache_age());
        let previewer = Previewer::new(renderer, cache, config.preload_delay());
        Self {
            sheet,
            links: LinkTable::new(),
            previewer,
            schedule: PollSchedule::new(&config),
            config,
            selected: None,
        }
    }

    pub fn sheet(&self) -> &S {
        &self.sheet
    }

    /// Direct access to the spreadsheet, as a user editing it would have.
    pub fn sheet_mut(&mut self) -> &mut S {
        &mut self.sheet
    }

    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    pub fn previewer(&self) -> &Previewer {
        &self.previewer
    }

    pub fn config(&self) -> &EvidenceConfig {
        &self.config
    }

    pub fn selected(&self) -> Option<CellAddress> {
        self.selected
    }

    /// Link on the selected cell.
    pub fn selected_link(&self) -> Option<&EvidenceLink> {
        self.links.get(self.selected?)
    }

    pub fn into_sheet(self) -> S {
        self.sheet
    }

    /// Validate an upload and attach it to `addr`.
    ///
    /// A rejected upload leaves the session untouched.
    pub fn attach_file(&mut self, addr: CellAddress, upload: &Upload) -> Result<EvidenceLink> {
        let locator = ingest(upload, self.config.max_upload_bytes)?;
        Ok(self.attach_locator(addr, locator, upload.file_name.as_str()))
    }

    /// Attach already-stored content to `addr` and write its marker text.
    pub fn attach_locator(
        &mut self,
        addr: CellAddress,
        locator: ContentLocator,
        label: impl Into<String>,
    ) -> EvidenceLink {
        let link = EvidenceLink::new(locator, label);
        self.sheet.set_cell_text(addr, &link.marker_text());
        self.links.set(addr, link.clone());
        tracing::info!(cell = %addr, label = %link.label, "attached evidence");
        self.previewer.preload_neighbours(addr, &self.links);
        link
    }

    /// Remove the link on `addr`. The cell text is left as is.
    pub fn detach(&mut self, addr: CellAddress) -> Option<EvidenceLink> {
        let removed = self.links.remove(addr);
        if removed.is_some() {
            tracing::info!(cell = %addr, "detached evidence");
        }
        removed
    }

    /// Record a selection and return the link on it, if any.
    ///
    /// Selecting a linked cell queues preloads for its linked neighbours.
    pub fn select_cell(&mut self, addr: CellAddress) -> Option<&EvidenceLink> {
        self.selected = Some(addr);
        if self.links.contains(addr) {
            self.previewer.preload_neighbours(addr, &self.links);
        }
        self.links.get(addr)
    }

    /// Follow the spreadsheet's current selection. Returns whether it changed.
    pub fn detect_selection(&mut self) -> bool {
        let current = self.sheet.current_selection();
        if current == self.selected {
            return false;
        }
        match current {
            Some(addr) => {
                self.select_cell(addr);
            }
            None => self.selected = None,
        }
        true
    }

    /// Reconcile the link table against the sheet.
    ///
    /// When the selected cell gains or loses a link, it is selected again so
    /// the host sees the new state.
    pub fn reconcile(&mut self) -> LinkDiff {
        let diff = reconcile(&self.sheet, &mut self.links, self.config.scan_window);
        if let Some(sel) = self.selected {
            let touched = diff.moves.iter().any(|m| m.to == sel || m.from == sel)
                || diff.removals.contains(&sel);
            if touched {
                self.select_cell(sel);
            }
        }
        diff
    }

    /// Note keyboard, pointer or selection input. Brings the next
    /// reconciliation forward to one debounce delay from `now`.
    pub fn note_input_event(&mut self, now: Instant) {
        self.schedule.note_event(now);
    }

    /// Run whatever periodic work is due at `now`.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let due = self.schedule.due(now);
        let visible = self.sheet.is_visible();
        let mut report = TickReport::default();

        if due.poll && visible {
            report.selection_changed = self.detect_selection();
        }
        if due.reconcile(visible) {
            report.diff = Some(self.reconcile());
        }
        if due.sweep {
            report.swept = self.previewer.sweep(now);
        }
        report
    }

    /// Drop links, cached previews, queued preloads and the selection.
    pub fn reset(&mut self) {
        self.links.clear();
        self.previewer.clear();
        self.selected = None;
        self.schedule.reset();
        tracing::debug!("session reset");
    }

    /// Build a project archive stamped with `created_at`.
    pub fn export(&self, created_at: DateTime<Utc>) -> Result<ExportedArchive> {
        let options = ExportOptions::new(
            &self.config.project_prefix,
            created_at,
            self.config.export_window,
        );
        Ok(export_project(&self.sheet, &self.links, &options)?)
    }

    /// Import a project archive, replacing the link table.
    ///
    /// The archive is fully parsed before anything changes, so a failed import
    /// leaves the session as it was.
    pub fn import(&mut self, bytes: &[u8]) -> Result<ImportReport> {
        let plan = read_project(bytes)?;
        let report = plan.apply(&mut self.sheet, &mut self.links);
        if let Some(sel) = self.selected {
            self.select_cell(sel);
        }
        Ok(report)
    }
}

/// Drive a session until `shutdown` turns `true` or its sender is dropped.
///
/// Ticks the session every debounce interval and works the preload queue in
/// between. Must run on a single-threaded runtime or a `LocalSet`.
pub async fn run_session<S: Spreadsheet>(
    session: Rc<RefCell<EvidenceSession<S>>>,
    shutdown: watch::Receiver<bool>,
) {
    let (period, previewer) = {
        let s = session.borrow();
        (
            s.config().event_debounce().max(Duration::from_millis(1)),
            s.previewer().clone(),
        )
    };

    let ticker = {
        let mut shutdown = shutdown.clone();
        let session = Rc::clone(&session);
        async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let report = session.borrow_mut().tick(clock_now());
                        if let Some(ref diff) = report.diff {
                            if !diff.is_empty() {
                                tracing::debug!(moves = diff.moves.len(), removals = diff.removals.len(), "tick reconciled");
                            }
                        }
                    }
                    () = stopped(&mut shutdown) => break,
                }
            }
        }
    };

    let preloader = {
        let mut shutdown = shutdown;
        async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = async {
                        interval.tick().await;
                        previewer.drain_preload().await
                    } => {}
                    () = stopped(&mut shutdown) => break,
                }
            }
        }
    };

    tokio::join!(ticker, preloader);
    tracing::debug!("session driver stopped");
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
