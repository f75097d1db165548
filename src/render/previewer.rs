//! Single-flight preview service.
//!
//! At most one render per locator is outstanding; concurrent requests await the
//! same shared future. Each render is tagged with an epoch so that an
//! invalidation issued while it runs prevents its result from being cached.
//! No `RefCell` borrow is ever held across an `.await`.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use futures_util::future::{FutureExt, LocalBoxFuture, Shared};

use super::{clock_now, PreviewCache, Renderer};
use crate::cell_ref::CellAddress;
use crate::error::RenderError;
use crate::links::LinkTable;
use crate::types::{ContentLocator, RenderedPreview};

type RenderOutcome = Result<Rc<RenderedPreview>, RenderError>;
type SharedRender = Shared<LocalBoxFuture<'static, RenderOutcome>>;

struct InFlight {
    epoch: u64,
    render: SharedRender,
}

struct PreviewState {
    cache: PreviewCache,
    in_flight: HashMap<ContentLocator, InFlight>,
    next_epoch: u64,
    /// Pending foreground requests per locator.
    foreground: HashMap<ContentLocator, usize>,
    queue: VecDeque<ContentLocator>,
    preloading: bool,
}

/// Outcome of one [`Previewer::drain_preload`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadReport {
    pub loaded: usize,
    pub failed: usize,
}

/// Cheaply clonable handle to a session's preview cache and render pipeline.
#[derive(Clone)]
pub struct Previewer {
    state: Rc<RefCell<PreviewState>>,
    renderer: Rc<dyn Renderer>,
    preload_delay: Duration,
}

impl std::fmt::Debug for Previewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Previewer")
            .field("cached", &state.cache.len())
            .field("in_flight", &state.in_flight.len())
            .field("queued", &state.queue.len())
            .finish_non_exhaustive()
    }
}

impl Previewer {
    #[must_use]
    pub fn new(renderer: Rc<dyn Renderer>, cache: PreviewCache, preload_delay: Duration) -> Self {
        Self {
            state: Rc::new(RefCell::new(PreviewState {
                cache,
                in_flight: HashMap::new(),
                next_epoch: 0,
                foreground: HashMap::new(),
                queue: VecDeque::new(),
                preloading: false,
            })),
            renderer,
            preload_delay,
        }
    }

    /// Foreground preview: cache hit, else join or start the render.
    pub async fn preview(&self, locator: &ContentLocator) -> RenderOutcome {
        let _guard = ForegroundGuard::new(&self.state, locator);
        self.fetch(locator).await
    }

    /// Drop any cached or in-flight result, then render from scratch.
    pub async fn retry(&self, locator: &ContentLocator) -> RenderOutcome {
        self.invalidate(locator);
        self.preview(locator).await
    }

    /// Remove the cached preview and detach any in-flight render so its
    /// result is never cached.
    pub fn invalidate(&self, locator: &ContentLocator) {
        let mut state = self.state.borrow_mut();
        state.cache.invalidate(locator);
        state.in_flight.remove(locator);
    }

    /// Queue a background render. Returns `false` when the locator is already
    /// cached, queued or rendering.
    pub fn enqueue_preload(&self, locator: &ContentLocator) -> bool {
        let mut state = self.state.borrow_mut();
        if state.cache.contains(locator, clock_now())
            || state.in_flight.contains_key(locator)
            || state.queue.contains(locator)
        {
            return false;
        }
        tracing::debug!(?locator, queued = state.queue.len() + 1, "queued preload");
        state.queue.push_back(locator.clone());
        true
    }

    /// Queue preloads for linked cells in the 3×3 neighbourhood of `addr`.
    pub fn preload_neighbours(&self, addr: CellAddress, links: &LinkTable) -> usize {
        addr.neighbours()
            .filter_map(|n| links.get(n))
            .filter(|link| self.enqueue_preload(&link.locator))
            .count()
    }

    /// Work through the preload queue one locator at a time.
    ///
    /// Waits while a foreground request for a different locator is pending and
    /// pauses `preload_delay` between items. A second concurrent call returns
    /// immediately.
    pub async fn drain_preload(&self) -> PreloadReport {
        let mut report = PreloadReport::default();
        let Some(_guard) = PreloadGuard::acquire(&self.state) else {
            return report;
        };

        while let Some(locator) = self.next_preload().await {
            match self.fetch(&locator).await {
                Ok(_) => report.loaded += 1,
                Err(e) => {
                    tracing::warn!(?locator, error = %e, "preload failed");
                    report.failed += 1;
                }
            }
            if !self.state.borrow().queue.is_empty() {
                tokio::time::sleep(self.preload_delay).await;
            }
        }
        if report.loaded + report.failed > 0 {
            tracing::debug!(loaded = report.loaded, failed = report.failed, "preload queue drained");
        }
        report
    }

    /// Remove expired cache entries.
    pub fn sweep(&self, now: std::time::Instant) -> usize {
        self.state.borrow_mut().cache.sweep(now)
    }

    /// Drop every cached preview, queued preload and in-flight render.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.cache.clear();
        state.in_flight.clear();
        state.queue.clear();
    }

    #[must_use]
    pub fn is_cached(&self, locator: &ContentLocator) -> bool {
        self.state.borrow().cache.contains(locator, clock_now())
    }

    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.state.borrow().cache.len()
    }

    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.state.borrow().queue.len()
    }

    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.state.borrow().in_flight.len()
    }

    async fn fetch(&self, locator: &ContentLocator) -> RenderOutcome {
        let (epoch, render) = {
            let mut state = self.state.borrow_mut();
            if let Some(hit) = state.cache.lookup(locator, clock_now()) {
                return Ok(hit);
            }
            let joined = state
                .in_flight
                .get(locator)
                .map(|flight| (flight.epoch, flight.render.clone()));
            match joined {
                Some(joined) => joined,
                None => {
                    let epoch = state.next_epoch;
                    state.next_epoch += 1;
                    let pending = self.renderer.render(locator);
                    let render = async move { pending.await.map(Rc::new) }
                        .boxed_local()
                        .shared();
                    state.in_flight.insert(
                        locator.clone(),
                        InFlight {
                            epoch,
                            render: render.clone(),
                        },
                    );
                    (epoch, render)
                }
            }
        };

        let outcome = render.await;
        self.settle(locator, epoch, &outcome);
        outcome
    }

    /// Retire the in-flight render and cache its success, unless it was
    /// invalidated or superseded meanwhile.
    fn settle(&self, locator: &ContentLocator, epoch: u64, outcome: &RenderOutcome) {
        let mut state = self.state.borrow_mut();
        if state.in_flight.get(locator).map(|f| f.epoch) != Some(epoch) {
            return;
        }
        state.in_flight.remove(locator);
        match outcome {
            Ok(preview) => state
                .cache
                .insert(locator.clone(), Rc::clone(preview), clock_now()),
            Err(e) => tracing::debug!(?locator, error = %e, "render failed; not cached"),
        }
    }

    async fn next_preload(&self) -> Option<ContentLocator> {
        loop {
            let blocked = {
                let state = self.state.borrow();
                let front = state.queue.front()?;
                state.foreground.keys().any(|k| k != front)
            };
            if !blocked {
                return self.state.borrow_mut().queue.pop_front();
            }
            tokio::time::sleep(self.preload_delay.max(Duration::from_millis(1))).await;
        }
    }
}

struct ForegroundGuard {
    state: Rc<RefCell<PreviewState>>,
    locator: ContentLocator,
}

impl ForegroundGuard {
    fn new(state: &Rc<RefCell<PreviewState>>, locator: &ContentLocator) -> Self {
        *state
            .borrow_mut()
            .foreground
            .entry(locator.clone())
            .or_insert(0) += 1;
        Self {
            state: Rc::clone(state),
            locator: locator.clone(),
        }
    }
}

impl Drop for ForegroundGuard {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        if let Some(count) = state.foreground.get_mut(&self.locator) {
            *count -= 1;
            if *count == 0 {
                state.foreground.remove(&self.locator);
            }
        }
    }
}

struct PreloadGuard {
    state: Rc<RefCell<PreviewState>>,
}

impl PreloadGuard {
    fn acquire(state: &Rc<RefCell<PreviewState>>) -> Option<Self> {
        let mut s = state.borrow_mut();
        if s.preloading {
            return None;
        }
        s.preloading = true;
        Some(Self {
            state: Rc::clone(state),
        })
    }
}

impl Drop for PreloadGuard {
    fn drop(&mut self) {
        self.state.borrow_mut().preloading = false;
    }
}
