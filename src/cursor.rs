use crate::api::{ApiError, PeopleApi};
use crate::media::MediaPrefetcher;
use crate::model::{Candidate, Page};
use crate::observe::{ChangeNotifier, Subscription};
use crate::runtime::TaskSpawner;
use futures::future::{self, FutureExt, LocalBoxFuture};
use log::{debug, warn};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// A page is requested once this many cards or fewer remain ahead of the cursor.
pub const LOOKAHEAD_MARGIN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStatus {
    Idle,
    Fetching,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(Page),
    /// The last page was already fetched; no request was issued.
    Empty,
    /// Another fetch is outstanding; no request was issued.
    Busy,
    /// The cursor was reset while this page was in flight.
    Discarded,
}

struct CursorState {
    deck: Vec<Candidate>,
    seen: HashSet<String>,
    warmed: HashSet<String>,
    page: u32,
    status: CursorStatus,
    generation: u64,
    /// Most recent `ensure_lookahead` request, re-checked after each page lands.
    lookahead: Option<(usize, usize)>,
}

impl CursorState {
    fn new() -> Self {
        Self {
            deck: Vec::new(),
            seen: HashSet::new(),
            warmed: HashSet::new(),
            page: 0,
            status: CursorStatus::Idle,
            generation: 0,
            lookahead: None,
        }
    }

    fn append(&mut self, items: &[Candidate]) -> usize {
        let before = self.deck.len();
        for item in items {
            if self.seen.insert(item.id.clone()) {
                self.deck.push(item.clone());
            }
        }
        self.deck.len() - before
    }
}

/// Ordered, deduplicated candidate queue fed page by page from the backend.
#[derive(Clone)]
pub struct PaginatedCursor {
    state: Rc<RefCell<CursorState>>,
    api: Rc<dyn PeopleApi>,
    media: Rc<dyn MediaPrefetcher>,
    spawner: Rc<dyn TaskSpawner>,
    per_page: u32,
    notifier: ChangeNotifier,
}

impl PaginatedCursor {
    pub fn new(
        api: Rc<dyn PeopleApi>,
        media: Rc<dyn MediaPrefetcher>,
        spawner: Rc<dyn TaskSpawner>,
        per_page: u32,
    ) -> Self {
        Self {
            state: Rc::new(RefCell::new(CursorState::new())),
            api,
            media,
            spawner,
            per_page: per_page.max(1),
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn len(&self) -> usize {
        self.state.borrow().deck.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Candidate> {
        self.state.borrow().deck.get(index).cloned()
    }

    pub fn window(&self, from: usize, count: usize) -> Vec<Candidate> {
        self.state
            .borrow()
            .deck
            .iter()
            .skip(from)
            .take(count)
            .cloned()
            .collect()
    }

    pub fn status(&self) -> CursorStatus {
        self.state.borrow().status
    }

    pub fn is_exhausted(&self) -> bool {
        self.status() == CursorStatus::Exhausted
    }

    /// Number of the last page appended, 0 before the first fetch.
    pub fn current_page(&self) -> u32 {
        self.state.borrow().page
    }

    pub fn version(&self) -> u64 {
        self.notifier.version()
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        self.notifier.subscribe(listener)
    }

    /// Requests the next page.
    ///
    /// The status check and the request itself happen before this returns, so
    /// a second call made before the first resolves reports [`LoadOutcome::Busy`].
    pub fn load_next(&self) -> LocalBoxFuture<'static, Result<LoadOutcome, ApiError>> {
        let (page_number, generation) = {
            let mut state = self.state.borrow_mut();
            match state.status {
                CursorStatus::Exhausted => {
                    return future::ready(Ok(LoadOutcome::Empty)).boxed_local()
                }
                CursorStatus::Fetching => return future::ready(Ok(LoadOutcome::Busy)).boxed_local(),
                CursorStatus::Idle => {}
            }
            state.status = CursorStatus::Fetching;
            (state.page + 1, state.generation)
        };
        self.notifier.notify();

        let request = self.api.fetch_people(page_number, self.per_page);
        let cursor = self.clone();
        async move {
            let result = request.await;
            cursor.finish_load(generation, result)
        }
        .boxed_local()
    }

    fn finish_load(
        &self,
        generation: u64,
        result: Result<Page, ApiError>,
    ) -> Result<LoadOutcome, ApiError> {
        let outcome = {
            let mut state = self.state.borrow_mut();
            if state.generation != generation {
                debug!("Discarding page fetched before the deck was reset");
                return Ok(LoadOutcome::Discarded);
            }

            match result {
                Ok(page) => {
                    let added = state.append(&page.items);
                    state.page = page.page_number;
                    state.status = if page.is_last() {
                        CursorStatus::Exhausted
                    } else {
                        CursorStatus::Idle
                    };
                    debug!(
                        "Loaded page {}/{} ({} new candidates)",
                        page.page_number, page.last_page, added
                    );
                    Ok(LoadOutcome::Loaded(page))
                }
                Err(err) => {
                    state.status = CursorStatus::Idle;
                    Err(err)
                }
            }
        };
        self.notifier.notify();

        // A page that added too few new ids leaves the reader as close to the
        // end as before, so the margin has to be checked again.
        let pending = self.state.borrow().lookahead;
        if let (Ok(LoadOutcome::Loaded(_)), Some((from_index, window))) = (&outcome, pending) {
            self.ensure_lookahead(from_index, window);
        }
        outcome
    }

    /// Starts a background fetch when the cursor is within [`LOOKAHEAD_MARGIN`]
    /// cards of the end, and warms photos for the next `window` cards.
    pub fn ensure_lookahead(&self, from_index: usize, window: usize) {
        let (remaining, upcoming) = {
            let mut state = self.state.borrow_mut();
            state.lookahead = Some((from_index, window));
            let remaining = state.deck.len().saturating_sub(from_index);
            let upcoming: Vec<Candidate> = state
                .deck
                .iter()
                .skip(from_index)
                .take(window)
                .cloned()
                .collect();
            (remaining, upcoming)
        };

        self.prefetch_media(&upcoming, window);

        if remaining > LOOKAHEAD_MARGIN || self.status() != CursorStatus::Idle {
            return;
        }

        let load = self.load_next();
        self.spawner.spawn(
            async move {
                if let Err(err) = load.await {
                    warn!("Background page fetch failed: {}", err);
                }
            }
            .boxed_local(),
        );
    }

    /// Warms the first photo of up to `limit` candidates. URLs already warmed
    /// since the last reset are skipped; failures are not retried.
    pub fn prefetch_media(&self, candidates: &[Candidate], limit: usize) {
        for candidate in candidates.iter().take(limit) {
            let Some(url) = candidate.first_photo_url() else {
                continue;
            };
            if !self.state.borrow_mut().warmed.insert(url.to_owned()) {
                continue;
            }

            let warm = self.media.warm(url);
            self.spawner.spawn(
                async move {
                    if let Err(err) = warm.await {
                        debug!("Ignoring media prefetch failure: {}", err);
                    }
                }
                .boxed_local(),
            );
        }
    }

    /// Forgets every fetched page. A fetch still in flight is discarded when it lands.
    pub fn reset(&self) {
        {
            let mut state = self.state.borrow_mut();
            let generation = state.generation + 1;
            *state = CursorState::new();
            state.generation = generation;
        }
        self.notifier.notify();
    }
}
