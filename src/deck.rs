use crate::coordinator::OptimisticCacheCoordinator;
use crate::cursor::{CursorStatus, LoadOutcome, PaginatedCursor};
use crate::gesture::{
    next_photo_index, stacked_card_style, CardTransform, GestureConfig, GestureDecisionEngine,
    Release,
};
use crate::model::{Candidate, SwipeDecision, SwipeDirection};
use crate::observe::{ChangeNotifier, Subscription};
use crate::runtime::TaskSpawner;
use futures::future::FutureExt;
use log::{debug, info, warn};
use std::cell::RefCell;
use std::rc::Rc;

/// Cards rendered at once: the interactive top card plus two passive ones.
pub const VISIBLE_CARDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckStatus {
    Loading,
    Ready,
    /// The first page could not be fetched; the user may retry.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleCard {
    pub candidate: Candidate,
    /// 0 for the top card.
    pub depth: usize,
    pub transform: CardTransform,
    pub interactive: bool,
    pub photo_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeckSettings {
    pub prefetch_window: usize,
    pub gesture: GestureConfig,
}

struct DeckState {
    index: usize,
    status: DeckStatus,
    engine: Option<GestureDecisionEngine>,
    progress: f64,
    photo_index: usize,
}

/// Drives one swipe at a time over the cursor's deck.
#[derive(Clone)]
pub struct DeckController {
    state: Rc<RefCell<DeckState>>,
    cursor: PaginatedCursor,
    coordinator: OptimisticCacheCoordinator,
    spawner: Rc<dyn TaskSpawner>,
    settings: DeckSettings,
    notifier: ChangeNotifier,
    _cursor_subscription: Rc<Subscription>,
}

impl DeckController {
    pub fn new(
        cursor: PaginatedCursor,
        coordinator: OptimisticCacheCoordinator,
        spawner: Rc<dyn TaskSpawner>,
        settings: DeckSettings,
    ) -> Self {
        let notifier = ChangeNotifier::new();
        let forward = notifier.clone();
        let subscription = cursor.subscribe(move || forward.notify());
        Self {
            state: Rc::new(RefCell::new(DeckState {
                index: 0,
                status: DeckStatus::Loading,
                engine: None,
                progress: 0.0,
                photo_index: 0,
            })),
            cursor,
            coordinator,
            spawner,
            settings,
            notifier,
            _cursor_subscription: Rc::new(subscription),
        }
    }

    pub fn cursor(&self) -> &PaginatedCursor {
        &self.cursor
    }

    pub fn index(&self) -> usize {
        self.state.borrow().index
    }

    pub fn status(&self) -> DeckStatus {
        self.state.borrow().status.clone()
    }

    pub fn progress(&self) -> f64 {
        self.state.borrow().progress
    }

    pub fn current(&self) -> Option<Candidate> {
        self.cursor.get(self.index())
    }

    /// Loaded, but nothing left to show right now.
    pub fn is_out_of_cards(&self) -> bool {
        self.status() == DeckStatus::Ready && self.current().is_none()
    }

    pub fn version(&self) -> u64 {
        self.notifier.version()
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        self.notifier.subscribe(listener)
    }

    /// Fetches the first page. Failure is surfaced through [`DeckStatus::Failed`].
    pub fn load(&self) {
        self.set_status(DeckStatus::Loading);
        let load = self.cursor.load_next();
        let deck = self.clone();
        self.spawner.spawn(
            async move {
                match load.await {
                    Ok(LoadOutcome::Busy | LoadOutcome::Discarded) => {}
                    Ok(LoadOutcome::Loaded(_) | LoadOutcome::Empty) => {
                        deck.set_status(DeckStatus::Ready);
                        let index = deck.index();
                        deck.cursor
                            .ensure_lookahead(index, deck.settings.prefetch_window);
                    }
                    Err(err) => {
                        warn!("Initial deck load failed: {}", err);
                        deck.set_status(DeckStatus::Failed(err.to_string()));
                    }
                }
            }
            .boxed_local(),
        );
    }

    /// Starts the first load unless pages are already present or on the way.
    pub fn ensure_loaded(&self) {
        let idle = self.cursor.status() == CursorStatus::Idle;
        if idle && self.cursor.is_empty() && self.status() == DeckStatus::Loading {
            self.load();
        }
    }

    pub fn retry(&self) {
        if matches!(self.status(), DeckStatus::Failed(_)) {
            self.load();
        }
    }

    /// Pull-to-refresh: forget the deck and start again from the first page.
    pub fn refresh(&self) {
        info!("Refreshing deck");
        self.cursor.reset();
        {
            let mut state = self.state.borrow_mut();
            state.index = 0;
            state.engine = None;
            state.progress = 0.0;
            state.photo_index = 0;
        }
        self.load();
    }

    /// Top card first, at most [`VISIBLE_CARDS`].
    pub fn visible_cards(&self) -> Vec<VisibleCard> {
        let state = self.state.borrow();
        self.cursor
            .window(state.index, VISIBLE_CARDS)
            .into_iter()
            .enumerate()
            .map(|(depth, candidate)| {
                let transform = if depth == 0 {
                    state
                        .engine
                        .as_ref()
                        .filter(|engine| engine.candidate_id() == candidate.id)
                        .map(GestureDecisionEngine::transform)
                        .unwrap_or(CardTransform::REST)
                } else {
                    stacked_card_style(depth, state.progress)
                };
                VisibleCard {
                    photo_index: if depth == 0 { state.photo_index } else { 0 },
                    interactive: depth == 0,
                    candidate,
                    depth,
                    transform,
                }
            })
            .collect()
    }

    pub fn drag_start(&self) -> bool {
        let started = self.with_engine(|engine| engine.drag_start()).unwrap_or(false);
        if started {
            self.notifier.notify();
        }
        started
    }

    pub fn drag_update(&self, dx: f64, dy: f64) {
        let progress = self.with_engine(|engine| engine.drag_update(dx, dy)).flatten();
        if let Some(progress) = progress {
            self.state.borrow_mut().progress = progress;
            self.notifier.notify();
        }
    }

    /// A release that never really moved advances the top card's photo.
    pub fn drag_end(&self) -> Release {
        let release = self
            .with_engine(|engine| engine.drag_end())
            .unwrap_or(Release::Ignored);
        match release {
            Release::Ignored => return release,
            Release::Tap => {
                self.advance_photo();
                self.state.borrow_mut().progress = 0.0;
            }
            Release::Returning => self.state.borrow_mut().progress = 0.0,
            Release::Exiting(_) => self.state.borrow_mut().progress = 1.0,
        }
        self.notifier.notify();
        release
    }

    pub fn drag_cancel(&self) {
        let release = self
            .with_engine(|engine| engine.cancel())
            .unwrap_or(Release::Ignored);
        if release != Release::Ignored {
            self.state.borrow_mut().progress = 0.0;
            self.notifier.notify();
        }
    }

    /// Button-triggered swipe; runs the same exit animation as a drag.
    pub fn swipe(&self, direction: SwipeDirection) -> bool {
        let flung = self
            .with_engine(|engine| engine.fling(direction))
            .unwrap_or(false);
        if flung {
            self.state.borrow_mut().progress = 1.0;
            self.notifier.notify();
        }
        flung
    }

    pub fn is_animating(&self) -> bool {
        self.state
            .borrow()
            .engine
            .as_ref()
            .map(GestureDecisionEngine::is_animating)
            .unwrap_or(false)
    }

    /// Advances the top card's animation by one frame and applies its decision
    /// when the exit completes.
    pub fn tick(&self, dt_ms: f64) -> Option<SwipeDecision> {
        let (animating, decision) = {
            let mut state = self.state.borrow_mut();
            let Some(engine) = state.engine.as_mut() else {
                return None;
            };
            let animating = engine.is_animating();
            (animating, engine.tick(dt_ms))
        };

        if let Some(decision) = &decision {
            self.handle_decision(decision);
        } else if animating {
            self.notifier.notify();
        }
        decision
    }

    /// Applies a decision for the current card. Decisions for any other card
    /// are ignored so the index only ever moves one card at a time.
    pub fn handle_decision(&self, decision: &SwipeDecision) -> bool {
        let Some(candidate) = self.current() else {
            debug!("Ignoring decision for {} past the end of the deck", decision.candidate_id);
            return false;
        };
        if candidate.id != decision.candidate_id {
            debug!(
                "Ignoring decision for {}, current card is {}",
                decision.candidate_id, candidate.id
            );
            return false;
        }

        self.route(decision.direction, &candidate);

        let index = {
            let mut state = self.state.borrow_mut();
            state.index += 1;
            state.progress = 0.0;
            state.photo_index = 0;
            state.engine = None;
            state.index
        };
        self.notifier.notify();
        self.cursor
            .ensure_lookahead(index, self.settings.prefetch_window);
        true
    }

    fn route(&self, direction: SwipeDirection, candidate: &Candidate) {
        let (action, mutation) = match direction {
            SwipeDirection::Right => ("Like", self.coordinator.apply_like(candidate)),
            SwipeDirection::Left => ("Dislike", self.coordinator.apply_dislike(candidate)),
            SwipeDirection::None => return,
        };
        let id = candidate.id.clone();
        self.spawner.spawn(
            async move {
                if let Err(err) = mutation.await {
                    warn!("{} for {} was not recorded: {}", action, id, err);
                }
            }
            .boxed_local(),
        );
    }

    fn advance_photo(&self) {
        let photo_count = self
            .current()
            .map(|candidate| candidate.photos.len())
            .unwrap_or(0);
        let mut state = self.state.borrow_mut();
        state.photo_index = next_photo_index(state.photo_index, photo_count);
    }

    /// Runs `f` on the engine for the current card, creating it on first use.
    fn with_engine<T>(&self, f: impl FnOnce(&mut GestureDecisionEngine) -> T) -> Option<T> {
        let candidate = self.current()?;
        if self.status() != DeckStatus::Ready {
            return None;
        }
        let mut state = self.state.borrow_mut();
        let stale = state
            .engine
            .as_ref()
            .map(|engine| engine.candidate_id() != candidate.id)
            .unwrap_or(true);
        if stale {
            state.engine = Some(GestureDecisionEngine::new(
                candidate.id.clone(),
                self.settings.gesture,
            ));
        }
        state.engine.as_mut().map(f)
    }

    fn set_status(&self, status: DeckStatus) {
        self.state.borrow_mut().status = status;
        self.notifier.notify();
    }
}
