use crate::model::{Candidate, Page};
use crate::observe::{ChangeNotifier, Subscription};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::{Rc, Weak};

/// Identifies one cached paginated query. Views of the same kind with
/// different page sizes are distinct entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewKey {
    Liked { per_page: u32 },
}

impl ViewKey {
    pub fn liked(per_page: u32) -> Self {
        Self::Liked {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u32 {
        match self {
            Self::Liked { per_page } => *per_page,
        }
    }

    pub fn is_liked(&self) -> bool {
        matches!(self, Self::Liked { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheView {
    pages: Vec<Page>,
    is_loading: bool,
    stale: bool,
    /// The only page was made up locally by an optimistic insert.
    synthetic: bool,
    revision: u64,
    optimistic: Vec<(u64, Candidate)>,
}

impl CacheView {
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Items across all pages in order, first occurrence of each id only.
    pub fn items(&self) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        self.pages
            .iter()
            .flat_map(|page| page.items.iter())
            .filter(|item| seen.insert(item.id.as_str()))
            .cloned()
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.pages
            .iter()
            .any(|page| page.items.iter().any(|item| item.id == id))
    }

    pub fn occurrences(&self, id: &str) -> usize {
        self.pages
            .iter()
            .flat_map(|page| page.items.iter())
            .filter(|item| item.id == id)
            .count()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn has_more(&self) -> bool {
        match self.pages.last() {
            None => true,
            Some(page) => self.synthetic || !page.is_last(),
        }
    }

    /// Page to request for `load_more`, `None` when the server has no more.
    pub fn next_page(&self) -> Option<u32> {
        if self.synthetic {
            return Some(1);
        }
        match self.pages.last() {
            None => Some(1),
            Some(page) if page.is_last() => None,
            Some(page) => Some(page.page_number + 1),
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub(crate) fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Puts `candidate` at the head of the first page unless some page already
    /// holds its id.
    pub(crate) fn insert_optimistic(&mut self, candidate: &Candidate) -> bool {
        if !self.insert_head(candidate) {
            return false;
        }
        self.revision += 1;
        self.optimistic.push((self.revision, candidate.clone()));
        true
    }

    pub(crate) fn append_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Replaces all pages with a server snapshot taken at `started_revision`.
    /// Optimistic inserts made after the snapshot was requested survive it, as
    /// do pages past the snapshot that were appended while it was in flight.
    pub(crate) fn replace_pages(&mut self, mut pages: Vec<Page>, started_revision: u64) {
        if let Some(last) = pages.last().filter(|page| !page.is_last()) {
            let boundary = last.page_number;
            let tail: Vec<Page> = self
                .pages
                .iter()
                .filter(|page| page.page_number > boundary)
                .cloned()
                .collect();
            pages.extend(tail);
        }
        self.pages = pages;
        self.synthetic = false;
        self.stale = false;
        self.optimistic
            .retain(|(revision, _)| *revision > started_revision);
        let survivors: Vec<Candidate> = self
            .optimistic
            .iter()
            .map(|(_, candidate)| candidate.clone())
            .collect();
        for candidate in &survivors {
            self.insert_head(candidate);
        }
    }

    fn insert_head(&mut self, candidate: &Candidate) -> bool {
        if self.contains(&candidate.id) {
            return false;
        }
        match self.pages.first_mut() {
            Some(first) => first.items.insert(0, candidate.clone()),
            None => {
                self.pages.push(Page {
                    items: vec![candidate.clone()],
                    page_number: 1,
                    last_page: 1,
                });
                self.synthetic = true;
            }
        }
        true
    }
}

struct ViewEntry {
    view: CacheView,
    observers: usize,
}

#[derive(Default)]
struct StoreInner {
    views: BTreeMap<ViewKey, ViewEntry>,
}

/// Handle to the cached query results shared by every screen.
///
/// Reads are public; writes go through the crate's cache coordinator.
#[derive(Clone, Default)]
pub struct CacheStore {
    inner: Rc<RefCell<StoreInner>>,
    notifier: ChangeNotifier,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in `key`, creating the view if needed. The view is
    /// dropped once every observer is gone.
    pub fn observe(&self, key: ViewKey) -> ViewObserver {
        let created = {
            let mut inner = self.inner.borrow_mut();
            let entry = inner.views.entry(key).or_insert_with(|| ViewEntry {
                view: CacheView::default(),
                observers: 0,
            });
            entry.observers += 1;
            entry.observers == 1
        };
        if created {
            self.notifier.notify();
        }
        ViewObserver {
            key,
            inner: Rc::downgrade(&self.inner),
            notifier: self.notifier.clone(),
        }
    }

    pub fn view(&self, key: ViewKey) -> Option<CacheView> {
        self.inner
            .borrow()
            .views
            .get(&key)
            .map(|entry| entry.view.clone())
    }

    pub fn keys(&self) -> Vec<ViewKey> {
        self.inner.borrow().views.keys().copied().collect()
    }

    pub fn keys_matching(&self, predicate: impl Fn(&ViewKey) -> bool) -> Vec<ViewKey> {
        self.inner
            .borrow()
            .views
            .keys()
            .filter(|key| predicate(*key))
            .copied()
            .collect()
    }

    pub fn version(&self) -> u64 {
        self.notifier.version()
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        self.notifier.subscribe(listener)
    }

    /// Mutates one view. Returns `None` if the view no longer exists.
    pub(crate) fn update<T>(&self, key: ViewKey, f: impl FnOnce(&mut CacheView) -> T) -> Option<T> {
        let result = {
            let mut inner = self.inner.borrow_mut();
            let entry = inner.views.get_mut(&key)?;
            f(&mut entry.view)
        };
        self.notifier.notify();
        Some(result)
    }

    /// Mutates every view matching `predicate` under one borrow, so observers
    /// never see some of them updated and others not. Returns the number of
    /// views visited.
    pub(crate) fn update_matching(
        &self,
        predicate: impl Fn(&ViewKey) -> bool,
        mut f: impl FnMut(&ViewKey, &mut CacheView),
    ) -> usize {
        let visited = {
            let mut inner = self.inner.borrow_mut();
            let mut visited = 0;
            for (key, entry) in inner.views.iter_mut() {
                if predicate(key) {
                    f(key, &mut entry.view);
                    visited += 1;
                }
            }
            visited
        };
        if visited > 0 {
            self.notifier.notify();
        }
        visited
    }
}

/// Keeps a view alive while held.
pub struct ViewObserver {
    key: ViewKey,
    inner: Weak<RefCell<StoreInner>>,
    notifier: ChangeNotifier,
}

impl ViewObserver {
    pub fn key(&self) -> ViewKey {
        self.key
    }
}

impl Drop for ViewObserver {
    fn drop(&mut self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let removed = {
            let mut inner = inner.borrow_mut();
            match inner.views.get_mut(&self.key) {
                Some(entry) if entry.observers > 1 => {
                    entry.observers -= 1;
                    false
                }
                Some(_) => {
                    inner.views.remove(&self.key);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.notifier.notify();
        }
    }
}
