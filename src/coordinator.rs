use crate::api::{ApiError, PeopleApi};
use crate::cache::{CacheStore, ViewKey};
use crate::model::{Candidate, Page};
use futures::future::{self, FutureExt, LocalBoxFuture};
use log::{info, warn};
use std::rc::Rc;

/// The only writer of [`CacheStore`]: applies swipe outcomes to every affected
/// view and keeps the views in step with the backend.
#[derive(Clone)]
pub struct OptimisticCacheCoordinator {
    store: CacheStore,
    api: Rc<dyn PeopleApi>,
}

impl OptimisticCacheCoordinator {
    pub fn new(store: CacheStore, api: Rc<dyn PeopleApi>) -> Self {
        Self { store, api }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Inserts `candidate` into every liked view before the like request is
    /// dispatched, then invalidates the liked views once it settles.
    ///
    /// A failed like is returned but not rolled back: the optimistic entry
    /// stays until the refetch replaces it with what the server has.
    pub fn apply_like(&self, candidate: &Candidate) -> LocalBoxFuture<'static, Result<(), ApiError>> {
        let inserted = self.insert_liked(candidate);
        info!(
            "Optimistically added {} to {} liked view(s)",
            candidate.id, inserted
        );

        let request = self.api.like(&candidate.id);
        let coordinator = self.clone();
        async move {
            let result = request.await;
            coordinator.invalidate_liked().await;
            result
        }
        .boxed_local()
    }

    /// Dislikes are not materialized in any view.
    pub fn apply_dislike(&self, candidate: &Candidate) -> LocalBoxFuture<'static, Result<(), ApiError>> {
        self.api.dislike(&candidate.id)
    }

    fn insert_liked(&self, candidate: &Candidate) -> usize {
        let mut inserted = 0;
        self.store.update_matching(ViewKey::is_liked, |_, view| {
            if view.insert_optimistic(candidate) {
                inserted += 1;
            }
        });
        inserted
    }

    /// Marks every liked view stale and refetches them all.
    pub fn invalidate_liked(&self) -> LocalBoxFuture<'static, ()> {
        self.store.update_matching(ViewKey::is_liked, |_, view| view.mark_stale());
        let refreshes: Vec<_> = self
            .store
            .keys_matching(ViewKey::is_liked)
            .into_iter()
            .map(|key| {
                let refresh = self.refresh_view(key);
                async move {
                    if let Err(err) = refresh.await {
                        warn!("Refetch of {:?} failed, keeping cached pages: {}", key, err);
                    }
                }
            })
            .collect();
        info!("Invalidated {} liked view(s)", refreshes.len());
        future::join_all(refreshes).map(|_| ()).boxed_local()
    }

    /// Refetches every page the view has loaded so far and swaps them in
    /// together. On failure the cached pages are kept.
    pub fn refresh_view(&self, key: ViewKey) -> LocalBoxFuture<'static, Result<(), ApiError>> {
        let started = self.store.update(key, |view| {
            view.set_loading(true);
            (view.pages().len().max(1) as u32, view.revision())
        });
        let Some((page_count, started_revision)) = started else {
            return future::ready(Ok(())).boxed_local();
        };

        let requests: Vec<_> = (1..=page_count)
            .map(|page| self.api.fetch_liked(page, key.per_page()))
            .collect();
        let store = self.store.clone();
        async move {
            let fetched: Result<Vec<Page>, ApiError> =
                future::join_all(requests).await.into_iter().collect();
            match fetched {
                Ok(pages) => {
                    let pages = trim_after_last(pages);
                    store.update(key, |view| {
                        view.replace_pages(pages, started_revision);
                        view.set_loading(false);
                    });
                    Ok(())
                }
                Err(err) => {
                    store.update(key, |view| view.set_loading(false));
                    Err(err)
                }
            }
        }
        .boxed_local()
    }

    /// Fetches the view's next page. Resolves immediately when the view is
    /// already loading, has no more pages, or no longer exists.
    pub fn load_view_page(&self, key: ViewKey) -> LocalBoxFuture<'static, Result<(), ApiError>> {
        let Some(view) = self.store.view(key) else {
            return future::ready(Ok(())).boxed_local();
        };
        if view.is_loading() {
            return future::ready(Ok(())).boxed_local();
        }
        let Some(next) = view.next_page() else {
            return future::ready(Ok(())).boxed_local();
        };
        if next == 1 {
            return self.refresh_view(key);
        }

        self.store.update(key, |view| view.set_loading(true));
        let request = self.api.fetch_liked(next, key.per_page());
        let store = self.store.clone();
        async move {
            let result = request.await;
            store.update(key, |view| {
                view.set_loading(false);
                if let Ok(page) = &result {
                    view.append_page(page.clone());
                }
            });
            result.map(|_| ())
        }
        .boxed_local()
    }
}

/// Drops pages past the one the server reports as last, which happens when
/// the collection shrank since the pages were first loaded.
fn trim_after_last(pages: Vec<Page>) -> Vec<Page> {
    let mut trimmed = Vec::with_capacity(pages.len());
    for page in pages {
        let last = page.is_last();
        trimmed.push(page);
        if last {
            break;
        }
    }
    trimmed
}
