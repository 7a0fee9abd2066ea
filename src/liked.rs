use crate::cache::{ViewKey, ViewObserver};
use crate::coordinator::OptimisticCacheCoordinator;
use crate::model::Candidate;
use crate::observe::Subscription;
use crate::runtime::TaskSpawner;
use futures::future::FutureExt;
use log::warn;
use std::rc::Rc;

/// Read model behind the liked list screen, backed by one liked cache view.
pub struct LikedFeed {
    key: ViewKey,
    coordinator: OptimisticCacheCoordinator,
    spawner: Rc<dyn TaskSpawner>,
    _observer: ViewObserver,
}

impl LikedFeed {
    pub fn new(
        coordinator: OptimisticCacheCoordinator,
        spawner: Rc<dyn TaskSpawner>,
        per_page: u32,
    ) -> Self {
        let key = ViewKey::liked(per_page);
        let observer = coordinator.store().observe(key);
        Self {
            key,
            coordinator,
            spawner,
            _observer: observer,
        }
    }

    pub fn key(&self) -> ViewKey {
        self.key
    }

    pub fn items(&self) -> Vec<Candidate> {
        self.coordinator
            .store()
            .view(self.key)
            .map(|view| view.items())
            .unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.coordinator
            .store()
            .view(self.key)
            .map(|view| view.is_loading())
            .unwrap_or(false)
    }

    pub fn has_more(&self) -> bool {
        self.coordinator
            .store()
            .view(self.key)
            .map(|view| view.has_more())
            .unwrap_or(false)
    }

    pub fn load_more(&self) {
        if !self.has_more() || self.is_loading() {
            return;
        }
        let load = self.coordinator.load_view_page(self.key);
        self.spawner.spawn(
            async move {
                if let Err(err) = load.await {
                    warn!("Loading more liked profiles failed: {}", err);
                }
            }
            .boxed_local(),
        );
    }

    pub fn refresh(&self) {
        let refresh = self.coordinator.refresh_view(self.key);
        self.spawner.spawn(
            async move {
                if let Err(err) = refresh.await {
                    warn!("Refreshing liked profiles failed: {}", err);
                }
            }
            .boxed_local(),
        );
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        self.coordinator.store().subscribe(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::test_support::{candidate, candidates, FakePeopleApi};
    use futures::executor::LocalPool;
    use std::cell::Cell;

    fn feed(api: &Rc<FakePeopleApi>, pool: &LocalPool, per_page: u32) -> LikedFeed {
        let coordinator = OptimisticCacheCoordinator::new(CacheStore::new(), api.clone());
        LikedFeed::new(coordinator, Rc::new(pool.spawner()), per_page)
    }

    #[test]
    fn refresh_then_load_more_until_exhausted() {
        let api = FakePeopleApi::paged(candidates("p", 3));
        api.seed_liked(candidates("l", 25));
        let mut pool = LocalPool::new();
        let feed = feed(&api, &pool, 10);
        assert!(feed.has_more());

        feed.refresh();
        pool.run_until_stalled();
        assert_eq!(feed.items().len(), 10);

        feed.load_more();
        pool.run_until_stalled();
        feed.load_more();
        pool.run_until_stalled();
        assert_eq!(feed.items().len(), 25);
        assert!(!feed.has_more());
        assert!(!feed.is_loading());

        feed.load_more();
        pool.run_until_stalled();
        assert_eq!(api.liked_calls().len(), 3);
    }

    #[test]
    fn load_more_is_ignored_while_loading() {
        let api = FakePeopleApi::paged(candidates("p", 3));
        api.seed_liked(candidates("l", 25));
        let mut pool = LocalPool::new();
        let feed = feed(&api, &pool, 10);

        feed.load_more();
        feed.load_more();
        pool.run_until_stalled();

        assert_eq!(api.liked_calls(), vec![(1, 10)]);
    }

    #[test]
    fn subscribers_hear_about_likes() {
        let api = FakePeopleApi::paged(candidates("p", 3));
        let pool = LocalPool::new();
        let feed = feed(&api, &pool, 10);
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let _subscription = feed.subscribe(move || counter.set(counter.get() + 1));

        let _pending = feed.coordinator.apply_like(&candidate("p1"));

        assert!(hits.get() >= 1);
        assert_eq!(feed.items()[0].id, "p1");
    }

    #[test]
    fn failed_refresh_is_swallowed() {
        let api = FakePeopleApi::paged(candidates("p", 3));
        api.set_fail_liked(true);
        let mut pool = LocalPool::new();
        let feed = feed(&api, &pool, 10);

        feed.refresh();
        pool.run_until_stalled();

        assert!(feed.items().is_empty());
        assert!(!feed.is_loading());
    }
}
