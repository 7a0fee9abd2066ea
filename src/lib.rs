pub mod api;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod cursor;
pub mod deck;
pub mod gesture;
pub mod liked;
pub mod media;
pub mod model;
pub mod observe;
pub mod runtime;
mod ui;

#[cfg(test)]
mod test_support;

use api::{HttpPeopleApi, PeopleApi};
use cache::CacheStore;
use config::{load_config, AppConfig};
use coordinator::OptimisticCacheCoordinator;
use cursor::PaginatedCursor;
use deck::DeckController;
use media::ImagePrefetcher;
use runtime::{TaskSpawner, WasmSpawner};
use std::rc::Rc;
use ui::{DeckScreen, LikedScreen};
use wasm_bindgen::prelude::wasm_bindgen;
use web_sys::window;
use yew::prelude::*;

/// Everything the screens share, wired once at startup.
pub struct Services {
    pub config: AppConfig,
    pub deck: DeckController,
    pub coordinator: OptimisticCacheCoordinator,
    pub spawner: Rc<dyn TaskSpawner>,
}

impl Services {
    pub fn build(config: AppConfig) -> Self {
        let api: Rc<dyn PeopleApi> = Rc::new(HttpPeopleApi::new(
            config.api_base_url.clone(),
            config.request_timeout_ms,
        ));
        let spawner: Rc<dyn TaskSpawner> = Rc::new(WasmSpawner);
        let coordinator = OptimisticCacheCoordinator::new(CacheStore::new(), Rc::clone(&api));
        let cursor = PaginatedCursor::new(
            api,
            Rc::new(ImagePrefetcher),
            Rc::clone(&spawner),
            config.feed_per_page,
        );
        let deck = DeckController::new(
            cursor,
            coordinator.clone(),
            Rc::clone(&spawner),
            config.deck_settings(),
        );

        Self {
            config,
            deck,
            coordinator,
            spawner,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tab {
    Discover,
    Liked,
}

#[function_component(App)]
fn app() -> Html {
    let services = use_state(|| {
        let viewport_width = window()
            .and_then(|window| window.inner_width().ok())
            .and_then(|width| width.as_f64())
            .unwrap_or(0.0);
        Rc::new(Services::build(load_config().fit_to_viewport(viewport_width)))
    });
    let tab = use_state(|| Tab::Discover);

    let select_tab = |target: Tab| {
        let tab = tab.clone();
        Callback::from(move |_: MouseEvent| tab.set(target))
    };

    let screen = match *tab {
        Tab::Discover => html! { <DeckScreen services={(*services).clone()} /> },
        Tab::Liked => html! { <LikedScreen services={(*services).clone()} /> },
    };

    html! {
        <div class="app-container">
            <main class="content single-column">
                { screen }
            </main>
            <nav class="tab-bar">
                <button class={classes!("tab-button", (*tab == Tab::Discover).then_some("active"))}
                    onclick={select_tab(Tab::Discover)}>
                    { "Discover" }
                </button>
                <button class={classes!("tab-button", (*tab == Tab::Liked).then_some("active"))}
                    onclick={select_tab(Tab::Liked)}>
                    { "Liked" }
                </button>
            </nav>
        </div>
    }
}

#[wasm_bindgen(start)]
pub fn run_app() {
    wasm_logger::init(wasm_logger::Config::default());
    yew::Renderer::<App>::new().render();
}
