use crate::cursor::CursorStatus;
use crate::deck::{DeckController, DeckStatus, VisibleCard, VISIBLE_CARDS};
use crate::liked::LikedFeed;
use crate::model::{Candidate, SwipeDirection};
use crate::Services;
use gloo_timers::callback::Interval;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::{Element, PointerEvent};
use yew::prelude::*;

const FRAME_MS: u32 = 16;
const STACK_TRANSITION: &str = "transition: transform 80ms linear;";

#[derive(Properties)]
pub struct ServicesProps {
    pub services: Rc<Services>,
}

impl PartialEq for ServicesProps {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.services, &other.services)
    }
}

#[derive(Clone, Copy)]
struct DragOrigin {
    pointer_id: i32,
    start_x: f64,
    start_y: f64,
}

type DragHandle = Rc<RefCell<Option<DragOrigin>>>;

#[function_component(DeckScreen)]
pub fn deck_screen(props: &ServicesProps) -> Html {
    let deck = props.services.deck.clone();
    let force_update = use_force_update();
    let drag_origin: DragHandle = use_mut_ref(|| None);

    {
        let deck = deck.clone();
        use_effect_with_deps(
            move |_| {
                let subscription = deck.subscribe(move || force_update.force_update());
                deck.ensure_loaded();
                move || drop(subscription)
            },
            (),
        );
    }

    {
        let deck = deck.clone();
        use_effect_with_deps(
            move |_| {
                let interval = Interval::new(FRAME_MS, move || {
                    if deck.is_animating() {
                        deck.tick(FRAME_MS as f64);
                    }
                });
                move || drop(interval)
            },
            (),
        );
    }

    let body = match deck.status() {
        DeckStatus::Failed(message) => {
            let retry = {
                let deck = deck.clone();
                Callback::from(move |_: MouseEvent| deck.retry())
            };
            html! {
                <div class="center">
                    <p class="error">{ "Failed to load. Tap to retry." }</p>
                    <p class="error-detail">{ message }</p>
                    <button class="retry-button" onclick={retry}>{ "Retry" }</button>
                </div>
            }
        }
        DeckStatus::Loading if deck.current().is_none() => {
            html! { <p class="center">{ "Loading…" }</p> }
        }
        _ if deck.is_out_of_cards() => {
            if deck.cursor().status() == CursorStatus::Fetching {
                html! { <p class="center">{ "Loading…" }</p> }
            } else {
                let refresh = {
                    let deck = deck.clone();
                    Callback::from(move |_: MouseEvent| deck.refresh())
                };
                html! {
                    <div class="center">
                        <p>{ "No more cards" }</p>
                        <button class="retry-button" onclick={refresh}>{ "Start over" }</button>
                    </div>
                }
            }
        }
        _ => render_stack(&deck, &drag_origin),
    };

    html! {
        <div class="deck-wrapper">
            { body }
        </div>
    }
}

fn render_stack(deck: &DeckController, drag_origin: &DragHandle) -> Html {
    let swipe = |direction: SwipeDirection| {
        let deck = deck.clone();
        Callback::from(move |_: MouseEvent| {
            deck.swipe(direction);
        })
    };

    html! {
        <div class="card-container">
            // Deepest card first so the top card paints last.
            { for deck.visible_cards().into_iter().rev().map(|card| render_card(deck, drag_origin, card)) }
            <div class="actions">
                <button class="action-button dislike" onclick={swipe(SwipeDirection::Left)}>{ "✕" }</button>
                <button class="action-button like" onclick={swipe(SwipeDirection::Right)}>{ "♥" }</button>
            </div>
        </div>
    }
}

fn render_card(deck: &DeckController, drag_origin: &DragHandle, card: VisibleCard) -> Html {
    let z_index = VISIBLE_CARDS - card.depth;
    let key = card.candidate.id.clone();

    if !card.interactive {
        let style = format!(
            "{} {} z-index: {};",
            card.transform.to_css(),
            STACK_TRANSITION,
            z_index
        );
        return html! {
            <div key={key} class="stacked-card passive">
                <ProfileCard candidate={card.candidate} style={style} />
            </div>
        };
    }

    let style = format!("{} z-index: {};", card.transform.to_css(), z_index);

    let pointer_down = {
        let deck = deck.clone();
        let drag_origin = drag_origin.clone();
        Callback::from(move |event: PointerEvent| {
            event.prevent_default();
            if drag_origin.borrow().is_some() || !deck.drag_start() {
                return;
            }
            if let Some(target) = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
            {
                let _ = target.set_pointer_capture(event.pointer_id());
            }
            *drag_origin.borrow_mut() = Some(DragOrigin {
                pointer_id: event.pointer_id(),
                start_x: event.client_x() as f64,
                start_y: event.client_y() as f64,
            });
        })
    };

    let pointer_move = {
        let deck = deck.clone();
        let drag_origin = drag_origin.clone();
        Callback::from(move |event: PointerEvent| {
            let origin = *drag_origin.borrow();
            if let Some(origin) = origin {
                if origin.pointer_id == event.pointer_id() {
                    event.prevent_default();
                    deck.drag_update(
                        event.client_x() as f64 - origin.start_x,
                        event.client_y() as f64 - origin.start_y,
                    );
                }
            }
        })
    };

    let pointer_finish = |cancelled: bool| {
        let deck = deck.clone();
        let drag_origin = drag_origin.clone();
        Callback::from(move |event: PointerEvent| {
            let origin = *drag_origin.borrow();
            let Some(origin) = origin else {
                return;
            };
            if origin.pointer_id != event.pointer_id() {
                return;
            }
            *drag_origin.borrow_mut() = None;
            if let Some(target) = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
            {
                let _ = target.release_pointer_capture(event.pointer_id());
            }
            if cancelled {
                deck.drag_cancel();
            } else {
                deck.drag_end();
            }
        })
    };

    html! {
        <div key={key} class="stacked-card top swipe-enabled"
            onpointerdown={pointer_down}
            onpointermove={pointer_move}
            onpointerup={pointer_finish(false)}
            onpointercancel={pointer_finish(true)}>
            <ProfileCard candidate={card.candidate} photo_index={card.photo_index} style={style} />
        </div>
    }
}

#[function_component(LikedScreen)]
pub fn liked_screen(props: &ServicesProps) -> Html {
    let feed = {
        let services = Rc::clone(&props.services);
        use_memo(
            move |per_page: &u32| {
                LikedFeed::new(
                    services.coordinator.clone(),
                    Rc::clone(&services.spawner),
                    *per_page,
                )
            },
            props.services.config.liked_per_page,
        )
    };
    let force_update = use_force_update();

    {
        let feed = feed.clone();
        use_effect_with_deps(
            move |_| {
                let subscription = feed.subscribe(move || force_update.force_update());
                feed.refresh();
                move || drop(subscription)
            },
            (),
        );
    }

    let items = feed.items();
    let loading = feed.is_loading();

    let refresh = {
        let feed = feed.clone();
        Callback::from(move |_: MouseEvent| feed.refresh())
    };
    let load_more = {
        let feed = feed.clone();
        Callback::from(move |_: MouseEvent| feed.load_more())
    };

    let list = if items.is_empty() && !loading {
        html! { <p class="menu-placeholder">{ "No liked profiles yet." }</p> }
    } else {
        html! {
            <ul class="liked-list">
                { for items.into_iter().map(|candidate| html! {
                    <li key={candidate.id.clone()} class="liked-item">
                        <ProfileCard candidate={candidate} />
                    </li>
                }) }
            </ul>
        }
    };

    html! {
        <div class="liked-wrapper">
            <div class="liked-header">
                <h2>{ "Liked" }</h2>
                <button class="menu-action" onclick={refresh} disabled={loading}>
                    { if loading { "Refreshing…" } else { "Refresh" } }
                </button>
            </div>
            { list }
            {
                if feed.has_more() && !loading {
                    html! { <button class="menu-action load-more" onclick={load_more}>{ "Load more" }</button> }
                } else {
                    html! {}
                }
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct ProfileCardProps {
    pub candidate: Candidate,
    #[prop_or_default]
    pub photo_index: usize,
    #[prop_or_default]
    pub style: String,
}

#[function_component(ProfileCard)]
pub fn profile_card(props: &ProfileCardProps) -> Html {
    let candidate = &props.candidate;
    let total = candidate.photos.len();

    let image = match candidate.photo_url(props.photo_index) {
        Some(url) => html! { <img class="card-image" src={url.to_owned()} draggable="false" /> },
        None => html! { <div class="card-image placeholder"></div> },
    };

    html! {
        <div class="profile-card" style={props.style.clone()}>
            { image }
            <PhotoIndicator total={total} current={props.photo_index} />
            <div class="card-gradient">
                <div class="card-text">
                    <p class="card-name">
                        { &candidate.display_name }
                        <span class="card-age">{ format!(" {}", candidate.age) }</span>
                    </p>
                    {
                        if candidate.location_label.is_empty() {
                            html! {}
                        } else {
                            html! { <p class="card-location">{ &candidate.location_label }</p> }
                        }
                    }
                </div>
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct PhotoIndicatorProps {
    total: usize,
    current: usize,
}

#[function_component(PhotoIndicator)]
fn photo_indicator(props: &PhotoIndicatorProps) -> Html {
    if props.total == 0 {
        return html! {};
    }

    html! {
        <div class="photo-indicator">
            { for (0..props.total).map(|i| html! {
                <span class={classes!("dot", (i == props.current).then_some("active"))}></span>
            }) }
        </div>
    }
}
