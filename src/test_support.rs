use crate::api::{ApiError, PeopleApi};
use crate::media::{MediaError, MediaPrefetcher};
use crate::model::{Candidate, Page, Photo};
use futures::future::{self, LocalBoxFuture};
use std::cell::RefCell;
use std::rc::Rc;

pub fn candidate(id: &str) -> Candidate {
    Candidate {
        id: id.to_owned(),
        display_name: format!("Person {}", id),
        age: 30,
        location_label: "Split".to_owned(),
        photos: vec![
            Photo {
                id: format!("{}-a", id),
                url: format!("https://img.test/{}-a.jpg", id),
            },
            Photo {
                id: format!("{}-b", id),
                url: format!("https://img.test/{}-b.jpg", id),
            },
        ],
        like_count: None,
    }
}

pub fn candidates(prefix: &str, count: usize) -> Vec<Candidate> {
    (1..=count)
        .map(|n| candidate(&format!("{}{}", prefix, n)))
        .collect()
}

enum PeopleSource {
    Paged(Vec<Candidate>),
    Fixed(Vec<Vec<Candidate>>),
}

struct FakeState {
    people: PeopleSource,
    liked: Vec<Candidate>,
    fail_people: bool,
    fail_liked: bool,
    fail_votes: bool,
    people_calls: Vec<(u32, u32)>,
    liked_calls: Vec<(u32, u32)>,
    likes: Vec<String>,
    dislikes: Vec<String>,
}

/// In-memory backend whose responses are ready immediately.
pub struct FakePeopleApi {
    state: RefCell<FakeState>,
    on_like: RefCell<Option<Box<dyn Fn(&str)>>>,
}

impl FakePeopleApi {
    /// Serves `people` sliced by whatever page size the caller asks for.
    pub fn paged(people: Vec<Candidate>) -> Rc<Self> {
        Self::with_source(PeopleSource::Paged(people))
    }

    /// Serves exactly these pages, ignoring the requested page size.
    pub fn fixed_pages(pages: Vec<Vec<Candidate>>) -> Rc<Self> {
        Self::with_source(PeopleSource::Fixed(pages))
    }

    fn with_source(people: PeopleSource) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(FakeState {
                people,
                liked: Vec::new(),
                fail_people: false,
                fail_liked: false,
                fail_votes: false,
                people_calls: Vec::new(),
                liked_calls: Vec::new(),
                likes: Vec::new(),
                dislikes: Vec::new(),
            }),
            on_like: RefCell::new(None),
        })
    }

    pub fn set_fail_people(&self, fail: bool) {
        self.state.borrow_mut().fail_people = fail;
    }

    pub fn set_fail_liked(&self, fail: bool) {
        self.state.borrow_mut().fail_liked = fail;
    }

    pub fn set_fail_votes(&self, fail: bool) {
        self.state.borrow_mut().fail_votes = fail;
    }

    /// Runs `hook` with the id at the moment `like` is dispatched.
    pub fn on_like(&self, hook: impl Fn(&str) + 'static) {
        *self.on_like.borrow_mut() = Some(Box::new(hook));
    }

    pub fn seed_liked(&self, liked: Vec<Candidate>) {
        self.state.borrow_mut().liked = liked;
    }

    pub fn people_calls(&self) -> Vec<(u32, u32)> {
        self.state.borrow().people_calls.clone()
    }

    pub fn liked_calls(&self) -> Vec<(u32, u32)> {
        self.state.borrow().liked_calls.clone()
    }

    pub fn likes(&self) -> Vec<String> {
        self.state.borrow().likes.clone()
    }

    pub fn dislikes(&self) -> Vec<String> {
        self.state.borrow().dislikes.clone()
    }

    fn find_person(state: &FakeState, id: &str) -> Option<Candidate> {
        let all: Vec<&Candidate> = match &state.people {
            PeopleSource::Paged(people) => people.iter().collect(),
            PeopleSource::Fixed(pages) => pages.iter().flatten().collect(),
        };
        all.into_iter().find(|person| person.id == id).cloned()
    }
}

fn slice_page(items: &[Candidate], page: u32, per_page: u32) -> Page {
    let per_page = per_page.max(1) as usize;
    let last_page = ((items.len() + per_page - 1) / per_page).max(1) as u32;
    let start = (page.saturating_sub(1) as usize) * per_page;
    let items = items.iter().skip(start).take(per_page).cloned().collect();
    Page {
        items,
        page_number: page,
        last_page,
    }
}

fn unavailable() -> ApiError {
    ApiError::Network("backend unavailable".to_owned())
}

impl PeopleApi for FakePeopleApi {
    fn fetch_people(&self, page: u32, per_page: u32) -> LocalBoxFuture<'static, Result<Page, ApiError>> {
        let mut state = self.state.borrow_mut();
        state.people_calls.push((page, per_page));
        let result = if state.fail_people {
            Err(unavailable())
        } else {
            Ok(match &state.people {
                PeopleSource::Paged(people) => slice_page(people, page, per_page),
                PeopleSource::Fixed(pages) => Page {
                    items: pages
                        .get(page.saturating_sub(1) as usize)
                        .cloned()
                        .unwrap_or_default(),
                    page_number: page,
                    last_page: pages.len().max(1) as u32,
                },
            })
        };
        Box::pin(future::ready(result))
    }

    fn fetch_liked(&self, page: u32, per_page: u32) -> LocalBoxFuture<'static, Result<Page, ApiError>> {
        let mut state = self.state.borrow_mut();
        state.liked_calls.push((page, per_page));
        let result = if state.fail_liked {
            Err(unavailable())
        } else {
            Ok(slice_page(&state.liked, page, per_page))
        };
        Box::pin(future::ready(result))
    }

    fn like(&self, id: &str) -> LocalBoxFuture<'static, Result<(), ApiError>> {
        if let Some(hook) = self.on_like.borrow().as_ref() {
            hook(id);
        }
        let mut state = self.state.borrow_mut();
        let result = if state.fail_votes {
            Err(unavailable())
        } else {
            state.likes.push(id.to_owned());
            if let Some(person) = Self::find_person(&state, id) {
                if !state.liked.iter().any(|liked| liked.id == id) {
                    state.liked.insert(0, person);
                }
            }
            Ok(())
        };
        Box::pin(future::ready(result))
    }

    fn dislike(&self, id: &str) -> LocalBoxFuture<'static, Result<(), ApiError>> {
        let mut state = self.state.borrow_mut();
        let result = if state.fail_votes {
            Err(unavailable())
        } else {
            state.dislikes.push(id.to_owned());
            Ok(())
        };
        Box::pin(future::ready(result))
    }
}

#[derive(Default)]
pub struct RecordingPrefetcher {
    urls: RefCell<Vec<String>>,
}

impl RecordingPrefetcher {
    pub fn urls(&self) -> Vec<String> {
        self.urls.borrow().clone()
    }
}

impl MediaPrefetcher for RecordingPrefetcher {
    fn warm(&self, url: &str) -> LocalBoxFuture<'static, Result<(), MediaError>> {
        self.urls.borrow_mut().push(url.to_owned());
        Box::pin(future::ready(Ok(())))
    }
}

#[derive(Default)]
pub struct FailingPrefetcher;

impl MediaPrefetcher for FailingPrefetcher {
    fn warm(&self, url: &str) -> LocalBoxFuture<'static, Result<(), MediaError>> {
        Box::pin(future::ready(Err(MediaError {
            url: url.to_owned(),
            reason: "decode failed".to_owned(),
        })))
    }
}
