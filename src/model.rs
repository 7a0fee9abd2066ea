use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub url: String,
}

/// A profile shown on a card. Two candidates are the same card when their ids match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub age: u32,
    #[serde(rename = "location", default)]
    pub location_label: String,
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u32>,
}

impl Candidate {
    pub fn first_photo_url(&self) -> Option<&str> {
        self.photos.first().map(|photo| photo.url.as_str())
    }

    pub fn photo_url(&self, index: usize) -> Option<&str> {
        self.photos.get(index).map(|photo| photo.url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<Candidate>,
    pub page_number: u32,
    pub last_page: u32,
}

impl Page {
    pub fn is_last(&self) -> bool {
        self.page_number >= self.last_page
    }
}

/// Raw `{data, current_page, last_page}` envelope returned by the people endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PageEnvelope {
    pub data: Vec<Candidate>,
    pub current_page: u32,
    pub last_page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("page {current_page} is outside 1..={last_page}")]
pub struct PageShapeError {
    pub current_page: u32,
    pub last_page: u32,
}

impl TryFrom<PageEnvelope> for Page {
    type Error = PageShapeError;

    fn try_from(envelope: PageEnvelope) -> Result<Self, Self::Error> {
        // An empty collection still reports one (empty) page.
        let last_page = envelope.last_page.max(1);
        if envelope.current_page == 0 || envelope.current_page > last_page {
            return Err(PageShapeError {
                current_page: envelope.current_page,
                last_page: envelope.last_page,
            });
        }

        Ok(Page {
            items: envelope.data,
            page_number: envelope.current_page,
            last_page,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwipeDirection {
    Left,
    Right,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeDecision {
    pub direction: SwipeDirection,
    pub candidate_id: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_backend_person_with_numeric_ids() {
        let json = r#"{
            "id": 42,
            "name": "Ana",
            "age": 27,
            "location": "Zagreb",
            "photos": [{"id": 7, "url": "https://img.test/a.jpg"}]
        }"#;

        let candidate: Candidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.id, "42");
        assert_eq!(candidate.display_name, "Ana");
        assert_eq!(candidate.location_label, "Zagreb");
        assert_eq!(candidate.like_count, None);
        assert_eq!(candidate.first_photo_url(), Some("https://img.test/a.jpg"));
    }

    #[test]
    fn envelope_with_page_past_last_is_rejected() {
        let envelope = PageEnvelope {
            data: Vec::new(),
            current_page: 4,
            last_page: 3,
        };
        let err = Page::try_from(envelope).unwrap_err();
        assert_eq!(
            err,
            PageShapeError {
                current_page: 4,
                last_page: 3,
            }
        );
        assert_eq!(err.to_string(), "page 4 is outside 1..=3");
    }

    #[test]
    fn empty_collection_counts_as_single_last_page() {
        let envelope = PageEnvelope {
            data: Vec::new(),
            current_page: 1,
            last_page: 0,
        };
        let page = Page::try_from(envelope).unwrap();
        assert_eq!(page.last_page, 1);
        assert!(page.is_last());
    }
}
