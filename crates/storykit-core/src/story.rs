//! Story records and the local story feed.

use crate::overlay::OverlayList;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

/// How many hours a story stays visible after creation.
pub const STORY_LIFETIME_HOURS: i64 = 24;

/// How long a story stays visible after creation.
pub fn story_lifetime() -> Duration {
    Duration::hours(STORY_LIFETIME_HOURS)
}

/// Story errors.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("Invalid story row: {0}")]
    InvalidRow(String),
    #[error("Story {0} expires before it was created")]
    InvalidExpiry(Uuid),
}

/// Result type for story parsing.
pub type StoryResult<T> = Result<T, StoryError>;

/// Kind of media a story carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

/// Insert payload for a new story row. Timestamps are assigned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStory {
    pub user_id: String,
    pub media_type: MediaType,
    pub media_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlays: Option<OverlayList>,
}

impl NewStory {
    pub fn new(user_id: impl Into<String>, media_type: MediaType, media_url: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            media_type,
            media_url: media_url.into(),
            caption: None,
            overlays: None,
        }
    }

    /// Attach a caption. Blank captions are dropped.
    pub fn with_caption(mut self, caption: &str) -> Self {
        let caption = caption.trim();
        self.caption = (!caption.is_empty()).then(|| caption.to_string());
        self
    }

    /// Attach overlays. An empty list is stored as no overlays.
    pub fn with_overlays(mut self, overlays: OverlayList) -> Self {
        self.overlays = (!overlays.is_empty()).then_some(overlays);
        self
    }
}

/// A persisted story row.
///
/// Rows are created once and never updated, so the overlay list is only
/// readable from here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub id: Uuid,
    pub user_id: String,
    pub media_type: MediaType,
    pub media_url: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "deserialize_overlays")]
    overlays: OverlayList,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A null overlays column is an empty list.
fn deserialize_overlays<'de, D>(deserializer: D) -> Result<OverlayList, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<OverlayList>::deserialize(deserializer)?.unwrap_or_default())
}

impl StoryRecord {
    /// Build the row the backend stores for `story` at `created_at`.
    pub fn from_insert(id: Uuid, story: NewStory, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: story.user_id,
            media_type: story.media_type,
            media_url: story.media_url,
            caption: story.caption,
            overlays: story.overlays.unwrap_or_default(),
            created_at,
            expires_at: created_at + story_lifetime(),
        }
    }

    /// Parse a row returned by the backend. Unexpected shapes are rejected.
    pub fn from_json(value: serde_json::Value) -> StoryResult<Self> {
        let record: Self =
            serde_json::from_value(value).map_err(|e| StoryError::InvalidRow(e.to_string()))?;
        if record.expires_at < record.created_at {
            return Err(StoryError::InvalidExpiry(record.id));
        }
        Ok(record)
    }

    pub fn overlays(&self) -> &OverlayList {
        &self.overlays
    }

    /// Whether the story is still visible at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// Locally held stories, newest first.
#[derive(Debug, Clone, Default)]
pub struct StoryFeed {
    stories: Vec<StoryRecord>,
}

impl StoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the feed with a fresh backend result.
    /// The first row for each id wins.
    pub fn replace(&mut self, mut stories: Vec<StoryRecord>) {
        let mut seen = HashSet::with_capacity(stories.len());
        stories.retain(|story| seen.insert(story.id));
        stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.stories = stories;
    }

    /// Insert a story, keeping newest-first order. Returns false for a known id.
    pub fn insert(&mut self, story: StoryRecord) -> bool {
        if self.stories.iter().any(|existing| existing.id == story.id) {
            return false;
        }
        let index = self
            .stories
            .iter()
            .position(|existing| existing.created_at <= story.created_at)
            .unwrap_or(self.stories.len());
        self.stories.insert(index, story);
        true
    }

    /// Drop stories that expired at or before `now`. Returns how many were removed.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.stories.len();
        self.stories.retain(|story| story.is_active(now));
        before - self.stories.len()
    }

    pub fn active(&self, now: DateTime<Utc>) -> impl Iterator<Item = &StoryRecord> {
        self.stories.iter().filter(move |story| story.is_active(now))
    }

    pub fn by_user<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a StoryRecord> {
        self.stories.iter().filter(move |story| story.user_id == user_id)
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoryRecord> {
        self.stories.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{OverlayKind, StickerLabel};
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    fn record(user: &str, created_at: DateTime<Utc>) -> StoryRecord {
        StoryRecord::from_insert(
            Uuid::new_v4(),
            NewStory::new(user, MediaType::Image, "https://cdn.example/a.jpg"),
            created_at,
        )
    }

    #[test]
    fn test_new_story_payload() {
        let overlays = OverlayList::new().add_sticker(StickerLabel::Amen);
        let story = NewStory::new("u1", MediaType::Video, "https://cdn.example/v.mp4")
            .with_caption("  ")
            .with_overlays(overlays);
        let json = serde_json::to_value(&story).unwrap();
        assert_eq!(json["media_type"], "video");
        assert!(json.get("caption").is_none());
        assert!(json.get("created_at").is_none());
        assert_eq!(json["overlays"][0]["type"], "sticker");

        let bare = NewStory::new("u1", MediaType::Image, "x").with_overlays(OverlayList::new());
        assert!(bare.overlays.is_none());
    }

    #[test]
    fn test_expiry_is_24_hours() {
        let story = record("u1", at(8));
        assert_eq!(story.expires_at, at(8) + Duration::hours(24));
        assert!(story.is_active(at(23)));
        assert!(!story.is_active(at(8) + Duration::hours(24)));
        assert_eq!(story.remaining(at(20)), Duration::hours(12));
        assert_eq!(story.remaining(at(8) + Duration::days(3)), Duration::zero());
    }

    #[test]
    fn test_parse_row() {
        let row = serde_json::json!({
            "id": "6f1c2f5e-8c4a-4c59-9d58-0f0d7e0b8a11",
            "user_id": "u1",
            "media_type": "image",
            "media_url": "https://cdn.example/a.jpg",
            "caption": null,
            "overlays": [{"id":"a","type":"sticker","value":"AMEN","normalizedX":0.5,"normalizedY":0.2}],
            "created_at": "2026-03-01T08:00:00Z",
            "expires_at": "2026-03-02T08:00:00Z"
        });
        let story = StoryRecord::from_json(row).unwrap();
        assert_eq!(story.overlays().len(), 1);
        assert_eq!(story.overlays().as_slice()[0].kind(), OverlayKind::Sticker);
        assert!(story.caption.is_none());
    }

    #[test]
    fn test_parse_row_null_overlays() {
        let row = serde_json::json!({
            "id": "6f1c2f5e-8c4a-4c59-9d58-0f0d7e0b8a11",
            "user_id": "u1",
            "media_type": "video",
            "media_url": "https://cdn.example/v.mp4",
            "overlays": null,
            "created_at": "2026-03-01T08:00:00Z",
            "expires_at": "2026-03-02T08:00:00Z"
        });
        assert!(StoryRecord::from_json(row).unwrap().overlays().is_empty());
    }

    #[test]
    fn test_parse_row_fails_closed() {
        let bad_media = serde_json::json!({
            "id": "6f1c2f5e-8c4a-4c59-9d58-0f0d7e0b8a11",
            "user_id": "u1",
            "media_type": "audio",
            "media_url": "x",
            "created_at": "2026-03-01T08:00:00Z",
            "expires_at": "2026-03-02T08:00:00Z"
        });
        assert!(matches!(StoryRecord::from_json(bad_media), Err(StoryError::InvalidRow(_))));

        let backwards = serde_json::json!({
            "id": "6f1c2f5e-8c4a-4c59-9d58-0f0d7e0b8a11",
            "user_id": "u1",
            "media_type": "image",
            "media_url": "x",
            "created_at": "2026-03-02T08:00:00Z",
            "expires_at": "2026-03-01T08:00:00Z"
        });
        assert!(matches!(StoryRecord::from_json(backwards), Err(StoryError::InvalidExpiry(_))));
    }

    #[test]
    fn test_feed_order_and_prune() {
        let mut feed = StoryFeed::new();
        let old = record("u1", at(1));
        let new = record("u2", at(9));
        let mid = record("u1", at(5));
        assert!(feed.insert(old.clone()));
        assert!(feed.insert(new.clone()));
        assert!(feed.insert(mid.clone()));
        assert!(!feed.insert(mid.clone()));

        let order: Vec<_> = feed.iter().map(|s| s.id).collect();
        assert_eq!(order, vec![new.id, mid.id, old.id]);
        assert_eq!(feed.by_user("u1").count(), 2);

        let now = at(3) + Duration::hours(24);
        assert_eq!(feed.active(now).count(), 2);
        assert_eq!(feed.prune_expired(now), 1);
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn test_replace_drops_duplicates_with_equal_timestamps() {
        let a = record("u1", at(4));
        let b = record("u2", at(4));
        let older = record("u3", at(2));

        let mut feed = StoryFeed::new();
        feed.replace(vec![a.clone(), older.clone(), b.clone(), a.clone()]);
        assert_eq!(feed.len(), 3);
        assert_eq!(feed.iter().filter(|s| s.id == a.id).count(), 1);
        assert_eq!(feed.iter().last().map(|s| s.id), Some(older.id));
    }
}
