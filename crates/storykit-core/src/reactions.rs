//! Post reactions with explicit optimistic state.
//!
//! A toggle is applied locally right away and tracked as pending. The backend
//! result either confirms it or rolls the post back to its last confirmed
//! state.

use crate::backend::{BackendResult, StoryBackend};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Reaction types a viewer can leave on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Heart,
    Pray,
    Amen,
}

/// A reaction row. At most one per (post, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRow {
    pub post_id: String,
    pub user_id: String,
    #[serde(rename = "reaction_type")]
    pub kind: ReactionKind,
}

/// What the backend must do to persist a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionIntent {
    Upsert(ReactionKind),
    Remove,
}

/// Sync state of a post's reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Confirmed,
    Pending,
    /// The last change was rejected and rolled back.
    Failed,
}

/// Reaction counts on a post plus the viewer's own reaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReactionSnapshot {
    counts: BTreeMap<ReactionKind, u32>,
    mine: Option<ReactionKind>,
}

impl ReactionSnapshot {
    /// Build a snapshot from backend rows for `viewer_id`.
    pub fn from_rows(rows: &[ReactionRow], viewer_id: &str) -> Self {
        let mut snapshot = Self::default();
        for row in rows {
            *snapshot.counts.entry(row.kind).or_insert(0) += 1;
            if row.user_id == viewer_id {
                snapshot.mine = Some(row.kind);
            }
        }
        snapshot
    }

    pub fn count(&self, kind: ReactionKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn mine(&self) -> Option<ReactionKind> {
        self.mine
    }

    /// The snapshot after the viewer switches to `next`.
    fn with_mine(&self, next: Option<ReactionKind>) -> Self {
        let mut snapshot = self.clone();
        if let Some(previous) = snapshot.mine {
            if let Some(count) = snapshot.counts.get_mut(&previous) {
                *count = count.saturating_sub(1);
            }
        }
        if let Some(next) = next {
            *snapshot.counts.entry(next).or_insert(0) += 1;
        }
        snapshot.counts.retain(|_, count| *count > 0);
        snapshot.mine = next;
        snapshot
    }
}

/// Reactions on one post as the viewer sees them.
#[derive(Debug, Clone, Default)]
pub struct PostReactions {
    confirmed: ReactionSnapshot,
    pending: Option<ReactionSnapshot>,
    status: SyncStatus,
}

impl PostReactions {
    pub fn new(confirmed: ReactionSnapshot) -> Self {
        Self {
            confirmed,
            pending: None,
            status: SyncStatus::Confirmed,
        }
    }

    /// What the UI should show: the pending change if any, else server truth.
    pub fn displayed(&self) -> &ReactionSnapshot {
        self.pending.as_ref().unwrap_or(&self.confirmed)
    }

    pub fn confirmed(&self) -> &ReactionSnapshot {
        &self.confirmed
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Toggle `kind` for the viewer. Tapping the current reaction removes it.
    ///
    /// Returns `None` while an earlier change is still pending.
    pub fn toggle(&mut self, kind: ReactionKind) -> Option<ReactionIntent> {
        if self.status == SyncStatus::Pending {
            return None;
        }
        let next = if self.confirmed.mine == Some(kind) {
            None
        } else {
            Some(kind)
        };
        self.pending = Some(self.confirmed.with_mine(next));
        self.status = SyncStatus::Pending;
        Some(match next {
            Some(kind) => ReactionIntent::Upsert(kind),
            None => ReactionIntent::Remove,
        })
    }

    /// The backend accepted the pending change.
    pub fn confirm(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.confirmed = pending;
        }
        self.status = SyncStatus::Confirmed;
    }

    /// The backend rejected the pending change; revert to the confirmed state.
    pub fn fail(&mut self) {
        if self.pending.take().is_some() {
            self.status = SyncStatus::Failed;
        }
    }

    /// Replace local state with a fresh server snapshot.
    pub fn reconcile(&mut self, snapshot: ReactionSnapshot) {
        self.confirmed = snapshot;
        self.pending = None;
        self.status = SyncStatus::Confirmed;
    }
}

/// Reaction state for every post on screen.
#[derive(Debug, Clone, Default)]
pub struct ReactionBook {
    posts: HashMap<String, PostReactions>,
}

impl ReactionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load or replace a post's server snapshot.
    pub fn reconcile(&mut self, post_id: &str, snapshot: ReactionSnapshot) {
        self.posts
            .entry(post_id.to_string())
            .or_default()
            .reconcile(snapshot);
    }

    pub fn get(&self, post_id: &str) -> Option<&PostReactions> {
        self.posts.get(post_id)
    }

    pub fn status(&self, post_id: &str) -> SyncStatus {
        self.posts
            .get(post_id)
            .map(PostReactions::status)
            .unwrap_or_default()
    }

    pub fn toggle(&mut self, post_id: &str, kind: ReactionKind) -> Option<ReactionIntent> {
        self.posts
            .entry(post_id.to_string())
            .or_default()
            .toggle(kind)
    }

    pub fn confirm(&mut self, post_id: &str) {
        if let Some(post) = self.posts.get_mut(post_id) {
            post.confirm();
        }
    }

    pub fn fail(&mut self, post_id: &str) {
        if let Some(post) = self.posts.get_mut(post_id) {
            post.fail();
        }
    }
}

/// Toggle a reaction optimistically and persist it.
///
/// Returns `Ok(false)` if nothing was sent because an earlier change is still
/// pending. On failure the post is rolled back and the error returned.
pub async fn sync_reaction<B: StoryBackend + ?Sized>(
    backend: &B,
    book: &mut ReactionBook,
    post_id: &str,
    user_id: &str,
    kind: ReactionKind,
) -> BackendResult<bool> {
    let Some(intent) = book.toggle(post_id, kind) else {
        log::debug!("Reaction on {} still pending, ignoring toggle", post_id);
        return Ok(false);
    };

    let result = match intent {
        ReactionIntent::Upsert(kind) => {
            backend
                .upsert_reaction(ReactionRow {
                    post_id: post_id.to_string(),
                    user_id: user_id.to_string(),
                    kind,
                })
                .await
        }
        ReactionIntent::Remove => backend.delete_reaction(post_id, user_id).await,
    };

    match result {
        Ok(()) => {
            book.confirm(post_id);
            Ok(true)
        }
        Err(e) => {
            log::warn!("Reaction on {} failed, rolling back: {}", post_id, e);
            book.fail(post_id);
            Err(e)
        }
    }
}

/// Reload a post's reactions from the backend, discarding any local change.
pub async fn refresh_reactions<B: StoryBackend + ?Sized>(
    backend: &B,
    book: &mut ReactionBook,
    post_id: &str,
    viewer_id: &str,
) -> BackendResult<()> {
    let rows = backend.reactions_for(post_id).await?;
    log::debug!("Loaded {} reactions for {}", rows.len(), post_id);
    book.reconcile(post_id, ReactionSnapshot::from_rows(&rows, viewer_id));
    Ok(())
}
