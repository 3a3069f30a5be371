//! Backend abstraction for media upload, story rows and reactions.
//!
//! The hosted backend is reached only through this trait. [`MemoryBackend`]
//! keeps everything in process and applies the same server-side rules.

use crate::media::{MediaError, MediaUploadRequest, UploadedMedia, parse_upload_response};
use crate::reactions::ReactionRow;
use crate::story::{NewStory, StoryRecord};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

/// Backend errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Invalid response: {0}")]
    Invalid(String),
    #[error("Backend error: {0}")]
    Other(String),
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

impl From<MediaError> for BackendError {
    fn from(error: MediaError) -> Self {
        match error {
            MediaError::Upload { status, message } => BackendError::Rejected { status, message },
            MediaError::InvalidResponse(message) => BackendError::Invalid(message),
            other => BackendError::Other(other.to_string()),
        }
    }
}

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// HTTP verb used for a raw storage object upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadMethod {
    /// Create a new object.
    Post,
    /// Create or replace an object.
    Put,
}

impl UploadMethod {
    /// The other verb.
    pub fn alternate(self) -> Self {
        match self {
            UploadMethod::Post => UploadMethod::Put,
            UploadMethod::Put => UploadMethod::Post,
        }
    }
}

/// Trait for story backends.
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait StoryBackend: Send + Sync {
    /// Call the media upload function.
    fn upload_media(&self, request: MediaUploadRequest) -> BoxFuture<'_, BackendResult<UploadedMedia>>;

    /// Upload raw bytes straight to object storage.
    fn put_object(
        &self,
        method: UploadMethod,
        path: &str,
        bytes: Vec<u8>,
    ) -> BoxFuture<'_, BackendResult<UploadedMedia>>;

    /// Insert a story row. The backend assigns id and timestamps.
    fn insert_story(&self, story: NewStory) -> BoxFuture<'_, BackendResult<StoryRecord>>;

    /// Stories that have not expired at `now`, newest first.
    fn active_stories(&self, now: DateTime<Utc>) -> BoxFuture<'_, BackendResult<Vec<StoryRecord>>>;

    /// Insert or replace the viewer's reaction on a post.
    fn upsert_reaction(&self, reaction: ReactionRow) -> BoxFuture<'_, BackendResult<()>>;

    /// Remove the viewer's reaction on a post.
    fn delete_reaction(&self, post_id: &str, user_id: &str) -> BoxFuture<'_, BackendResult<()>>;

    /// All reactions on a post.
    fn reactions_for(&self, post_id: &str) -> BoxFuture<'_, BackendResult<Vec<ReactionRow>>>;
}

/// Trait for story backends (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait StoryBackend {
    /// Call the media upload function.
    fn upload_media(&self, request: MediaUploadRequest) -> BoxFuture<'_, BackendResult<UploadedMedia>>;

    /// Upload raw bytes straight to object storage.
    fn put_object(
        &self,
        method: UploadMethod,
        path: &str,
        bytes: Vec<u8>,
    ) -> BoxFuture<'_, BackendResult<UploadedMedia>>;

    /// Insert a story row. The backend assigns id and timestamps.
    fn insert_story(&self, story: NewStory) -> BoxFuture<'_, BackendResult<StoryRecord>>;

    /// Stories that have not expired at `now`, newest first.
    fn active_stories(&self, now: DateTime<Utc>) -> BoxFuture<'_, BackendResult<Vec<StoryRecord>>>;

    /// Insert or replace the viewer's reaction on a post.
    fn upsert_reaction(&self, reaction: ReactionRow) -> BoxFuture<'_, BackendResult<()>>;

    /// Remove the viewer's reaction on a post.
    fn delete_reaction(&self, post_id: &str, user_id: &str) -> BoxFuture<'_, BackendResult<()>>;

    /// All reactions on a post.
    fn reactions_for(&self, post_id: &str) -> BoxFuture<'_, BackendResult<Vec<ReactionRow>>>;
}

/// Upload raw bytes, retrying once with the alternate verb on an error status.
///
/// Transport failures are returned as-is.
pub async fn upload_object_with_fallback<B: StoryBackend + ?Sized>(
    backend: &B,
    path: &str,
    bytes: Vec<u8>,
) -> BackendResult<UploadedMedia> {
    let first = UploadMethod::Post;
    match backend.put_object(first, path, bytes.clone()).await {
        Err(BackendError::Rejected { status, message }) => {
            log::warn!(
                "{:?} upload of {} failed ({}): {}, retrying with {:?}",
                first,
                path,
                status,
                message,
                first.alternate()
            );
            backend.put_object(first.alternate(), path, bytes).await
        }
        result => result,
    }
}

/// Operations that [`MemoryBackend`] counts and can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    UploadMedia,
    PutObject(UploadMethod),
    InsertStory,
    ActiveStories,
    UpsertReaction,
    DeleteReaction,
    ReactionsFor,
}

#[derive(Debug, Default)]
struct MemoryState {
    objects: HashMap<String, Vec<u8>>,
    stories: Vec<StoryRecord>,
    reactions: Vec<ReactionRow>,
    calls: HashMap<BackendOp, usize>,
    failures: HashMap<BackendOp, BackendError>,
    clock: Option<DateTime<Utc>>,
}

/// In-memory backend for testing and offline use.
#[derive(Debug)]
pub struct MemoryBackend {
    public_base_url: String,
    state: RwLock<MemoryState>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new("https://storage.local/public")
    }
}

impl MemoryBackend {
    /// Create an empty backend that serves objects under `public_base_url`.
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            state: RwLock::new(MemoryState::default()),
        }
    }

    fn write(&self) -> BackendResult<std::sync::RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|e| BackendError::Other(format!("Lock error: {}", e)))
    }

    fn read(&self) -> BackendResult<std::sync::RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|e| BackendError::Other(format!("Lock error: {}", e)))
    }

    /// Pin the server clock. `None` uses the wall clock.
    pub fn set_clock(&self, now: Option<DateTime<Utc>>) {
        if let Ok(mut state) = self.state.write() {
            state.clock = now;
        }
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: BackendOp, error: BackendError) {
        if let Ok(mut state) = self.state.write() {
            state.failures.insert(op, error);
        }
    }

    /// How many times `op` has been called.
    pub fn calls(&self, op: BackendOp) -> usize {
        self.state
            .read()
            .map(|state| state.calls.get(&op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total number of calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.state
            .read()
            .map(|state| state.calls.values().sum())
            .unwrap_or(0)
    }

    /// Number of stored story rows, expired ones included.
    pub fn story_count(&self) -> usize {
        self.state.read().map(|state| state.stories.len()).unwrap_or(0)
    }

    /// Stored bytes for an object path.
    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.state.read().ok()?.objects.get(path).cloned()
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path)
    }

    /// Count the call and return an injected failure, if any.
    fn begin(state: &mut MemoryState, op: BackendOp) -> BackendResult<()> {
        *state.calls.entry(op).or_insert(0) += 1;
        match state.failures.remove(&op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn store_object(
        &self,
        state: &mut MemoryState,
        method: UploadMethod,
        path: &str,
        bytes: Vec<u8>,
    ) -> BackendResult<UploadedMedia> {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return Err(BackendError::Rejected {
                status: 400,
                message: "Missing object path".to_string(),
            });
        }
        if method == UploadMethod::Post && state.objects.contains_key(path) {
            return Err(BackendError::Rejected {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        state.objects.insert(path.to_string(), bytes);
        Ok(UploadedMedia {
            public_url: self.public_url(path),
            path: path.to_string(),
        })
    }
}

impl MemoryBackend {
    /// The upload function's HTTP status and JSON body for `request`.
    fn run_upload_function(&self, state: &mut MemoryState, request: &MediaUploadRequest) -> (u16, String) {
        if request.base64.is_empty() || request.file_name.is_empty() {
            return (400, serde_json::json!({ "error": "Missing base64 or fileName" }).to_string());
        }
        let bytes = match request.decode() {
            Ok(bytes) => bytes,
            Err(e) => return (400, serde_json::json!({ "error": e.to_string() }).to_string()),
        };
        let path = request.storage_path();
        match self.store_object(state, UploadMethod::Put, &path, bytes) {
            Ok(uploaded) => match serde_json::to_string(&uploaded) {
                Ok(body) => (200, body),
                Err(e) => (500, serde_json::json!({ "error": e.to_string() }).to_string()),
            },
            Err(BackendError::Rejected { status, message }) => {
                (status, serde_json::json!({ "error": message }).to_string())
            }
            Err(e) => (500, serde_json::json!({ "error": e.to_string() }).to_string()),
        }
    }
}

impl StoryBackend for MemoryBackend {
    fn upload_media(&self, request: MediaUploadRequest) -> BoxFuture<'_, BackendResult<UploadedMedia>> {
        Box::pin(async move {
            let mut state = self.write()?;
            Self::begin(&mut state, BackendOp::UploadMedia)?;
            let (status, body) = self.run_upload_function(&mut state, &request);
            Ok(parse_upload_response(status, &body)?)
        })
    }

    fn put_object(
        &self,
        method: UploadMethod,
        path: &str,
        bytes: Vec<u8>,
    ) -> BoxFuture<'_, BackendResult<UploadedMedia>> {
        let path = path.to_string();
        Box::pin(async move {
            let mut state = self.write()?;
            Self::begin(&mut state, BackendOp::PutObject(method))?;
            self.store_object(&mut state, method, &path, bytes)
        })
    }

    fn insert_story(&self, story: NewStory) -> BoxFuture<'_, BackendResult<StoryRecord>> {
        Box::pin(async move {
            let mut state = self.write()?;
            Self::begin(&mut state, BackendOp::InsertStory)?;
            if story.user_id.trim().is_empty() || story.media_url.trim().is_empty() {
                return Err(BackendError::Rejected {
                    status: 400,
                    message: "user_id and media_url are required".to_string(),
                });
            }
            let now = state.clock.unwrap_or_else(Utc::now);
            let record = StoryRecord::from_insert(Uuid::new_v4(), story, now);
            state.stories.push(record.clone());
            Ok(record)
        })
    }

    fn active_stories(&self, now: DateTime<Utc>) -> BoxFuture<'_, BackendResult<Vec<StoryRecord>>> {
        Box::pin(async move {
            let mut state = self.write()?;
            Self::begin(&mut state, BackendOp::ActiveStories)?;
            let mut stories: Vec<_> = state
                .stories
                .iter()
                .filter(|story| story.is_active(now))
                .cloned()
                .collect();
            stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(stories)
        })
    }

    fn upsert_reaction(&self, reaction: ReactionRow) -> BoxFuture<'_, BackendResult<()>> {
        Box::pin(async move {
            let mut state = self.write()?;
            Self::begin(&mut state, BackendOp::UpsertReaction)?;
            match state
                .reactions
                .iter_mut()
                .find(|row| row.post_id == reaction.post_id && row.user_id == reaction.user_id)
            {
                Some(existing) => existing.kind = reaction.kind,
                None => state.reactions.push(reaction),
            }
            Ok(())
        })
    }

    fn delete_reaction(&self, post_id: &str, user_id: &str) -> BoxFuture<'_, BackendResult<()>> {
        let post_id = post_id.to_string();
        let user_id = user_id.to_string();
        Box::pin(async move {
            let mut state = self.write()?;
            Self::begin(&mut state, BackendOp::DeleteReaction)?;
            state
                .reactions
                .retain(|row| !(row.post_id == post_id && row.user_id == user_id));
            Ok(())
        })
    }

    fn reactions_for(&self, post_id: &str) -> BoxFuture<'_, BackendResult<Vec<ReactionRow>>> {
        let post_id = post_id.to_string();
        Box::pin(async move {
            {
                let mut state = self.write()?;
                Self::begin(&mut state, BackendOp::ReactionsFor)?;
            }
            let state = self.read()?;
            Ok(state
                .reactions
                .iter()
                .filter(|row| row.post_id == post_id)
                .cloned()
                .collect())
        })
    }
}
