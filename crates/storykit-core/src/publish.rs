//! Runs composer commands against a backend to create stories.

use crate::backend::{BackendError, StoryBackend};
use crate::composer::{Composer, ComposerCommand, ComposerMsg};
use crate::media::VideoCompressor;
use crate::story::{StoryFeed, StoryRecord};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

/// Publish errors.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Rejected locally before or between backend calls.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Story composer stopped before the story was published")]
    Incomplete,
}

/// Executes the composer's side effects: compression, upload, then insert.
pub struct StoryPublisher<B: StoryBackend, C: VideoCompressor> {
    backend: Arc<B>,
    compressor: C,
}

impl<B: StoryBackend, C: VideoCompressor> StoryPublisher<B, C> {
    pub fn new(backend: Arc<B>, compressor: C) -> Self {
        Self { backend, compressor }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Submit the composer's story for `user_id`.
    ///
    /// On success the new story is added to `feed`. On failure the feed is
    /// untouched and the composer is back in its editing phase.
    pub async fn create_story(
        &self,
        composer: &mut Composer,
        user_id: &str,
        feed: &mut StoryFeed,
    ) -> Result<StoryRecord, PublishError> {
        let mut queue: VecDeque<ComposerCommand> = step(
            composer,
            ComposerMsg::Submit {
                user_id: user_id.to_string(),
            },
        )
        .into();

        let mut published = None;
        let mut backend_error = None;
        let mut alert = None;

        while let Some(command) = queue.pop_front() {
            let msg = match command {
                ComposerCommand::Alert(message) => {
                    log::warn!("Story not published: {}", message);
                    alert = Some(message);
                    continue;
                }
                ComposerCommand::CompressVideo { file, target_bytes } => {
                    log::info!(
                        "Compressing {} ({} bytes) toward {} bytes",
                        file.file_name,
                        file.size(),
                        target_bytes
                    );
                    ComposerMsg::Compressed(
                        self.compressor
                            .compress(file, target_bytes)
                            .map_err(|e| e.to_string()),
                    )
                }
                ComposerCommand::UploadMedia(request) => {
                    log::info!("Uploading story media to {}", request.storage_path());
                    let result = self.backend.upload_media(request).await;
                    ComposerMsg::Uploaded(result.map_err(|e| {
                        log::error!("Media upload failed: {}", e);
                        let message = e.to_string();
                        backend_error = Some(e);
                        message
                    }))
                }
                ComposerCommand::InsertStory(story) => {
                    let result = self.backend.insert_story(story).await;
                    ComposerMsg::Inserted(match result {
                        Ok(record) => {
                            published = Some(record.clone());
                            Ok(record)
                        }
                        Err(e) => {
                            log::error!("Story insert failed: {}", e);
                            let message = e.to_string();
                            backend_error = Some(e);
                            Err(message)
                        }
                    })
                }
            };
            queue.extend(step(composer, msg));
        }

        if let Some(record) = published {
            log::info!("Published story {} for {}", record.id, record.user_id);
            feed.insert(record.clone());
            return Ok(record);
        }
        if let Some(e) = backend_error {
            return Err(PublishError::Backend(e));
        }
        match alert {
            Some(message) => Err(PublishError::Rejected(message)),
            None => Err(PublishError::Incomplete),
        }
    }

    /// Reload the feed with stories still active at `now`.
    pub async fn refresh_feed(&self, feed: &mut StoryFeed, now: DateTime<Utc>) -> Result<usize, PublishError> {
        let stories = self.backend.active_stories(now).await?;
        let count = stories.len();
        feed.replace(stories);
        log::debug!("Feed refreshed with {} active stories", count);
        Ok(count)
    }
}

/// Run one composer update in place.
fn step(composer: &mut Composer, msg: ComposerMsg) -> Vec<ComposerCommand> {
    let (next, commands) = std::mem::take(composer).update(msg);
    *composer = next;
    commands
}
