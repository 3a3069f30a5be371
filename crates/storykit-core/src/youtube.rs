//! YouTube link detection for shared posts.

use std::fmt;
use url::Url;

/// Player error codes after which the inline embed is abandoned.
///
/// 2: invalid id, 5: HTML5 player error, 100: removed or private,
/// 101/150: embedding disabled by the owner, 153: missing referrer.
const FALLBACK_ERROR_CODES: &[i32] = &[2, 5, 100, 101, 150, 153];

/// Path prefixes on youtube.com that are followed by a video id.
const ID_PATH_PREFIXES: &[&str] = &["embed", "shorts", "live", "v", "e"];

/// An 11-character YouTube video id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Accept a string that is exactly a valid video id.
    pub fn parse(candidate: &str) -> Option<Self> {
        let valid = candidate.len() == 11
            && candidate
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        valid.then(|| Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn embed_url(&self) -> String {
        format!("https://www.youtube.com/embed/{}", self.0)
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }

    pub fn thumbnail_url(&self) -> String {
        format!("https://img.youtube.com/vi/{}/hqdefault.jpg", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract a video id from a URL, a scheme-less link, or a bare id.
pub fn extract_video_id(input: &str) -> Option<VideoId> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    VideoId::parse(input).or_else(|| extract_from_link(input))
}

/// Extract a video id from a YouTube URL or scheme-less link. Bare ids are not accepted.
fn extract_from_link(input: &str) -> Option<VideoId> {
    let url = Url::parse(input)
        .ok()
        .filter(|url| url.has_host())
        .or_else(|| Url::parse(&format!("https://{}", input)).ok())?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = ["www.", "m.", "music."]
        .iter()
        .find_map(|prefix| host.strip_prefix(prefix))
        .unwrap_or(&host);

    let mut segments = url.path_segments()?.filter(|segment| !segment.is_empty());
    match host {
        "youtu.be" => segments.next().and_then(VideoId::parse),
        "youtube.com" | "youtube-nocookie.com" => match segments.next()? {
            "watch" => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .and_then(|(_, value)| VideoId::parse(&value)),
            prefix if ID_PATH_PREFIXES.contains(&prefix) => segments.next().and_then(VideoId::parse),
            _ => None,
        },
        _ => None,
    }
}

/// Find YouTube links in free text, in order of appearance, without duplicates.
pub fn detect_links(text: &str) -> Vec<VideoId> {
    let mut found: Vec<VideoId> = Vec::new();
    for token in text.split_whitespace() {
        if !token.to_ascii_lowercase().contains("youtu") {
            continue;
        }
        let token = token.trim_matches(|c: char| matches!(c, '(' | ')' | '<' | '>' | '"' | '\'' | ',' | '.' | '!' | '?'));
        if let Some(id) = extract_from_link(token) {
            if !found.contains(&id) {
                found.push(id);
            }
        }
    }
    found
}

/// How a linked video is presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedPlan {
    /// Play inline in an embedded player.
    Embed { id: VideoId },
    /// Show the thumbnail and open the video externally.
    External { id: VideoId, url: String },
}

impl EmbedPlan {
    /// Start with the inline player.
    pub fn for_video(id: VideoId) -> Self {
        EmbedPlan::Embed { id }
    }

    pub fn id(&self) -> &VideoId {
        match self {
            EmbedPlan::Embed { id } | EmbedPlan::External { id, .. } => id,
        }
    }

    /// React to an embedded player error.
    pub fn on_player_error(self, code: i32) -> Self {
        match self {
            EmbedPlan::Embed { id } if FALLBACK_ERROR_CODES.contains(&code) => {
                log::debug!("Embed of {} failed with code {}, opening externally", id, code);
                let url = id.watch_url();
                EmbedPlan::External { id, url }
            }
            plan => plan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn test_extract_supported_forms() {
        let inputs = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://music.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ?feature=share",
            "https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ",
            "youtu.be/dQw4w9WgXcQ",
            "www.youtube.com/watch?v=dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
            "  https://YOUTU.BE/dQw4w9WgXcQ  ",
        ];
        for input in inputs {
            assert_eq!(
                extract_video_id(input).as_ref().map(VideoId::as_str),
                Some(ID),
                "input: {}",
                input
            );
        }
    }

    #[test]
    fn test_extract_rejects() {
        let inputs = [
            "",
            "https://vimeo.com/123456789",
            "https://www.youtube.com/watch?v=short",
            "https://www.youtube.com/channel/UC1234567890",
            "https://youtu.be/",
            "not a link",
            "dQw4w9WgXc!",
        ];
        for input in inputs {
            assert!(extract_video_id(input).is_none(), "input: {}", input);
        }
    }

    #[test]
    fn test_urls() {
        let id = VideoId::parse(ID).unwrap();
        assert_eq!(id.embed_url(), "https://www.youtube.com/embed/dQw4w9WgXcQ");
        assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(id.thumbnail_url(), "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg");
    }

    #[test]
    fn test_detect_links_in_text() {
        let text = "Sunday worship (https://youtu.be/dQw4w9WgXcQ). Also https://www.youtube.com/watch?v=dQw4w9WgXcQ \
                    and https://youtube.com/shorts/abcdefghijk! encouraging words";
        let found = detect_links(text);
        let ids: Vec<_> = found.iter().map(VideoId::as_str).collect();
        assert_eq!(ids, vec![ID, "abcdefghijk"]);
    }

    #[test]
    fn test_detect_links_ignores_plain_words() {
        assert!(detect_links("I love youtubevids so much").is_empty());
        assert!(detect_links("youtube_fan1 posted today").is_empty());
        assert!(detect_links("Watch on youtube tonight!").is_empty());
    }

    #[test]
    fn test_embed_fallback() {
        let id = VideoId::parse(ID).unwrap();
        let plan = EmbedPlan::for_video(id.clone());
        assert_eq!(plan.clone().on_player_error(1), plan);

        let fallback = plan.on_player_error(150);
        assert_eq!(
            fallback,
            EmbedPlan::External {
                id: id.clone(),
                url: id.watch_url()
            }
        );
        assert_eq!(fallback.clone().on_player_error(2), fallback);
        assert_eq!(fallback.id(), &id);
    }
}
