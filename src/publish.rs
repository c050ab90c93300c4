pub mod twitter;

use std::fmt::Display;

use log::{info, warn};
use thiserror::Error;

/// Longest post the platform accepts.
pub const MAX_POST_LENGTH: usize = 280;

/// Handle of a published post, used to reply to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostId(pub String);

impl Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("API responded {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Can't attach image: {0}")]
    Media(String),
}

pub trait Publisher {
    fn publish(&self, text: &str, reply_to: Option<&PostId>) -> Result<PostId, PublishError>;

    fn publish_with_media(
        &self,
        text: &str,
        image_url: &str,
        reply_to: Option<&PostId>,
    ) -> Result<PostId, PublishError>;

    fn send_direct_message(&self, text: &str) -> Result<(), PublishError>;

    /// Publish every post as a reply to the previous one.  Returns the last
    /// post, or `reply_to` when there was nothing to publish.
    fn publish_thread(
        &self,
        posts: &[String],
        reply_to: Option<PostId>,
    ) -> Result<Option<PostId>, PublishError> {
        let mut last = reply_to;
        for post in posts {
            last = Some(self.publish(post, last.as_ref())?);
        }
        info!("published a thread of {} posts", posts.len());
        Ok(last)
    }

    /// Pack the sentences in as few posts as possible and publish them as a
    /// thread.
    fn publish_sentences(
        &self,
        sentences: &[String],
        header: Option<&str>,
        reply_to: Option<PostId>,
    ) -> Result<Option<PostId>, PublishError> {
        let posts = split_into_chunks(sentences, header, MAX_POST_LENGTH);
        self.publish_thread(&posts, reply_to)
    }
}

/// Length as counted by the platform: characters outside the basic
/// multilingual plane, like most emojis, count twice.
pub fn weighted_len(text: &str) -> usize {
    text.chars()
        .map(|c| if u32::from(c) > 0xFFFF { 2 } else { 1 })
        .sum()
}

/// Group sentences, one per line, in chunks no longer than `limit`.
///
/// With a header every chunk starts with `"{header} ({n}/{total}):\n\n"`.
/// Sentences keep their order and are never split, a sentence longer than
/// the limit gets a chunk of its own.
pub fn split_into_chunks(sentences: &[String], header: Option<&str>, limit: usize) -> Vec<String> {
    let reserved = header
        .map(|h| weighted_len(&format!("{h} (99/99):\n\n")))
        .unwrap_or(0);
    let mut chunks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;
    for sentence in sentences {
        let len = weighted_len(sentence);
        if reserved + len > limit {
            warn!("sentence too long for one post: {sentence}");
        }
        let joined = if current.is_empty() { len } else { current_len + 1 + len };
        if !current.is_empty() && reserved + joined > limit {
            chunks.push(std::mem::take(&mut current));
            current_len = len;
        } else {
            current_len = joined;
        }
        current.push(sentence);
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let body = chunk.join("\n");
            match header {
                Some(h) => format!("{h} ({}/{total}):\n\n{body}", i + 1),
                None => body,
            }
        })
        .collect()
}

/// Cut `text` to at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
