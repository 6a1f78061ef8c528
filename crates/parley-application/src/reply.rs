//! Outbound replies: chunking and ordered delivery.

use async_trait::async_trait;
use std::time::Duration;

/// Prefix marking every chunk after the first as a continuation.
pub const CONTINUATION_PREFIX: &str = "... ";

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Transport-side receiver of outbound messages.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), SinkError>;
}

/// A reply ready for delivery, split into ordered chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    text: String,
    chunks: Vec<String>,
    pause: Duration,
}

impl Reply {
    pub fn new(text: impl Into<String>, max_chunk_chars: usize, pause: Duration) -> Self {
        let text = text.into();
        let chunks = split_reply(&text, max_chunk_chars);
        Self { text, chunks, pause }
    }

    /// The complete reply text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Raw chunks, without continuation prefixes.
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Messages as they go on the wire.
    pub fn messages(&self) -> Vec<String> {
        self.chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                if i == 0 {
                    chunk.clone()
                } else {
                    format!("{CONTINUATION_PREFIX}{chunk}")
                }
            })
            .collect()
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }
}

/// Splits `text` into consecutive pieces of at most `max_chars` characters.
///
/// Counts Unicode scalar values, so a multi-byte character is never split.
/// Empty text yields no chunks.
pub fn split_reply(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        if count == max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Sends every message of `reply` in order, pausing between messages.
///
/// Stops at the first failed send.
pub async fn deliver(reply: &Reply, sink: &dyn ReplySink) -> Result<(), SinkError> {
    for (i, message) in reply.messages().iter().enumerate() {
        if i > 0 && !reply.pause.is_zero() {
            tokio::time::sleep(reply.pause).await;
        }
        sink.send(message).await.inspect_err(|e| {
            tracing::error!(chunk = i, error = %e, "Error sending message");
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    #[async_trait]
    impl ReplySink for Collect {
        async fn send(&self, message: &str) -> Result<(), SinkError> {
            self.0.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl ReplySink for Broken {
        async fn send(&self, _message: &str) -> Result<(), SinkError> {
            Err("channel closed".into())
        }
    }

    #[test]
    fn test_split_9000_by_4000() {
        let text = "x".repeat(9000);
        let lengths: Vec<usize> = split_reply(&text, 4000).iter().map(|c| c.chars().count()).collect();
        assert_eq!(lengths, vec![4000, 4000, 1000]);
    }

    #[test]
    fn test_short_text_single_chunk() {
        assert_eq!(split_reply("hi there", 4000), vec!["hi there"]);
        assert!(split_reply("", 10).is_empty());
    }

    #[test]
    fn test_split_respects_multibyte_chars() {
        let text = "مرحبا".repeat(3);
        let chunks = split_reply(&text, 4);
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
    }

    #[test]
    fn test_messages_prefix_continuations() {
        let reply = Reply::new("abcdefg", 3, Duration::ZERO);
        assert_eq!(reply.chunks(), ["abc", "def", "g"]);
        assert_eq!(reply.messages(), vec!["abc", "... def", "... g"]);
        assert_eq!(reply.text(), "abcdefg");
    }

    #[tokio::test]
    async fn test_deliver_in_order_with_pause() {
        let reply = Reply::new("aaaabbbbcc", 4, Duration::from_millis(10));
        let sink = Collect::default();

        let started = std::time::Instant::now();
        deliver(&reply, &sink).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(*sink.0.lock().unwrap(), vec!["aaaa", "... bbbb", "... cc"]);
    }

    #[tokio::test]
    async fn test_deliver_surfaces_sink_error() {
        let reply = Reply::new("hello", 10, Duration::ZERO);
        assert!(deliver(&reply, &Broken).await.is_err());
    }
}
