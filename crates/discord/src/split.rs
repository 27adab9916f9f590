//! Break long text into Discord-sized messages.

use courier_protocol::MAX_MESSAGE_CHARS;

/// Split `text` into chunks of at most [`MAX_MESSAGE_CHARS`] characters.
///
/// Cuts prefer the last newline in each window, then the last period; a
/// window with neither (or with the separator at its first character) is cut
/// hard at the limit. Every chunk is trimmed and empty chunks are dropped.
pub fn split(text: &str) -> Vec<String> {
    split_at_most(text, MAX_MESSAGE_CHARS)
}

fn split_at_most(text: &str, limit: usize) -> Vec<String> {
    let mut rest = text.trim();
    if rest.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    while rest.chars().count() > limit {
        // Byte offset just past the `limit`-th character.
        let window_end = rest
            .char_indices()
            .nth(limit)
            .map_or(rest.len(), |(i, _)| i);
        let window = &rest[..window_end];

        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind('.'))
            .filter(|&i| i > 0)
            // Separators are one byte wide.
            .map_or(window_end, |i| i + 1);

        let head = rest[..cut].trim();
        if !head.is_empty() {
            chunks.push(head.to_string());
        }
        rest = rest[cut..].trim();
    }
    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}
