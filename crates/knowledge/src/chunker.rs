//! Text chunking with configurable size and overlap.

use crate::types::ChunkCandidate;

/// Split text into overlapping character windows.
///
/// Window edges are moved to UTF-8 boundaries and, where possible, back to
/// the last whitespace so words are not cut in half. A window shorter than
/// a tenth of `chunk_size` is merged into the previous chunk, so every part
/// of the text lands in some chunk.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<ChunkCandidate> {
    let text = text.trim();
    if text.is_empty() || chunk_size == 0 {
        return vec![];
    }

    let step = if chunk_size > overlap {
        chunk_size - overlap
    } else {
        chunk_size
    };

    let mut chunks: Vec<ChunkCandidate> = Vec::new();
    let mut position = 0u32;
    let mut start = 0;

    while start < text.len() {
        let end = window_end(text, start, chunk_size);
        let piece = text[start..end].trim();

        let short = piece.len() < chunk_size / 10;
        if let Some(last) = chunks.last_mut().filter(|_| short) {
            last.text = text[last.start..end].trim().to_string();
            last.end = end;
        } else if !piece.is_empty() {
            chunks.push(ChunkCandidate {
                position,
                text: piece.to_string(),
                start,
                end,
            });
            position += 1;
        }

        if end >= text.len() {
            break;
        }

        let mut next_start = (start + step).min(end);
        while next_start < text.len() && !text.is_char_boundary(next_start) {
            next_start += 1;
        }

        // Start the next window on a word, not inside one. The whitespace
        // may sit at `end` itself when the window was cut there.
        if !text[..next_start].ends_with(char::is_whitespace) {
            if let Some((offset, ch)) = text[next_start..]
                .char_indices()
                .find(|(_, c)| c.is_whitespace())
                .filter(|(offset, _)| next_start + offset <= end)
            {
                next_start += offset + ch.len_utf8();
            }
        }
        start = next_start;
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

/// End of the window starting at `start`, on a char boundary and preferably
/// just after whitespace.
fn window_end(text: &str, start: usize, chunk_size: usize) -> usize {
    let mut end = (start + chunk_size).min(text.len());
    while end > start && !text.is_char_boundary(end) {
        end -= 1;
    }

    // Window smaller than a single character: take the whole character.
    if end == start {
        end += text[start..].chars().next().map_or(0, char::len_utf8);
    }

    if end == text.len() {
        return end;
    }

    // Only back off to whitespace in the second half of the window.
    match text[start..end].rfind(char::is_whitespace) {
        Some(offset) if offset > chunk_size / 2 => start + offset,
        _ => end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_text_basic() {
        let text = "a".repeat(1000);
        let chunks = chunk_text(&text, 200, 50);

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[1].position, 1);
        assert_eq!(chunks[1].start, 150);
    }

    #[test]
    fn test_chunk_text_no_overlap() {
        let text = "a".repeat(300);
        let chunks = chunk_text(&text, 100, 0);

        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("", 100, 10).is_empty());
        assert!(chunk_text("   \n", 100, 10).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("Tent", 1024, 128);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Tent");
    }

    #[test]
    fn test_breaks_on_whitespace() {
        let text = "waterproof ".repeat(40);
        let chunks = chunk_text(&text, 100, 10);

        for chunk in &chunks {
            assert!(chunk.text.split_whitespace().all(|w| w == "waterproof"));
        }
    }

    #[test]
    fn test_short_tail_is_kept() {
        let text = format!("{} {}", "x".repeat(95), "yyyyyyyy");
        let chunks = chunk_text(&text, 100, 0);

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.ends_with("yyyyyyyy"));
        assert_eq!(chunks[0].end, text.len());
    }

    #[test]
    fn test_every_word_is_chunked() {
        let text = (0..120).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let chunks = chunk_text(&text, 100, 8);

        for word in text.split_whitespace() {
            assert!(
                chunks.iter().any(|c| c.text.split_whitespace().any(|w| w == word)),
                "missing {}",
                word
            );
        }
    }

    #[test]
    fn test_multibyte_boundaries() {
        let text = "Zelt für 4 Personen – wasserdicht ".repeat(30);
        let chunks = chunk_text(&text, 64, 16);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(!chunk.text.is_empty());
        }
    }

    #[test]
    fn test_chunk_text_with_overlap() {
        let text = "abcdefghijklmnopqrstuvwxyz".repeat(10);
        let chunks = chunk_text(&text, 50, 10);

        assert!(chunks.len() >= 2);
        let first_tail: String = chunks[0].text.chars().rev().take(10).collect::<Vec<_>>().into_iter().rev().collect();
        assert!(chunks[1].text.starts_with(&first_tail));
    }
}
