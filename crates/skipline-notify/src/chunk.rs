//! Length-bounded message splitting.

/// Appended to a chunk that had to be cut mid-line.
pub const SPLIT_MARKER: &str = "\n... (message split)";

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Cuts at the last line break at or before the limit; the line break and
/// any leading whitespace of the remainder are dropped. A line longer than
/// the limit is cut hard, leaving room for [`SPLIT_MARKER`] so the marked
/// chunk still fits.
#[must_use]
pub fn chunk_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let marker_chars = SPLIT_MARKER.chars().count();
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        if rest.chars().count() <= max_chars {
            chunks.push(rest.to_owned());
            break;
        }

        // A line break right at the limit still leaves a whole line that fits.
        let window = &rest[..byte_offset(rest, max_chars + 1)];
        if let Some(idx) = window.rfind('\n').filter(|&i| i > 0) {
            chunks.push(rest[..idx].to_owned());
            rest = rest[idx..].trim_start();
            continue;
        }

        let room = max_chars.saturating_sub(marker_chars);
        if room == 0 {
            let cut = byte_offset(rest, max_chars);
            chunks.push(rest[..cut].to_owned());
            rest = rest[cut..].trim_start();
            continue;
        }

        let cut = byte_offset(rest, room);
        let remainder = rest[cut..].trim_start();
        let mut chunk = rest[..cut].to_owned();
        if !remainder.is_empty() {
            chunk.push_str(SPLIT_MARKER);
        }
        chunks.push(chunk);
        rest = remainder;
    }

    chunks
}

/// Byte index of the `n`th character, or the string length.
fn byte_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn strip_markers(chunks: &[String]) -> String {
        chunks
            .iter()
            .map(|c| c.strip_suffix(SPLIT_MARKER).unwrap_or(c))
            .collect()
    }

    #[test]
    fn short_message_is_one_chunk() {
        assert_eq!(chunk_message("hello", 10), vec!["hello"]);
        assert_eq!(chunk_message("exactly10!", 10), vec!["exactly10!"]);
    }

    #[test]
    fn empty_message_has_no_chunks() {
        assert!(chunk_message("", 10).is_empty());
    }

    #[test]
    fn splits_at_last_line_break() {
        let chunks = chunk_message("aaaa\nbbbb\ncccc", 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn line_exactly_at_limit_is_kept_whole() {
        let line = "x".repeat(40);
        let chunks = chunk_message(&format!("{line}\nyyy"), 40);
        assert_eq!(chunks, vec![line, "yyy".to_owned()]);
    }

    #[test]
    fn long_line_is_cut_with_marker_within_limit() {
        let max = 40;
        let text = "x".repeat(100);
        let chunks = chunk_message(&text, max);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= max, "chunk too long: {chunk:?}");
        }
        assert!(chunks[0].ends_with(SPLIT_MARKER));
        assert!(!chunks.last().unwrap().ends_with(SPLIT_MARKER));
        assert_eq!(strip_markers(&chunks), text);
    }

    #[test]
    fn report_of_three_max_plus_ten_chunks_within_limit() {
        let max = 100;
        let mut text = String::new();
        let mut n = 0;
        while text.chars().count() < 3 * max + 10 {
            text.push_str(&format!("*  8/{}/2025 9:{:02}:00 AM,\n", n % 28 + 1, n % 60));
            n += 1;
        }
        let text: String = text.chars().take(3 * max + 10).collect();

        let chunks = chunk_message(&text, max);
        assert_eq!(chunks.len(), 4, "chunks: {chunks:?}");
        for chunk in &chunks {
            assert!(chunk.chars().count() <= max);
        }
        assert_eq!(
            non_whitespace(&strip_markers(&chunks)),
            non_whitespace(&text)
        );
    }

    #[test]
    fn multibyte_characters_count_as_one() {
        let text = "é".repeat(25);
        let chunks = chunk_message(&text, 25);
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn tiny_limit_still_makes_progress() {
        let chunks = chunk_message("abcdef", 3);
        assert_eq!(chunks, vec!["abc", "def"]);
    }
}
