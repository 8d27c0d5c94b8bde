//! Text chunking for LINE's message size limit
//!
//! LINE rejects text messages above 5000 characters. Long model answers are
//! split into several messages, breaking on newlines where possible so that
//! paragraphs stay together.

/// Default chunk size limit, in characters
pub const DEFAULT_MAX_LEN: usize = 5000;

/// What to do with a single paragraph longer than the limit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Oversize {
    /// Hard-split the paragraph on character boundaries
    #[default]
    Split,
    /// Emit the paragraph as its own oversized chunk
    Keep,
}

/// Split `text` into chunks of at most `max_len` characters.
///
/// Oversized paragraphs are hard-split. When `max_len` is 0 the default
/// limit ([`DEFAULT_MAX_LEN`]) is used.
///
/// # Examples
///
/// ```
/// use line_relay::channels::line::chunking::chunk_text;
///
/// assert_eq!(chunk_text("short text", 5000), vec!["short text"]);
/// ```
#[must_use]
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    chunk_text_with(text, max_len, Oversize::Split)
}

/// Split `text` into chunks with an explicit oversized-paragraph policy.
///
/// Text that already fits is returned unchanged as a single chunk. Otherwise
/// paragraphs (separated by `\n`) are accumulated greedily; the separator is
/// dropped wherever a chunk is closed, so joining the chunks with `\n`
/// restores the text under [`Oversize::Keep`].
#[must_use]
pub fn chunk_text_with(text: &str, max_len: usize, oversize: Oversize) -> Vec<String> {
    let max_len = if max_len == 0 { DEFAULT_MAX_LEN } else { max_len };

    if char_len(text) <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut buf = Buffer::default();

    for paragraph in text.split('\n') {
        let para_len = char_len(paragraph);
        let needed = if buf.open {
            buf.len + 1 + para_len
        } else {
            para_len
        };

        if needed <= max_len {
            buf.append(paragraph, para_len);
            continue;
        }

        buf.flush_into(&mut chunks);

        if para_len > max_len && oversize == Oversize::Split {
            let mut pieces = hard_split(paragraph, max_len);
            if let Some(last) = pieces.pop() {
                chunks.extend(pieces);
                let last_len = char_len(&last);
                buf.append(&last, last_len);
            }
        } else {
            buf.append(paragraph, para_len);
        }
    }

    buf.flush_into(&mut chunks);
    chunks
}

/// Paragraph accumulator. `open` is set once a paragraph (possibly empty)
/// has been taken, so a following paragraph is joined with a newline.
#[derive(Default)]
struct Buffer {
    text: String,
    len: usize,
    open: bool,
}

impl Buffer {
    fn append(&mut self, paragraph: &str, para_len: usize) {
        if self.open {
            self.text.push('\n');
            self.len += 1;
        }
        self.text.push_str(paragraph);
        self.len += para_len;
        self.open = true;
    }

    fn flush_into(&mut self, chunks: &mut Vec<String>) {
        if !self.text.is_empty() {
            chunks.push(std::mem::take(&mut self.text));
        }
        self.text.clear();
        self.len = 0;
        self.open = false;
    }
}

/// Split at exact `max_len`-character boundaries
fn hard_split(text: &str, max_len: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        if count == max_len {
            pieces.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- basics ----

    #[test]
    fn short_text_is_returned_unchanged() {
        assert_eq!(chunk_text("short text", 5000), vec!["short text"]);
    }

    #[test]
    fn text_at_exact_limit_is_single_chunk() {
        let text = "x".repeat(10);
        assert_eq!(chunk_text(&text, 10), vec![text]);
    }

    #[test]
    fn empty_text_is_single_chunk() {
        assert_eq!(chunk_text("", 10), vec![String::new()]);
    }

    #[test]
    fn zero_limit_uses_default() {
        let text = "y".repeat(DEFAULT_MAX_LEN);
        assert_eq!(chunk_text(&text, 0).len(), 1);

        let longer = format!("{text}\nz");
        assert_eq!(chunk_text(&longer, 0), vec![text, "z".to_string()]);
    }

    // ---- greedy accumulation ----

    #[test]
    fn many_short_lines_are_packed() {
        let text = "a\n".repeat(4000);
        let chunks = chunk_text(&text, 10);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert!(chunks.iter().all(|c| !c.is_empty()));
        // Five "a" lines fit in 9 characters; a sixth would need 11
        assert_eq!(chunks[0], "a\na\na\na\na");

        let total: usize = chunks.iter().map(|c| c.matches('a').count()).sum();
        assert_eq!(total, 4000);
    }

    #[test]
    fn paragraphs_are_kept_together() {
        let text = "first line\nsecond line\nthird";
        let chunks = chunk_text(text, 22);
        assert_eq!(chunks, vec!["first line\nsecond line", "third"]);
    }

    #[test]
    fn keep_policy_reconstructs_input() {
        let text = "alpha\nbeta gamma\ndelta\nepsilon zeta eta\ntheta\n\niota";
        let chunks = chunk_text_with(text, 12, Oversize::Keep);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn blank_lines_inside_a_chunk_survive() {
        let text = format!("{}\nab\n\ncd", "q".repeat(8));
        let chunks = chunk_text(&text, 8);
        assert_eq!(chunks, vec!["q".repeat(8), "ab\n\ncd".to_string()]);
    }

    #[test]
    fn first_chunk_is_idempotent() {
        let text = "one two three\nfour five\nsix seven eight nine\nten";
        let chunks = chunk_text(text, 15);
        let first = &chunks[0];
        assert!(first.chars().count() <= 15);
        assert_eq!(chunk_text(first, 15), vec![first.clone()]);
    }

    // ---- oversized paragraphs ----

    #[test]
    fn oversized_paragraph_is_hard_split() {
        let text = format!("intro\n{}\nend", "x".repeat(25));
        let chunks = chunk_text(&text, 10);

        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks[0], "intro");
        assert_eq!(chunks[1], "x".repeat(10));
        assert_eq!(chunks[2], "x".repeat(10));
        // Tail of the split paragraph is packed with the next line
        assert_eq!(chunks[3], "xxxxx\nend");
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn oversized_paragraph_is_kept_when_requested() {
        let long = "x".repeat(25);
        let text = format!("intro\n{long}\noutro");
        let chunks = chunk_text_with(&text, 10, Oversize::Keep);
        assert_eq!(chunks, vec!["intro".to_string(), long, "outro".to_string()]);
    }

    // ---- character counting ----

    #[test]
    fn limit_counts_characters_not_bytes() {
        // Thai characters are 3 bytes each in UTF-8
        let line = "สวัสดี"; // 6 characters
        let text = format!("{line}\n{line}");
        assert_eq!(chunk_text(&text, 13), vec![text.clone()]);
        assert_eq!(chunk_text(&text, 12), vec![line.to_string(), line.to_string()]);
    }

    #[test]
    fn hard_split_respects_char_boundaries() {
        let text = "\u{1F600}".repeat(7);
        let chunks = chunk_text(&text, 3);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
        assert_eq!(chunks.concat(), text);
    }
}
