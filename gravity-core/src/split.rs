//! Bounded-size fragment splitting for long model responses.
//!
//! Telegram rejects messages above its size cap, so long answers are cut
//! into fragments at newline boundaries, falling back to a hard cut when a
//! fragment-sized window contains no newline at all. A fragment that opens
//! a code fence without closing it would break rendering for that whole
//! message, so any fragment with an odd number of ``` delimiters gets a
//! closing fence appended before emission. The matching reopening at the
//! start of the next fragment is not attempted; highlight continuity across
//! fragment boundaries is a known limitation.

const FENCE: &str = "```";

/// Room reserved inside `limit` for an appended closing fence.
const REPAIR_RESERVE: usize = FENCE.len() + 1;

/// Split `text` into an ordered sequence of fragments, each at most
/// `limit` bytes, safe to send individually.
///
/// Pure and total: the same input always yields the same output, and no
/// input panics. Text short enough to fit is returned as a single
/// unmodified fragment.
pub fn split_chunks(text: &str, limit: usize) -> Vec<String> {
    if limit == 0 || text.is_empty() {
        return vec![text.to_string()];
    }
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    // Cut below the limit so the repair token never pushes a fragment over
    let budget = limit.saturating_sub(REPAIR_RESERVE).max(1);

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= budget {
            chunks.push(close_unbalanced_fence(remaining.to_string()));
            break;
        }

        let window_end = floor_char_boundary(remaining, budget);
        let window = &remaining[..window_end];

        let cut = match window.rfind('\n') {
            // Keep the newline with the emitted fragment
            Some(pos) => pos + 1,
            // No newline in the window: hard cut, may split mid-word
            None => window_end,
        };

        // A window smaller than one character would make no progress;
        // emit that character whole even though it exceeds the limit
        let cut = if cut == 0 {
            remaining
                .char_indices()
                .nth(1)
                .map_or(remaining.len(), |(i, _)| i)
        } else {
            cut
        };

        chunks.push(close_unbalanced_fence(remaining[..cut].to_string()));
        remaining = &remaining[cut..];
    }

    chunks
}

/// Append a closing fence when a fragment opens a code block it never
/// closes. The count is of non-overlapping ``` occurrences; an odd count
/// means the fragment ends inside a code block.
fn close_unbalanced_fence(mut fragment: String) -> String {
    if fragment.matches(FENCE).count() % 2 == 1 {
        if !fragment.ends_with('\n') {
            fragment.push('\n');
        }
        fragment.push_str(FENCE);
    }
    fragment
}

/// Largest index `<= at` that lies on a char boundary of `s`.
fn floor_char_boundary(s: &str, at: usize) -> usize {
    if at >= s.len() {
        return s.len();
    }
    let mut i = at;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
