//! Head-and-tail truncation of oversized tool output.

/// Shorten `content` to at most `threshold` kept characters.
///
/// Content at or below the threshold is returned unchanged. Longer content
/// keeps `threshold / 2` leading and `threshold - threshold / 2` trailing
/// characters around a marker naming how many characters were dropped.
pub fn truncate_output(content: &str, threshold: usize) -> String {
    let total = content.chars().count();
    if total <= threshold {
        return content.to_string();
    }

    let head = threshold / 2;
    let tail = threshold - head;
    let omitted = total - head - tail;

    let head_end = byte_offset(content, head);
    let tail_start = byte_offset(content, total - tail);

    let mut out = String::with_capacity(head_end + (content.len() - tail_start) + 48);
    out.push_str(&content[..head_end]);
    out.push_str(&format!("\n\n... [omitted {omitted} characters] ...\n\n"));
    out.push_str(&content[tail_start..]);
    out
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_is_untouched() {
        assert_eq!(truncate_output("hello", 5), "hello");
        assert_eq!(truncate_output("", 0), "");
    }

    #[test]
    fn long_content_keeps_head_and_tail() {
        let content = format!("{}{}{}", "a".repeat(10), "m".repeat(100), "z".repeat(10));
        let out = truncate_output(&content, 20);
        assert!(out.starts_with(&"a".repeat(10)));
        assert!(out.ends_with(&"z".repeat(10)));
        assert!(out.contains("[omitted 100 characters]"));
    }

    #[test]
    fn odd_threshold_gives_extra_char_to_tail() {
        let out = truncate_output("0123456789", 5);
        assert_eq!(out, "01\n\n... [omitted 5 characters] ...\n\n789");
    }

    #[test]
    fn counts_characters_not_bytes() {
        let content = "é".repeat(8);
        assert_eq!(truncate_output(&content, 8), content);
        let out = truncate_output(&content, 4);
        assert!(out.starts_with("éé\n"));
        assert!(out.ends_with("\néé"));
        assert!(out.contains("[omitted 4 characters]"));
    }
}
