//! Tag formatting shared by the adapters

/// Longest topic tag Threads accepts
pub const MAX_TOPIC_TAG_CHARS: usize = 50;

/// Tag with whitespace and a leading `#` removed; `None` when nothing is left
pub fn normalize(tag: &str) -> Option<String> {
    let cleaned: String = tag
        .trim()
        .trim_start_matches('#')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// `#a #b #c`, or `None` when there are no usable tags
pub fn hashtag_line(tags: &[String]) -> Option<String> {
    let line = tags
        .iter()
        .filter_map(|t| normalize(t))
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(" ");
    (!line.is_empty()).then_some(line)
}

/// Text followed by a blank line and the hashtags
pub fn append_hashtags(text: &str, tags: &[String]) -> String {
    let text = text.trim_end();
    match hashtag_line(tags) {
        Some(line) if text.is_empty() => line,
        Some(line) => format!("{}\n\n{}", text, line),
        None => text.to_string(),
    }
}

/// Threads topic tag derived from the first tag
///
/// Punctuation `.&@!?,;:` is stripped, purely numeric tags are dropped and
/// anything longer than [`MAX_TOPIC_TAG_CHARS`] is cut at the last space
/// inside the limit.
pub fn topic_tag(tags: &[String]) -> Option<String> {
    let first = tags.first()?;
    let cleaned: String = first
        .chars()
        .filter(|c| !matches!(c, '.' | '&' | '@' | '!' | '?' | ',' | ';' | ':'))
        .collect();
    if cleaned.trim().is_empty() || is_numeric(&cleaned) {
        return None;
    }

    let topic = if cleaned.chars().count() > MAX_TOPIC_TAG_CHARS {
        let truncated: String = cleaned.chars().take(MAX_TOPIC_TAG_CHARS).collect();
        match truncated.rfind(' ') {
            Some(idx) if idx > 0 => truncated[..idx].to_string(),
            _ => truncated,
        }
    } else {
        cleaned
    };

    let topic = topic.trim();
    (!topic.is_empty()).then(|| topic.to_string())
}

fn is_numeric(tag: &str) -> bool {
    let compact: String = tag.chars().filter(|c| *c != ' ').collect();
    compact.parse::<f64>().is_ok_and(|n| !n.is_nan())
}
