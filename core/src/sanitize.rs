//! Removal of code-fence wrapping from model answers.

const FENCE: &str = "```";

/// Language tags recognised after an opening fence. An empty tag stands for a
/// bare fence on its own line.
const RECOGNIZED_TAGS: &[&str] = &["python", "pdb", "plaintext", "bash", "text", "json", ""];

/// Strips a code fence the model may have wrapped around its answer.
///
/// A recognised opening fence is removed together with the last closing
/// fence found in the text, if there is one. Without a recognised opening,
/// only a trailing fence is removed. The result is always trimmed.
///
/// Stripping repeats until nothing changes, so stacked fences are all removed
/// and `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(raw: &str) -> String {
    let mut current = strip_once(raw);
    loop {
        // Every change removes characters, so this terminates.
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_once(raw: &str) -> String {
    let text = raw.trim();

    if let Some(body) = strip_opening_fence(text) {
        let body = match body.rfind(FENCE) {
            Some(end) => &body[..end],
            None => body,
        };
        return body.trim().to_string();
    }

    match text.strip_suffix(FENCE) {
        Some(body) => body.trim().to_string(),
        None => text.to_string(),
    }
}

/// Returns the text after ```` ```tag ```` when `tag` is recognised.
fn strip_opening_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(FENCE)?;
    RECOGNIZED_TAGS.iter().find_map(|tag| {
        let head = rest.get(..tag.len())?;
        if !head.eq_ignore_ascii_case(tag) {
            return None;
        }
        let after = &rest[tag.len()..];
        // The tag must end at a line break; "```pythonic" is not "```python".
        // A bare fence additionally needs the break, or it would match any tag.
        match after.chars().next() {
            Some(c) if c.is_whitespace() => Some(after),
            None if !tag.is_empty() => Some(after),
            _ => None,
        }
    })
}
