//! Label → id slugs for newly created cards.

/// Hebrew maqaf, used as a word joiner in Hebrew labels.
const MAQAF: char = '\u{05BE}';
/// Used when a label has no word characters at all; an empty id is unusable.
const FALLBACK_SLUG: &str = "item";

/// Lowercase `label` and reduce it to word characters (letters and digits
/// of any script, plus `_`) joined by single hyphens. Other punctuation is
/// dropped.
#[must_use]
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_hyphen = false;

    for ch in label.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || matches!(ch, '-' | MAQAF) {
            pending_hyphen = true;
        } else if ch.is_alphanumeric() || ch == '_' {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        }
    }

    if slug.is_empty() { FALLBACK_SLUG.to_owned() } else { slug }
}
