use unicode_normalization::UnicodeNormalization;

/// Turn arbitrary text into a lowercase, hyphen-separated ASCII slug.
///
/// Text is NFKD-decomposed first, so accented letters keep their base letter and
/// compatibility forms such as ligatures expand. Whatever is still non-ASCII is dropped.
#[must_use]
pub fn slugify(value: &str) -> String {
    let kept: String = value
        .nfkd()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    let lowered = kept.trim().to_ascii_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut in_run = false;
    for c in lowered.chars() {
        if c == '-' || c.is_whitespace() {
            if !in_run {
                out.push('-');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}
