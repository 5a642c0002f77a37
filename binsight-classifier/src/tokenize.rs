//! Word splitting and light stemming shared by training and classification.

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by",
    "for", "from", "has", "have", "in", "into", "is", "it", "its", "of", "off", "on", "or",
    "some", "than", "that", "the", "their", "there", "these", "this", "those", "to", "too", "was",
    "were", "what", "which", "with",
];

/// Split `text` into lowercase, stop-word free, stemmed tokens.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .map(|word| stem(&word))
        .collect()
}

/// Reduce common English plural forms to their singular.
fn stem(word: &str) -> String {
    if word.chars().count() <= 3 {
        return word.to_owned();
    }

    if let Some(base) = word.strip_suffix("ies") {
        return format!("{base}y");
    }

    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_owned();
    }

    if let Some(base) = word.strip_suffix("es")
        && (base.ends_with(['s', 'x', 'z']) || base.ends_with("ch") || base.ends_with("sh"))
    {
        return base.to_owned();
    }

    word.strip_suffix('s').unwrap_or(word).to_owned()
}
