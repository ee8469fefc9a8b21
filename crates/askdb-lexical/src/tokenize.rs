//! Shared tokenizer for the index and query sides.
//!
//! Case-folds and splits on any non-alphanumeric character. The exact same
//! function runs at build and query time; the two sides drifting apart
//! degrades ranking silently.

pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}
