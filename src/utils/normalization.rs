//! Text Normalization Utilities
//!
//! Deterministic key derivation and multi-value cell splitting.
//!
//! `normalize` is idempotent: `normalize(normalize(x)) == normalize(x)`.

use smallvec::SmallVec;

/// Derive the lookup key for a raw value
///
/// Case-folds, trims and collapses internal whitespace to single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trim and collapse whitespace, keeping case
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Genus key: leading whitespace-delimited field of a normalized key
pub fn genus_of(key: &str) -> &str {
    key.split(' ').next().unwrap_or("")
}

/// One delimiter-separated segment of a cell
///
/// `leading` and `trailing` hold the whitespace around the value so a
/// rewritten cell keeps the original spacing around each delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub leading: &'a str,
    pub value: &'a str,
    pub trailing: &'a str,
    pub index: usize,
}

impl<'a> Segment<'a> {
    fn from_raw(raw: &'a str, index: usize) -> Self {
        let start_trimmed = raw.trim_start();
        let leading = &raw[..raw.len() - start_trimmed.len()];
        let value = start_trimmed.trim_end();
        let trailing = &start_trimmed[value.len()..];
        Segment { leading, value, trailing, index }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Most cells list fewer than 8 organisms
pub type Segments<'a> = SmallVec<[Segment<'a>; 8]>;

/// Split a cell on `delimiter`, preserving order and surrounding whitespace
///
/// Empty segments are returned (flagged by `is_empty`) so callers can record
/// an `EmptyToken` warning with the correct position.
pub fn split(cell: &str, delimiter: char) -> Segments<'_> {
    cell.split(delimiter)
        .enumerate()
        .map(|(index, raw)| Segment::from_raw(raw, index))
        .collect()
}

/// Rebuild a cell from segments and replacement values
///
/// Empty segments are dropped; the others keep their original spacing.
pub fn rejoin<'a, I>(segments: &[Segment<'_>], replacements: I, delimiter: char) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut replacements = replacements.into_iter();
    let mut parts: Vec<String> = Vec::with_capacity(segments.len());

    for segment in segments.iter().filter(|s| !s.is_empty()) {
        let value = replacements.next().unwrap_or(segment.value);
        parts.push(format!("{}{}{}", segment.leading, value, segment.trailing));
    }

    // Strip the outer whitespace of the whole cell, keep the inner spacing
    parts.join(&delimiter.to_string()).trim().to_string()
}

/// Split a clinic cell into (location, department) on its last word
///
/// Returns `None` for single-word cells, which have no department.
pub fn split_department(cell: &str) -> Option<(&str, &str)> {
    let trimmed = cell.trim();
    let cut = trimmed.rfind(char::is_whitespace)?;
    let location = trimmed[..cut].trim_end();
    let department = trimmed[cut..].trim_start();
    if location.is_empty() || department.is_empty() {
        return None;
    }
    Some((location, department))
}
