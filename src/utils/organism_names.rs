//! Organism Display Cleanup
//!
//! Produces a tidy display form for a raw organism spelling. The display form
//! is what "keep as is" records and what peers see as a candidate; it never
//! changes the lookup key, which always comes from `normalize`.

const QUALIFIERS: [&str; 2] = ["possible", "suspected"];
const REPEATABLE: [&str; 2] = ["complex", "species"];

/// Clean an organism spelling for display
///
/// - hyphens and whitespace runs become single spaces
/// - `complex complex` / `species species` collapse to one word
/// - a `possible` / `suspected` qualifier moves to a `(qualifier)` suffix
/// - the genus is capitalized, the rest lowercased
pub fn clean_organism_name(text: &str) -> String {
    let lowered = text.trim().to_lowercase().replace('-', " ");
    let mut words: Vec<&str> = lowered.split_whitespace().collect();
    words.dedup_by(|next, prev| next == prev && REPEATABLE.contains(next));

    if words.is_empty() {
        return String::new();
    }

    // Already suffixed, e.g. "staph aureus (suspected)"
    if let Some(last) = words.last() {
        let inner = last.trim_start_matches('(').trim_end_matches(')');
        if last.starts_with('(') && last.ends_with(')') && QUALIFIERS.contains(&inner) {
            return capitalize_genus(&words);
        }
    }

    let mut qualifier: Option<&str> = None;
    let mut kept: Vec<&str> = Vec::with_capacity(words.len());
    for word in words {
        if QUALIFIERS.contains(&word) {
            qualifier.get_or_insert(word);
            // "a possible ..." drops the article along with the qualifier
            if kept.last() == Some(&"a") {
                kept.pop();
            }
            continue;
        }
        kept.push(word);
    }

    let base = capitalize_genus(&kept);
    match qualifier {
        Some(q) if !base.is_empty() => format!("{} ({})", base, q),
        Some(q) => format!("({})", q),
        None => base,
    }
}

fn capitalize_genus(words: &[&str]) -> String {
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            out.push(' ');
            out.push_str(word);
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalizes_genus_only() {
        assert_eq!(clean_organism_name("ESCHERICHIA COLI"), "Escherichia coli");
        assert_eq!(clean_organism_name("  klebsiella   pneumoniae "), "Klebsiella pneumoniae");
    }

    #[test]
    fn test_hyphens_become_spaces() {
        assert_eq!(clean_organism_name("Coagulase-negative staph"), "Coagulase negative staph");
    }

    #[test]
    fn test_repeated_group_words_collapse() {
        assert_eq!(
            clean_organism_name("Enterobacter cloacae complex complex"),
            "Enterobacter cloacae complex"
        );
        assert_eq!(clean_organism_name("Candida species Species"), "Candida species");
    }

    #[test]
    fn test_qualifier_moves_to_suffix() {
        assert_eq!(
            clean_organism_name("Possible Pseudomonas aeruginosa"),
            "Pseudomonas aeruginosa (possible)"
        );
        assert_eq!(
            clean_organism_name("a suspected staphylococcus aureus"),
            "Staphylococcus aureus (suspected)"
        );
    }

    #[test]
    fn test_existing_suffix_kept() {
        assert_eq!(
            clean_organism_name("staphylococcus aureus (suspected)"),
            "Staphylococcus aureus (suspected)"
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean_organism_name("   "), "");
    }
}
