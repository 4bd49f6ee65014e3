// src/text/mod.rs
//
// Filename-legality sanitization and search-query normalization.
// Shared by the resolution cascade (punctuation-insensitive matching)
// and the move engine (legal destination names).

/// Characters that cannot appear in a filename on at least one of the
/// supported platforms. Everything else, non-ASCII included, passes
/// through untouched.
const ILLEGAL: [char; 9] = ['\\', '/', ':', '*', '?', '<', '>', '"', '|'];

/// True when `ch` may appear in a filename
pub fn is_legal_filename_character(ch: char) -> bool {
    !ILLEGAL.contains(&ch)
}

/// Replaces characters illegal in filenames, preserving surrounding
/// whitespace. `\ / : *` become hyphens, `? < >` are dropped, `"` and
/// `|` become apostrophes. Each illegal character is replaced
/// independently so word shape survives.
pub fn replace_illegal_characters(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '/' | ':' | '*' => out.push('-'),
            '?' | '<' | '>' => {}
            '"' | '|' => out.push('\''),
            other => out.push(other),
        }
    }
    out
}

/// Trims surrounding whitespace, then replaces illegal characters.
/// Idempotent: every character it emits is legal.
pub fn sanitize_for_filename(text: &str) -> String {
    replace_illegal_characters(text.trim())
}

/// Normalizes a string for use as provider search input and for
/// punctuation-insensitive comparison:
/// lower-cased, apostrophes removed, dot-separated acronyms condensed
/// ("S.W.A.T." becomes "swat"), remaining dots and illegal characters
/// collapsed to single spaces. Parentheses and ampersands survive.
pub fn normalize_for_query(text: &str) -> String {
    let condensed: String = text
        .trim()
        .split_whitespace()
        .map(condense_acronym)
        .collect::<Vec<_>>()
        .join(" ");

    let mut out = String::with_capacity(condensed.len());
    for ch in condensed.to_lowercase().chars() {
        match ch {
            '\'' | '\u{2019}' => {}
            '.' => out.push(' '),
            c if ILLEGAL.contains(&c) => out.push(' '),
            c => out.push(c),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A token consisting solely of single letters separated by dots
/// collapses to the concatenated letters; anything else is returned
/// unchanged.
fn condense_acronym(token: &str) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    let letters: Vec<&str> = parts.iter().copied().filter(|p| !p.is_empty()).collect();
    let is_acronym = parts.len() > 1
        && letters.len() > 1
        && letters
            .iter()
            .all(|p| p.chars().count() == 1 && p.chars().all(|c| c.is_alphabetic()));
    if is_acronym {
        letters.concat()
    } else {
        token.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_each_illegal_character() {
        assert_eq!(
            sanitize_for_filename("Mission: Impossible - Fallout (2018)"),
            "Mission- Impossible - Fallout (2018)"
        );
        assert_eq!(sanitize_for_filename("a/b\\c:d*e"), "a-b-c-d-e");
        assert_eq!(sanitize_for_filename("what?<now>"), "whatnow");
        assert_eq!(sanitize_for_filename("say \"hi\"|bye"), "say 'hi''bye");
    }

    #[test]
    fn test_sanitize_trims_but_replace_does_not() {
        assert_eq!(sanitize_for_filename("  padded  "), "padded");
        assert_eq!(replace_illegal_characters("  padded  "), "  padded  ");
    }

    #[test]
    fn test_sanitize_passes_unicode_through() {
        let fancy = "Pok\u{e9}mon \u{2014} \u{201c}Journeys\u{201d}\u{2026} & more.";
        assert_eq!(sanitize_for_filename(fancy), fancy);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "Mission: Impossible - Fallout (2018)",
            "a/b\\c:d*e?f<g>h\"i|j",
            "  The X-Files  ",
            "Marvel's Agents of S.H.I.E.L.D.",
        ];
        for input in inputs {
            let once = sanitize_for_filename(input);
            assert_eq!(sanitize_for_filename(&once), once);
        }
    }

    #[test]
    fn test_legal_character_predicate() {
        for ch in ['\\', '/', ':', '*', '?', '<', '>', '"', '|'] {
            assert!(!is_legal_filename_character(ch));
        }
        for ch in ['a', 'Z', '0', '.', '&', '\'', '(', ')', '\u{e9}', '\u{2014}'] {
            assert!(is_legal_filename_character(ch));
        }
    }

    #[test]
    fn test_normalize_condenses_acronyms() {
        assert_eq!(normalize_for_query("S.W.A.T."), "swat");
        assert_eq!(
            normalize_for_query("Marvel's Agents of S.H.I.E.L.D."),
            "marvels agents of shield"
        );
        assert_eq!(normalize_for_query("Agents of SHIELD"), "agents of shield");
    }

    #[test]
    fn test_normalize_treats_dots_and_illegal_as_spaces() {
        assert_eq!(normalize_for_query("Some.Show.Name"), "some show name");
        assert_eq!(normalize_for_query("Mission: Impossible"), "mission impossible");
        assert_eq!(normalize_for_query("Who?  What"), "who what");
    }

    #[test]
    fn test_normalize_keeps_parentheses_and_ampersand() {
        assert_eq!(normalize_for_query("Law & Order (UK)"), "law & order (uk)");
    }

    #[test]
    fn test_normalize_strips_curly_apostrophes_too() {
        assert_eq!(normalize_for_query("Bob\u{2019}s Burgers"), "bobs burgers");
    }
}
