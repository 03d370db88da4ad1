//! Numbered-list parser for model output.
//!
//! Turns `"1. a\n2. b\n3. c"` into `["a", "b", "c"]`. Text with no digits at
//! all is taken as a single un-numbered answer.

/// Parse raw completion text into candidate replies.
///
/// - No ASCII digit anywhere: one item, the trimmed input.
/// - Otherwise each line is split at the first `". "`; the line is an item
///   only when the part before it starts with an integer (leading
///   whitespace and one sign allowed, trailing text ignored, so `3a` and
///   `1.5` count). Other lines are dropped.
///
/// Returns an empty vector when digits are present but no line qualifies.
pub fn parse(text: &str) -> Vec<String> {
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return vec![text.trim().to_string()];
    }

    text.lines()
        .filter_map(|line| {
            let (marker, item) = line.split_once(". ")?;
            leads_with_integer(marker).then(|| item.trim().to_string())
        })
        .collect()
}

fn leads_with_integer(marker: &str) -> bool {
    let marker = marker.trim_start();
    let digits = marker.strip_prefix(['+', '-']).unwrap_or(marker);
    digits.starts_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_list() {
        assert_eq!(parse("1. a\n2. b\n3. c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_no_digits_is_single_item() {
        assert_eq!(parse("no digits here"), vec!["no digits here"]);
        assert_eq!(parse("  padded answer \n"), vec!["padded answer"]);
    }

    #[test]
    fn test_non_conforming_line_dropped() {
        assert_eq!(parse("1. a\nb\n3. c"), vec!["a", "c"]);
    }

    #[test]
    fn test_digits_but_no_items_is_empty() {
        assert!(parse("I'll be there at 5").is_empty());
        assert!(parse("1) first\n2) second").is_empty());
    }

    #[test]
    fn test_splits_only_at_first_separator() {
        assert_eq!(
            parse("1. Sure. See you at 5. Bring snacks"),
            vec!["Sure. See you at 5. Bring snacks"]
        );
    }

    #[test]
    fn test_preamble_and_trailing_text_ignored() {
        let text = "Here are three options:\n\n1. yes!\n2.  sounds good  \n3. can't, sorry\n\nHope that helps.";
        assert_eq!(parse(text), vec!["yes!", "sounds good", "can't, sorry"]);
    }

    #[test]
    fn test_marker_must_start_with_integer() {
        assert_eq!(parse("a. nope\n2. yes\nStep 3. no"), vec!["yes"]);
        assert_eq!(parse(" 4. indented marker"), vec!["indented marker"]);
        assert_eq!(parse("- 1. bullet first\n-. dash"), Vec::<String>::new());
    }

    #[test]
    fn test_marker_integer_prefix_is_enough() {
        assert_eq!(
            parse("3a. suffixed\n1.5. decimal\n99999999999999999999. huge\n-2. signed"),
            vec!["suffixed", "decimal", "huge", "signed"]
        );
    }

    #[test]
    fn test_windows_line_endings() {
        assert_eq!(parse("1. a\r\n2. b\r\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(""), vec![""]);
    }
}
