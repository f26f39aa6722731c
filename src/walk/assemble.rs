//! Assembles a walk's resolved token texts into a single line of prose.

/// Concatenate token texts, capitalizing the first, gluing punctuation
/// without a leading space, and appending a terminal period if none of
/// `.!?` already ends the string.
pub fn assemble_text(tokens: &[String]) -> String {
    let mut out = String::new();
    for token in tokens {
        if token.is_empty() {
            continue;
        }
        let is_punct = token.chars().all(|c| c.is_ascii_punctuation());
        if !out.is_empty() && !is_punct {
            out.push(' ');
        }
        out.push_str(token);
    }

    if out.is_empty() {
        return out;
    }

    if let Some(first) = out.get(0..1) {
        out.replace_range(0..1, &first.to_uppercase());
    }

    if !out.ends_with(['.', '!', '?']) {
        out.push('.');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn capitalizes_first_word() {
        assert_eq!(assemble_text(&tokens(&["cat", "sat"])), "Cat sat.");
    }

    #[test]
    fn glues_punctuation_without_leading_space() {
        assert_eq!(assemble_text(&tokens(&["hello", ",", "world"])), "Hello, world.");
    }

    #[test]
    fn does_not_double_terminal_punctuation() {
        assert_eq!(assemble_text(&tokens(&["are", "you", "ok", "?"])), "Are you ok?");
    }

    #[test]
    fn empty_input_yields_empty_string() {
        assert_eq!(assemble_text(&[]), "");
    }
}
