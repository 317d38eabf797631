//! Escape tables for template output.
//!
//! Each dialect lists its own escape character first. Escaping is a single
//! left-to-right pass over the input, so a sequence produced for one character is
//! never rescanned and rewritten by a later entry.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// LaTeX reserved characters and their literal-safe replacements.
pub const LATEX_ESCAPES: [(char, &str); 10] = [
    ('\\', "\\textbackslash{}"),
    ('{', "\\{"),
    ('}', "\\}"),
    ('$', "\\$"),
    ('&', "\\&"),
    ('%', "\\%"),
    ('#', "\\#"),
    ('^', "\\textasciicircum{}"),
    ('_', "\\_"),
    ('~', "\\textasciitilde{}"),
];

/// HTML reserved characters and their entity replacements.
pub const HTML_ESCAPES: [(char, &str); 5] = [
    ('&', "&amp;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&quot;"),
    ('\'', "&#39;"),
];

/// Target document format of a template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Latex,
    Html,
}

impl Dialect {
    pub fn table(self) -> &'static [(char, &'static str)] {
        match self {
            Dialect::Latex => &LATEX_ESCAPES,
            Dialect::Html => &HTML_ESCAPES,
        }
    }

    /// Replaces every reserved character in `input`. Borrows when nothing needs escaping.
    pub fn escape<'a>(self, input: &'a str) -> Cow<'a, str> {
        let table = self.table();
        let lookup = |c: char| table.iter().find(|(r, _)| *r == c).map(|(_, rep)| *rep);

        let Some(first) = input.find(|c: char| lookup(c).is_some()) else {
            return Cow::Borrowed(input);
        };

        let mut out = String::with_capacity(input.len() + 16);
        out.push_str(&input[..first]);
        for c in input[first..].chars() {
            match lookup(c) {
                Some(rep) => out.push_str(rep),
                None => out.push(c),
            }
        }
        Cow::Owned(out)
    }
}

/// Escapes a string for HTML text and attribute values.
pub fn escape_html(input: &str) -> Cow<'_, str> {
    Dialect::Html.escape(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn escape_latex(input: &str) -> Cow<'_, str> {
        Dialect::Latex.escape(input)
    }

    /// Consumes `output` as a sequence of escape sequences and plain characters.
    /// Returns the first reserved character found outside an escape sequence.
    fn first_raw_reserved(output: &str, dialect: Dialect) -> Option<char> {
        let table = dialect.table();
        let mut rest = output;
        while let Some(c) = rest.chars().next() {
            if let Some((_, rep)) = table.iter().find(|(_, rep)| rest.starts_with(rep)) {
                rest = &rest[rep.len()..];
                continue;
            }
            if table.iter().any(|(r, _)| *r == c) {
                return Some(c);
            }
            rest = &rest[c.len_utf8()..];
        }
        None
    }

    #[test]
    fn test_plain_text_is_borrowed() {
        assert!(matches!(escape_latex("Plain text 123"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_each_latex_reserved_char() {
        for (c, rep) in LATEX_ESCAPES {
            assert_eq!(escape_latex(&c.to_string()), rep, "escaping {c:?}");
        }
    }

    #[test]
    fn test_ampersand_in_context() {
        assert_eq!(escape_latex("A&B"), "A\\&B");
        assert_eq!(escape_latex("100% of $5"), "100\\% of \\$5");
    }

    #[test]
    fn test_backslash_then_brace_is_not_corrupted() {
        assert_eq!(escape_latex("\\{"), "\\textbackslash{}\\{");
    }

    #[test]
    fn test_already_escaped_input_is_escaped_again_literally() {
        // Input is user text, not LaTeX: "\&" must print as a backslash and an ampersand.
        assert_eq!(escape_latex("\\&"), "\\textbackslash{}\\&");
    }

    /// Text dense in reserved characters of both dialects, mixed with multi-byte glyphs.
    fn hostile_text() -> impl Strategy<Value = String> {
        let alphabet: Vec<char> = "\\{}$&%#^_~<>\"' ab-é東–".chars().collect();
        prop::collection::vec(prop::sample::select(alphabet), 0..48)
            .prop_map(|chars| chars.into_iter().collect())
    }

    /// Inverse of `escape`, used to check that escaping loses nothing.
    fn unescape(output: &str, dialect: Dialect) -> String {
        let table = dialect.table();
        let mut out = String::new();
        let mut rest = output;
        while let Some(c) = rest.chars().next() {
            if let Some((raw, rep)) = table.iter().find(|(_, rep)| rest.starts_with(rep)) {
                out.push(*raw);
                rest = &rest[rep.len()..];
            } else {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
        out
    }

    proptest! {
        #[test]
        fn test_no_raw_latex_reserved_chars_survive(input in hostile_text()) {
            let out = escape_latex(&input);
            prop_assert_eq!(first_raw_reserved(&out, Dialect::Latex), None);
            prop_assert_eq!(unescape(&out, Dialect::Latex), input.clone());
        }

        #[test]
        fn test_no_raw_html_reserved_chars_survive(input in hostile_text()) {
            let out = escape_html(&input);
            prop_assert_eq!(first_raw_reserved(&out, Dialect::Html), None);
            prop_assert_eq!(unescape(&out, Dialect::Html), input.clone());
        }

        #[test]
        fn test_arbitrary_unicode_is_escaped(input in any::<String>()) {
            prop_assert_eq!(first_raw_reserved(&escape_latex(&input), Dialect::Latex), None);
            prop_assert_eq!(first_raw_reserved(&escape_html(&input), Dialect::Html), None);
        }
    }

    #[test]
    fn test_html_escape_ampersand_first() {
        assert_eq!(escape_html("<b>&amp;</b>"), "&lt;b&gt;&amp;amp;&lt;/b&gt;");
        assert_eq!(escape_html("O'Neil \"Q\""), "O&#39;Neil &quot;Q&quot;");
        assert_eq!(first_raw_reserved(&escape_html("<&>\"'"), Dialect::Html), None);
    }

    #[test]
    fn test_unicode_passes_through() {
        assert_eq!(escape_latex("Zoë – 東京 & co"), "Zoë – 東京 \\& co");
    }
}
