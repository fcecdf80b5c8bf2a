//! String utility functions

/// A run of text, either plain or a matched keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub emphasis: bool,
}

impl Fragment {
    fn plain(text: String) -> Self {
        Self {
            text,
            emphasis: false,
        }
    }

    fn keyword(text: &str) -> Self {
        Self {
            text: text.to_string(),
            emphasis: true,
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split `text` into plain and keyword fragments.
///
/// Keywords match case-sensitively on word boundaries; the longest keyword
/// wins when several start at the same position (`ORDER BY` over `OR`).
/// Concatenating the fragments yields `text` unchanged.
pub fn highlight_keywords(text: &str, keywords: &[&str]) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut plain = String::new();
    let mut rest = text;
    let mut prev: Option<char> = None;

    while let Some(c) = rest.chars().next() {
        if prev.is_none_or(|p| !is_word_char(p)) {
            let matched = keywords
                .iter()
                .filter(|kw| !kw.is_empty() && rest.starts_with(**kw))
                .filter(|kw| {
                    rest[kw.len()..]
                        .chars()
                        .next()
                        .is_none_or(|next| !is_word_char(next))
                })
                .max_by_key(|kw| kw.len());

            if let Some(kw) = matched {
                if !plain.is_empty() {
                    fragments.push(Fragment::plain(std::mem::take(&mut plain)));
                }
                fragments.push(Fragment::keyword(kw));
                rest = &rest[kw.len()..];
                prev = kw.chars().last();
                continue;
            }
        }

        plain.push(c);
        rest = &rest[c.len_utf8()..];
        prev = Some(c);
    }

    if !plain.is_empty() {
        fragments.push(Fragment::plain(plain));
    }
    fragments
}
