//! Forum reference extraction.
//!
//! Scans free-form text for `r/name` and `u/name` mentions (with or without
//! a leading slash) and returns them in order of appearance.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Leading `/` is optional; the name class may match nothing.
const REFERENCE_PATTERN: &str = r"(/)?([ru])/([a-zA-Z0-9_\-]*)";

static REFERENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(REFERENCE_PATTERN).unwrap());

/// What a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// A community, written `r/name`.
    Community,
    /// A user profile, written `u/name`.
    User,
}

impl ReferenceKind {
    /// Path segment used both in the mention and in the link.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Community => "r",
            Self::User => "u",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "r" => Some(Self::Community),
            "u" => Some(Self::User),
            _ => None,
        }
    }
}

/// A community or user mention found in a message.
///
/// `name` may be empty when nothing valid follows the slash (`"/r/"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForumReference {
    pub kind: ReferenceKind,
    pub name: String,
}

impl ForumReference {
    pub fn new(kind: ReferenceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn community(name: impl Into<String>) -> Self {
        Self::new(ReferenceKind::Community, name)
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self::new(ReferenceKind::User, name)
    }

    /// Canonical link, e.g. `https://reddit.com/r/rust`.
    pub fn url(&self) -> String {
        format!("https://reddit.com/{}/{}", self.kind.prefix(), self.name)
    }
}

/// Renders as the normalised mention, e.g. `/u/spez`.
impl fmt::Display for ForumReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.kind.prefix(), self.name)
    }
}

/// Extract every forum reference in `text`, left to right.
///
/// Matches never overlap and duplicates are kept. Mentions are not required
/// to start at a word boundary, so `color/blue` yields community `blue`.
pub fn extract(text: &str) -> Vec<ForumReference> {
    REFERENCE_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let kind = ReferenceKind::from_prefix(caps.get(2)?.as_str())?;
            let name = caps.get(3).map_or("", |m| m.as_str());
            Some(ForumReference::new(kind, name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_match_returns_empty() {
        for text in [
            "",
            "hello world",
            "r u there?",
            "/x/foo",
            "R/rust",
            "U/someone",
            "path\\r\\foo",
        ] {
            assert!(extract(text).is_empty(), "unexpected match in {text:?}");
        }
    }

    #[test]
    fn single_community() {
        assert_eq!(extract("/r/golang"), vec![ForumReference::community("golang")]);
    }

    #[test]
    fn single_user_without_leading_slash() {
        assert_eq!(extract("ask u/spez"), vec![ForumReference::user("spez")]);
    }

    #[test]
    fn order_follows_text() {
        assert_eq!(
            extract("/r/foo and /u/bar"),
            vec![ForumReference::community("foo"), ForumReference::user("bar")]
        );
    }

    #[test]
    fn duplicates_are_kept() {
        assert_eq!(
            extract("r/rust r/rust /r/rust"),
            vec![
                ForumReference::community("rust"),
                ForumReference::community("rust"),
                ForumReference::community("rust"),
            ]
        );
    }

    #[test]
    fn empty_name_passes_through() {
        assert_eq!(extract("/r/"), vec![ForumReference::community("")]);
        assert_eq!(extract("u/!"), vec![ForumReference::user("")]);
    }

    #[test]
    fn name_stops_at_first_invalid_char() {
        assert_eq!(
            extract("see /r/rust_lang-dev2.0, please"),
            vec![ForumReference::community("rust_lang-dev2")]
        );
    }

    #[test]
    fn name_is_ascii_only() {
        assert_eq!(extract("/r/café"), vec![ForumReference::community("caf")]);
    }

    #[test]
    fn adjacent_references_do_not_overlap() {
        assert_eq!(
            extract("/r/foo/r/bar"),
            vec![ForumReference::community("foo"), ForumReference::community("bar")]
        );
    }

    #[test]
    fn no_word_boundary_required() {
        assert_eq!(extract("color/blue"), vec![ForumReference::community("blue")]);
        assert_eq!(extract("menu/main"), vec![ForumReference::user("main")]);
    }

    #[test]
    fn mention_inside_url() {
        assert_eq!(
            extract("https://reddit.com/r/rust/comments/abc"),
            vec![ForumReference::community("rust")]
        );
    }

    #[test]
    fn multiline_text() {
        assert_eq!(
            extract("first r/one\nsecond u/two\n"),
            vec![ForumReference::community("one"), ForumReference::user("two")]
        );
    }

    #[test]
    fn extract_is_pure() {
        let text = "r/a u/b /r/ r/c";
        assert_eq!(extract(text), extract(text));
    }

    #[test]
    fn display_and_url() {
        let r = ForumReference::community("rust");
        assert_eq!(r.to_string(), "/r/rust");
        assert_eq!(r.url(), "https://reddit.com/r/rust");

        let u = ForumReference::user("");
        assert_eq!(u.to_string(), "/u/");
        assert_eq!(u.url(), "https://reddit.com/u/");
    }
}
