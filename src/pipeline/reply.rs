//! Reply text rendering.

use std::fmt::Write;

use crate::pipeline::extract::ForumReference;

/// One line per reference, `/<k>/<name>: https://reddit.com/<k>/<name>`,
/// each terminated by `\n`. Order and duplicates are preserved.
///
/// Returns `None` when there is nothing to link.
pub fn format_reply(references: &[ForumReference]) -> Option<String> {
    if references.is_empty() {
        return None;
    }

    let mut text = String::new();
    for reference in references {
        // Writing to a String cannot fail.
        let _ = writeln!(text, "{}: {}", reference, reference.url());
    }
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_reply() {
        assert_eq!(format_reply(&[]), None);
    }

    #[test]
    fn single_line() {
        assert_eq!(
            format_reply(&[ForumReference::community("programming")]).as_deref(),
            Some("/r/programming: https://reddit.com/r/programming\n")
        );
    }

    #[test]
    fn lines_in_order_with_duplicates() {
        let refs = [
            ForumReference::user("bar"),
            ForumReference::community("foo"),
            ForumReference::user("bar"),
        ];
        assert_eq!(
            format_reply(&refs).as_deref(),
            Some(
                "/u/bar: https://reddit.com/u/bar\n\
                 /r/foo: https://reddit.com/r/foo\n\
                 /u/bar: https://reddit.com/u/bar\n"
            )
        );
    }

    #[test]
    fn empty_name_still_formats() {
        assert_eq!(
            format_reply(&[ForumReference::community("")]).as_deref(),
            Some("/r/: https://reddit.com/r/\n")
        );
    }
}
