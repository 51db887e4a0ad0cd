//! Inline emphasis markers for corrected spans
//!
//! Before/after sentences wrap the changed part in a `%%` pair, e.g.
//! `"I %%went%% to school"`. The marker is a storage convention, not output:
//! rendering layers restyle or strip it via this module.

/// Two-character delimiter wrapping a corrected span
pub const SPAN_MARKER: &str = "%%";

/// One piece of a sentence after marker splitting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text outside any marker pair
    Plain(&'a str),
    /// Text wrapped in a marker pair (the changed span)
    Marked(&'a str),
}

impl<'a> Segment<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            Self::Plain(text) | Self::Marked(text) => text,
        }
    }

    pub fn is_marked(&self) -> bool {
        matches!(self, Self::Marked(_))
    }
}

/// Split a sentence into plain and marked segments
///
/// An unterminated marker is not a span; the remainder stays plain,
/// marker characters included.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(SPAN_MARKER) {
        let span_start = open + SPAN_MARKER.len();
        let Some(len) = rest[span_start..].find(SPAN_MARKER) else {
            break;
        };
        if open > 0 {
            out.push(Segment::Plain(&rest[..open]));
        }
        out.push(Segment::Marked(&rest[span_start..span_start + len]));
        rest = &rest[span_start + len + SPAN_MARKER.len()..];
    }

    if !rest.is_empty() {
        out.push(Segment::Plain(rest));
    }
    out
}

/// Remove the markers, keeping the span text
pub fn strip(text: &str) -> String {
    segments(text).iter().map(Segment::text).collect()
}

/// Wrap a span in the marker pair
pub fn wrap(span: &str) -> String {
    format!("{SPAN_MARKER}{span}{SPAN_MARKER}")
}

/// The first marked span, if the sentence carries one
pub fn marked_span(text: &str) -> Option<&str> {
    segments(text)
        .into_iter()
        .find(Segment::is_marked)
        .map(|segment| segment.text())
}

/// Number of complete marker pairs in the sentence
pub fn marked_span_count(text: &str) -> usize {
    segments(text)
        .iter()
        .filter(|segment| segment.is_marked())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_around_marked_span() {
        let parts = segments("I %%went%% home");
        assert_eq!(
            parts,
            vec![
                Segment::Plain("I "),
                Segment::Marked("went"),
                Segment::Plain(" home"),
            ]
        );
    }

    #[test]
    fn test_marker_at_sentence_edges() {
        assert_eq!(segments("%%Go%% now"), vec![
            Segment::Marked("Go"),
            Segment::Plain(" now"),
        ]);
        assert_eq!(segments("go %%now%%"), vec![
            Segment::Plain("go "),
            Segment::Marked("now"),
        ]);
    }

    #[test]
    fn test_no_marker_is_one_plain_segment() {
        assert_eq!(segments("plain text"), vec![Segment::Plain("plain text")]);
    }

    #[test]
    fn test_unterminated_marker_stays_literal() {
        assert_eq!(
            segments("oops %%dangling"),
            vec![Segment::Plain("oops %%dangling")]
        );
        assert_eq!(strip("oops %%dangling"), "oops %%dangling");
    }

    #[test]
    fn test_strip_removes_markers_only() {
        assert_eq!(strip("I %%went%% to school"), "I went to school");
        assert_eq!(strip("no markers"), "no markers");
    }

    #[test]
    fn test_wrap_round_trips_through_marked_span() {
        let wrapped = wrap("went");
        assert_eq!(wrapped, "%%went%%");
        assert_eq!(marked_span(&wrapped), Some("went"));
    }

    #[test]
    fn test_span_count() {
        assert_eq!(marked_span_count("I %%went%% home"), 1);
        assert_eq!(marked_span_count("no span"), 0);
        assert_eq!(marked_span_count("%%a%% and %%b%%"), 2);
        // a dangling marker is not a span
        assert_eq!(marked_span_count("%%a"), 0);
    }
}
