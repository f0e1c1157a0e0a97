//! Provenance tags: the `<kind|identifier>` line that opens every chunk.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::SourceUrls;

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^|>]+)\|([^>]+)>").expect("tag pattern is valid"));

/// Origin kind of a chunk section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    OriginalPost,
    Reply,
    CourseContent,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::OriginalPost => "original_post",
            SourceKind::Reply => "reply",
            SourceKind::CourseContent => "course-content",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original_post" => Ok(SourceKind::OriginalPost),
            "reply" => Ok(SourceKind::Reply),
            "course-content" => Ok(SourceKind::CourseContent),
            _ => Err(()),
        }
    }
}

/// A parsed provenance tag: origin kind plus forum-relative or document
/// identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceTag {
    pub kind: SourceKind,
    pub id: String,
}

impl SourceTag {
    pub fn new(kind: SourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// The fully qualified URL this tag points at.
    pub fn url(&self, urls: &SourceUrls) -> String {
        match self.kind {
            SourceKind::OriginalPost | SourceKind::Reply => {
                format!("{}/t/{}", urls.forum_base, self.id)
            }
            SourceKind::CourseContent => format!("{}{}", urls.course_base, self.id),
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}|{}>", self.kind, self.id)
    }
}

/// Extracts every provenance tag appearing anywhere in `text`, in order.
/// Tags with an unknown kind are ignored.
pub fn extract_tags(text: &str) -> Vec<SourceTag> {
    TAG_PATTERN
        .captures_iter(text)
        .filter_map(|captures| {
            let kind = captures[1].parse::<SourceKind>().ok()?;
            Some(SourceTag::new(kind, &captures[2]))
        })
        .collect()
}

/// The `|`-joined source string for a chunk: one fully qualified URL per
/// provenance tag in the chunk's text, in order of appearance.
pub fn source_urls(text: &str, urls: &SourceUrls) -> String {
    extract_tags(text)
        .iter()
        .map(|tag| tag.url(urls))
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> SourceUrls {
        SourceUrls {
            forum_base: "https://forum.example.com".to_string(),
            course_base: "https://course.example.com/#/".to_string(),
        }
    }

    #[test]
    fn tag_renders_in_angle_pipe_form() {
        let tag = SourceTag::new(SourceKind::OriginalPost, "171/1");
        assert_eq!(tag.to_string(), "<original_post|171/1>");
    }

    #[test]
    fn extract_finds_all_tags_in_order() {
        let text = "<original_post|171/1>\nquestion\n<reply|171/2>\nanswer\n<reply|171/5>\nmore";
        let tags = extract_tags(text);
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].kind, SourceKind::OriginalPost);
        assert_eq!(tags[2].id, "171/5");
    }

    #[test]
    fn extract_skips_unknown_kinds() {
        let tags = extract_tags("<mystery|a/b>\n<reply|1/2>");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].kind, SourceKind::Reply);
    }

    #[test]
    fn source_urls_join_with_pipe() {
        let text = "<original_post|171/1>\nq\n<course-content|docker>";
        assert_eq!(
            source_urls(text, &urls()),
            "https://forum.example.com/t/171/1|https://course.example.com/#/docker"
        );
    }
}
