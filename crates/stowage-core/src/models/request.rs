use serde::{Deserialize, Serialize};

use super::{normalize_tags, null_as_default};

/// Lookup request consumed from the file-request queue.
///
/// `name` is a substring filter and `tags` a conjunctive tag filter; an empty value
/// means "no filter". Producers are expected to send at least one non-empty filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

impl FileRequest {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
        }
    }

    pub fn by_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: String::new(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Substring filter, if one was given
    pub fn name_filter(&self) -> Option<&str> {
        if self.name.is_empty() {
            None
        } else {
            Some(&self.name)
        }
    }

    /// Requested tags, trimmed and deduplicated. A request built from splitting an
    /// empty string (`[""]`) has no tag filter.
    pub fn tag_filter(&self) -> Vec<String> {
        normalize_tags(&self.tags)
    }

    pub fn is_unfiltered(&self) -> bool {
        self.name_filter().is_none() && self.tag_filter().is_empty()
    }
}
