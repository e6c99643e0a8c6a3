use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::util::validation::is_valid_id;

/// A post together with every comment it owns.
///
/// This is the only aggregate the service knows about: it is
/// written as a whole, read as a whole and deleted as a whole.
/// Field names on the wire are upper-case (`UUID`, `Title`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Post {
    #[serde(rename = "UUID")]
    pub id: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Likes", default)]
    pub likes: u32,
    #[serde(rename = "Comments", default)]
    pub comments: Vec<Comment>,
}

/// A comment owned by exactly one [`Post`].
///
/// The owning post is implied by where the comment lives in the
/// aggregate so it is not part of the wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Comment {
    #[serde(rename = "UUID")]
    pub id: String,
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "Likes", default)]
    pub likes: u32,
}

/// Identifier of a post taken from a request path.
///
/// It can only be obtained through [`PostId::parse`], so holding one
/// means the value has the 8 character lowercase alphanumeric shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostId(String);

impl PostId {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        is_valid_id(value).then(|| Self(value.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PostId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
