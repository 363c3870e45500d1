//! Story attributes that can be exposed to the model.
//!
//! Each attribute name maps to a typed accessor on [`Story`]; names outside
//! the registry are rejected instead of silently serialising as null.

use serde::Serialize;
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::error::PlaygroundError;
use crate::models::Story;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryAttribute {
    Title,
    Text,
    PublishedAt,
    Publication,
    Author,
    #[serde(rename = "type")]
    Type,
    Classification,
}

/// UI listing entry: attribute name and whether it is selected by default.
#[derive(Debug, Clone, Serialize)]
pub struct AttributeOption {
    pub name: &'static str,
    pub default: bool,
}

pub const ALL_ATTRIBUTES: [StoryAttribute; 7] = [
    StoryAttribute::Title,
    StoryAttribute::Text,
    StoryAttribute::PublishedAt,
    StoryAttribute::Publication,
    StoryAttribute::Author,
    StoryAttribute::Type,
    StoryAttribute::Classification,
];

impl StoryAttribute {
    pub fn name(&self) -> &'static str {
        match self {
            StoryAttribute::Title => "title",
            StoryAttribute::Text => "text",
            StoryAttribute::PublishedAt => "published_at",
            StoryAttribute::Publication => "publication",
            StoryAttribute::Author => "author",
            StoryAttribute::Type => "type",
            StoryAttribute::Classification => "classification",
        }
    }

    /// Title and text are pre-selected in the rank playground.
    pub fn is_default(&self) -> bool {
        matches!(self, StoryAttribute::Title | StoryAttribute::Text)
    }

    /// Read this attribute off a story. Timestamps are ISO-8601 strings.
    pub fn value(&self, story: &Story) -> Value {
        match self {
            StoryAttribute::Title => Value::String(story.title.clone()),
            StoryAttribute::Text => Value::String(story.text.clone()),
            StoryAttribute::PublishedAt => story
                .published_at
                .map(|ts| Value::String(ts.to_rfc3339()))
                .unwrap_or(Value::Null),
            StoryAttribute::Publication => optional(&story.publication),
            StoryAttribute::Author => optional(&story.author),
            StoryAttribute::Type => optional(&story.story_type),
            StoryAttribute::Classification => optional(&story.classification),
        }
    }
}

fn optional(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

impl FromStr for StoryAttribute {
    type Err = PlaygroundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_ATTRIBUTES
            .iter()
            .copied()
            .find(|attr| attr.name() == s)
            .ok_or_else(|| PlaygroundError::UnknownAttribute(s.to_string()))
    }
}

/// Parse a list of attribute names, failing on the first unknown one.
pub fn parse_attributes(names: &[String]) -> Result<Vec<StoryAttribute>, PlaygroundError> {
    names.iter().map(|n| n.parse()).collect()
}

/// Attributes used when a request selects none.
pub fn default_attributes() -> Vec<StoryAttribute> {
    ALL_ATTRIBUTES
        .iter()
        .copied()
        .filter(StoryAttribute::is_default)
        .collect()
}

/// The listing shown to operators when choosing attributes.
pub fn attribute_options() -> Vec<AttributeOption> {
    ALL_ATTRIBUTES
        .iter()
        .map(|attr| AttributeOption {
            name: attr.name(),
            default: attr.is_default(),
        })
        .collect()
}

/// Build the reduced JSON payload sent to the model for one story.
pub fn story_payload(story: &Story, attributes: &[StoryAttribute]) -> Map<String, Value> {
    attributes
        .iter()
        .map(|attr| (attr.name().to_string(), attr.value(story)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn story() -> Story {
        Story {
            id: "a".to_string(),
            title: "Flood warning issued".to_string(),
            text: "Residents were told to move.".to_string(),
            published_at: Some(Utc.with_ymd_and_hms(2024, 9, 2, 6, 30, 0).unwrap()),
            publication: Some("Riverside Gazette".to_string()),
            author: None,
            story_type: Some("ARTICLE".to_string()),
            classification: None,
            similarity_score: 0.0,
            position: 1,
        }
    }

    #[test]
    fn test_parse_known_attributes() {
        let names = vec!["title".to_string(), "published_at".to_string(), "type".to_string()];
        let attrs = parse_attributes(&names).unwrap();
        assert_eq!(
            attrs,
            vec![
                StoryAttribute::Title,
                StoryAttribute::PublishedAt,
                StoryAttribute::Type
            ]
        );
    }

    #[test]
    fn test_unknown_attribute_is_rejected() {
        let names = vec!["title".to_string(), "word_count".to_string()];
        let err = parse_attributes(&names).unwrap_err();
        assert!(matches!(err, PlaygroundError::UnknownAttribute(ref n) if n == "word_count"));
    }

    #[test]
    fn test_timestamp_serialized_as_iso8601() {
        let value = StoryAttribute::PublishedAt.value(&story());
        assert_eq!(value, Value::String("2024-09-02T06:30:00+00:00".to_string()));
    }

    #[test]
    fn test_payload_contains_only_requested_attributes() {
        let payload = story_payload(&story(), &[StoryAttribute::Title, StoryAttribute::Author]);
        assert_eq!(payload.len(), 2);
        assert_eq!(payload["title"], "Flood warning issued");
        assert!(payload["author"].is_null());
    }

    #[test]
    fn test_defaults_are_title_and_text() {
        let defaults: Vec<&str> = attribute_options()
            .into_iter()
            .filter(|o| o.default)
            .map(|o| o.name)
            .collect();
        assert_eq!(defaults, vec!["title", "text"]);
    }
}
