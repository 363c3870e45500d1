use anyhow::Result;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{complete_as, LanguageModel};
use crate::models::{Headline, StoryRecord, TransformItem};

#[derive(Debug, Deserialize, JsonSchema)]
struct TransformReply {
    text: String,
}

impl From<&StoryRecord> for TransformItem {
    fn from(story: &StoryRecord) -> Self {
        Self {
            title: story.title.clone(),
            text: story.text.clone(),
        }
    }
}

impl From<&Headline> for TransformItem {
    fn from(headline: &Headline) -> Self {
        Self {
            title: headline.title.clone(),
            text: headline.summary.clone(),
        }
    }
}

/// Apply `prompt` to all `items` in a single call and return the model's
/// free-form text.
pub async fn transform_items(
    model: &dyn LanguageModel,
    items: &[TransformItem],
    prompt: &str,
) -> Result<String> {
    let reply: TransformReply =
        complete_as(model, prompt, serde_json::to_string(items)?, None).await?;
    Ok(reply.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headline_summary_becomes_text() {
        let headline = Headline {
            id: "port-strike-ends".to_string(),
            title: "Port strike ends".to_string(),
            summary: "Dock workers return after deal.".to_string(),
            publication: "Harbour News".to_string(),
            category: "Business".to_string(),
        };
        let item = TransformItem::from(&headline);
        assert_eq!(item.title, "Port strike ends");
        assert_eq!(item.text, "Dock workers return after deal.");
    }

    #[test]
    fn test_items_serialize_title_and_text_only() {
        let items = vec![TransformItem {
            title: "A".to_string(),
            text: "B".to_string(),
        }];
        let json = serde_json::to_value(&items).unwrap();
        assert_eq!(json, serde_json::json!([{"title": "A", "text": "B"}]));
    }
}
