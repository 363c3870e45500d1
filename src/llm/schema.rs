use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Named JSON schema sent as the `response_format` of a structured call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: Value,
}

impl ResponseSchema {
    pub fn of<T: StructuredOutput>() -> Self {
        Self {
            name: T::type_name(),
            schema: T::strict_schema(),
        }
    }

    /// `response_format` body for an OpenAI-compatible chat request.
    pub fn response_format(&self) -> Value {
        serde_json::json!({
            "type": "json_schema",
            "json_schema": {
                "name": self.name,
                "strict": true,
                "schema": self.schema,
            }
        })
    }
}

/// Reply types the model can be asked to produce.
///
/// Strict structured outputs need every object closed
/// (`additionalProperties: false`), every property required, and no `$ref`
/// indirection, so the generated schema is post-processed accordingly.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn strict_schema() -> Value {
        let mut value = serde_json::to_value(schema_for!(Self)).unwrap_or_default();

        let definitions = value.get("definitions").cloned();
        if let Some(defs) = definitions {
            inline_refs(&mut value, &defs);
        }
        close_objects(&mut value);

        if let Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
            map.remove("title");
        }
        value
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                let keys: Option<Vec<Value>> = map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| props.keys().cloned().map(Value::String).collect());
                if let Some(keys) = keys {
                    map.insert("required".to_string(), Value::Array(keys));
                }
            }
            for v in map.values_mut() {
                close_objects(v);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

fn inline_refs(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();
            if let Some(def) = target {
                *value = def;
                inline_refs(value, definitions);
                return;
            }
            // schemars wraps described references as a single-element allOf
            let single_all_of = match map.get("allOf") {
                Some(Value::Array(all_of)) if all_of.len() == 1 => Some(all_of[0].clone()),
                _ => None,
            };
            if let Some(inner) = single_all_of {
                *value = inner;
                inline_refs(value, definitions);
                return;
            }
            for v in map.values_mut() {
                inline_refs(v, definitions);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| inline_refs(v, definitions)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct Identifier {
        id: String,
    }

    #[derive(Deserialize, JsonSchema)]
    struct Reranked {
        headlines: Vec<Identifier>,
        note: Option<String>,
    }

    #[test]
    fn test_schema_is_closed_and_fully_required() {
        let schema = Reranked::strict_schema();
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"headlines"));
        assert!(required.contains(&"note"));
    }

    #[test]
    fn test_nested_definitions_are_inlined() {
        let schema = Reranked::strict_schema();
        let text = serde_json::to_string(&schema).unwrap();
        assert!(!text.contains("$ref"));
        assert!(schema.get("definitions").is_none());
        let item = &schema["properties"]["headlines"]["items"];
        assert_eq!(item["type"], "object");
        assert_eq!(item["additionalProperties"], Value::Bool(false));
    }

    #[test]
    fn test_response_format_wraps_schema() {
        let format = ResponseSchema::of::<Identifier>().response_format();
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["json_schema"]["name"], "Identifier");
        assert_eq!(format["json_schema"]["strict"], Value::Bool(true));
    }
}
