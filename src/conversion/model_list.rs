//! Model listing and descriptor synthesis for the local dialect
//!
//! `/api/tags` is the upstream model list with the configured extra models
//! overlaid. `/api/show` and `/api/version` never reach the upstream.

use crate::core::constants::local;
use crate::models::ollama::{ModelTag, ShowResponse, TagsResponse, VersionResponse};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Identifiers of an OpenAI `{"data": [{"id": ...}]}` model list
///
/// Entries without a string `id` are skipped; a body without a `data` array
/// yields nothing.
pub fn upstream_model_ids(list: &Value) -> impl Iterator<Item = &str> {
    list.get("data")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("id").and_then(Value::as_str))
}

/// Merge upstream models with configured extra models
///
/// Upstream entries come first in upstream order, then extra models not
/// already present. A repeated identifier keeps its first position and the
/// later entry replaces it.
pub fn merge_model_tags(upstream: &Value, extra_models: &[String]) -> TagsResponse {
    let mut models: Vec<ModelTag> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    let ids = upstream_model_ids(upstream).chain(extra_models.iter().map(String::as_str));
    for id in ids {
        let tag = ModelTag::new(id);
        match index.get(id).copied() {
            Some(position) => models[position] = tag,
            None => {
                index.insert(id.to_string(), models.len());
                models.push(tag);
            }
        }
    }

    TagsResponse { models }
}

/// `completion` followed by the configured capabilities, without duplicates
pub fn show_capabilities(configured: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    std::iter::once(local::COMPLETION_CAPABILITY)
        .chain(configured.iter().map(String::as_str))
        .filter(|capability| seen.insert(*capability))
        .map(str::to_string)
        .collect()
}

pub fn show_response(configured: &[String]) -> ShowResponse {
    let model_info = BTreeMap::from([(
        local::ARCHITECTURE_KEY.to_string(),
        local::ARCHITECTURE.to_string(),
    )]);

    ShowResponse {
        model_info,
        capabilities: show_capabilities(configured),
    }
}

pub fn version_response() -> VersionResponse {
    VersionResponse {
        version: local::VERSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(tags: &TagsResponse) -> HashSet<String> {
        tags.models.iter().map(|m| m.name.clone()).collect()
    }

    #[test]
    fn test_extra_models_added() {
        let upstream = json!({"object": "list", "data": [{"id": "gpt-4o"}]});
        let tags = merge_model_tags(&upstream, &["local-llama".to_string()]);

        assert_eq!(
            names(&tags),
            HashSet::from(["gpt-4o".to_string(), "local-llama".to_string()])
        );
        let extra = tags.models.iter().find(|m| m.name == "local-llama").unwrap();
        assert_eq!(extra.model, "local-llama");
    }

    #[test]
    fn test_shared_model_listed_once() {
        let upstream = json!({"data": [{"id": "gpt-4o"}, {"id": "o3"}]});
        let tags = merge_model_tags(&upstream, &["o3".to_string(), "o3".to_string()]);

        assert_eq!(tags.models.len(), 2);
        assert_eq!(tags.models.iter().filter(|m| m.model == "o3").count(), 1);
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let upstream = json!({"data": [{"id": 7}, {"name": "no-id"}, {"id": "ok"}]});
        let tags = merge_model_tags(&upstream, &[]);
        assert_eq!(tags.models, vec![ModelTag::new("ok")]);
    }

    #[test]
    fn test_missing_data_array() {
        let tags = merge_model_tags(&json!({"error": "nope"}), &["only".to_string()]);
        assert_eq!(tags.models, vec![ModelTag::new("only")]);
    }

    #[test]
    fn test_capabilities_completion_first() {
        let caps = show_capabilities(&["tools".to_string(), "vision".to_string()]);
        assert_eq!(caps, vec!["completion", "tools", "vision"]);
    }

    #[test]
    fn test_capabilities_deduplicated() {
        let caps = show_capabilities(&[
            "completion".to_string(),
            "tools".to_string(),
            "tools".to_string(),
        ]);
        assert_eq!(caps, vec!["completion", "tools"]);
    }

    #[test]
    fn test_show_response_shape() {
        let value = serde_json::to_value(show_response(&[])).unwrap();
        assert_eq!(
            value,
            json!({
                "model_info": {"general.architecture": "CausalLM"},
                "capabilities": ["completion"]
            })
        );
    }

    #[test]
    fn test_version_response_shape() {
        let value = serde_json::to_value(version_response()).unwrap();
        assert_eq!(value, json!({"version": "0.11.4"}));
    }
}
