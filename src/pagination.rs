// Page navigation links for list endpoints
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Decorate a list result with `next`, `previous` and `count` fields based
/// on the one-based `page` query parameter. Both link fields are always
/// present, empty when there is no page in that direction. Links preserve
/// every other query parameter (sorted by name, `page` last) so a client
/// can follow them verbatim.
pub fn build_paginated_response(
    mut result: Map<String, Value>,
    query: &HashMap<String, String>,
    total_records: u64,
    page_size: u64,
    base_url: &str,
) -> Map<String, Value> {
    let page: u64 = query
        .get("page")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0);

    let next = if page > 0 && page_size > 0 && total_records > page * page_size {
        page_link(base_url, query, page + 1)
    } else {
        String::new()
    };
    let previous = if page > 1 {
        page_link(base_url, query, page - 1)
    } else {
        String::new()
    };
    result.insert("next".into(), json!(next));
    result.insert("previous".into(), json!(previous));
    result.insert("count".into(), json!(total_records));
    result
}

fn page_link(base_url: &str, query: &HashMap<String, String>, page: u64) -> String {
    let mut pairs: Vec<_> = query
        .iter()
        .filter(|(name, _)| name.as_str() != "page")
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in pairs {
        serializer.append_pair(name, value);
    }
    serializer.append_pair("page", &page.to_string());
    format!("{}?{}", base_url, serializer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn first_page_gets_next_but_no_previous() {
        let result = build_paginated_response(
            Map::new(),
            &query(&[("page", "1")]),
            25,
            10,
            "https://api.test/items",
        );
        assert_eq!(result["next"], json!("https://api.test/items?page=2"));
        assert_eq!(result["previous"], json!(""));
        assert_eq!(result["count"], json!(25));
    }

    #[test]
    fn middle_page_gets_both_links() {
        let result = build_paginated_response(
            Map::new(),
            &query(&[("page", "2"), ("status", "open")]),
            25,
            10,
            "https://api.test/items",
        );
        assert_eq!(
            result["next"],
            json!("https://api.test/items?status=open&page=3")
        );
        assert_eq!(
            result["previous"],
            json!("https://api.test/items?status=open&page=1")
        );
    }

    #[test]
    fn last_page_gets_previous_only() {
        let result = build_paginated_response(
            Map::new(),
            &query(&[("page", "3")]),
            25,
            10,
            "https://api.test/items",
        );
        assert_eq!(result["next"], json!(""));
        assert_eq!(result["previous"], json!("https://api.test/items?page=2"));
    }

    #[test]
    fn absent_page_parameter_yields_empty_links() {
        let result = build_paginated_response(
            Map::new(),
            &query(&[]),
            25,
            10,
            "https://api.test/items",
        );
        assert_eq!(result["next"], json!(""));
        assert_eq!(result["previous"], json!(""));
        assert_eq!(result["count"], json!(25));
    }

    #[test]
    fn existing_result_fields_survive() {
        let mut seed = Map::new();
        seed.insert("items".into(), json!([1, 2, 3]));
        let result = build_paginated_response(
            seed,
            &query(&[("page", "1")]),
            3,
            10,
            "https://api.test/items",
        );
        assert_eq!(result["items"], json!([1, 2, 3]));
        assert_eq!(result["next"], json!(""));
    }
}
