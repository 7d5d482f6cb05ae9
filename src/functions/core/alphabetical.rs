use super::display_value;
use crate::document::{Document, NodeId, ScalarType};
use crate::functions::{FieldTarget, RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::RuleFunctionResult;
use serde::Deserialize;
use std::cmp::Ordering;

/// Arrays and maps must be in ascending order
pub struct Alphabetical;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlphabeticalOptions {
    #[serde(default)]
    keyed_by: Option<String>,
}

/// A comparable entry and the node to report when it is out of place
struct Entry {
    key: SortKey,
    node: NodeId,
    label: String,
}

#[derive(PartialEq, PartialOrd)]
enum SortKey {
    Number(f64),
    Text(String),
}

fn compare(a: &SortKey, b: &SortKey) -> Ordering {
    match (a, b) {
        (SortKey::Number(x), SortKey::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
        // Numbers sort before text
        (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
        (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
    }
}

/// `None` when the scalar cannot take part in ordering (booleans, nulls, containers)
fn sort_key(document: &Document, node: NodeId) -> Option<SortKey> {
    match document.scalar_type(node)? {
        ScalarType::Int | ScalarType::Float => document.as_f64(node).map(SortKey::Number),
        ScalarType::Str => Some(SortKey::Text(document.value(node).to_string())),
        ScalarType::Bool | ScalarType::Null => None,
    }
}

impl Alphabetical {
    /// Entries of a container in document order; `None` skips the container
    fn entries(
        document: &Document,
        container: NodeId,
        keyed_by: Option<&str>,
    ) -> Option<Vec<Entry>> {
        let mut entries = Vec::new();
        if document.is_sequence(container) {
            for item in document.items(container) {
                let source = match keyed_by {
                    Some(key) => match document.get(*item, key) {
                        Some(value) => value,
                        None => continue,
                    },
                    None => *item,
                };
                let key = sort_key(document, source)?;
                entries.push(Entry {
                    key,
                    node: *item,
                    label: display_value(document, source),
                });
            }
        } else if document.is_mapping(container) {
            for (key_node, value) in document.lint_entries(container) {
                let source = match keyed_by {
                    Some(key) => match document.get(value, key) {
                        Some(v) => v,
                        None => continue,
                    },
                    None => {
                        // Keys are only ordered when every key is a string
                        if document.scalar_type(key_node) != Some(ScalarType::Str) {
                            return None;
                        }
                        key_node
                    }
                };
                let key = sort_key(document, source)?;
                entries.push(Entry {
                    key,
                    node: if keyed_by.is_some() { value } else { key_node },
                    label: display_value(document, source),
                });
            }
        } else {
            return None;
        }
        Some(entries)
    }
}

impl RuleFunction for Alphabetical {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("alphabetical")
            .with_max_properties(1)
            .with_property("keyedBy", "Key to sort objects in an array or map by")
            .with_error_message("'alphabetical' function has invalid options supplied. Set 'keyedBy' to a string")
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        let Some(options) = ctx.options::<AlphabeticalOptions>() else {
            return Vec::new();
        };
        let document = ctx.document;
        let mut results = Vec::new();

        for node in nodes {
            let container = match ctx.resolve_field(*node) {
                FieldTarget::Node(n) | FieldTarget::Value(n) => n,
                _ => continue,
            };
            let Some(entries) = Self::entries(document, container, options.keyed_by.as_deref())
            else {
                continue;
            };

            // Only the first out-of-order pair per container
            if let Some(pair) = entries
                .windows(2)
                .find(|w| compare(&w[0].key, &w[1].key) == Ordering::Greater)
            {
                let message = match &options.keyed_by {
                    Some(key) => format!(
                        "{}: `{}` must be placed before `{}` (alphabetical, keyed by `{}`)",
                        ctx.description(),
                        pair[1].label,
                        pair[0].label,
                        key
                    ),
                    None => format!(
                        "{}: `{}` must be placed before `{}` (alphabetical)",
                        ctx.description(),
                        pair[1].label,
                        pair[0].label
                    ),
                };
                results.push(ctx.result(message, pair[1].node));
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::testing::Fixture;
    use crate::models::RuleAction;
    use serde_json::json;

    const SPEC: &str = r#"
sorted: [apple, banana, cherry]
reversed: [cherry, banana, apple]
numbers: [10, 2, 30]
flags: [true, false]
tags:
  - name: zebra
  - name: aardvark
map:
  b: 1
  a: 2
codes:
  500: x
  200: y
"#;

    fn run(given: &str, options: serde_json::Value) -> Vec<RuleFunctionResult> {
        let fixture = Fixture::new(SPEC);
        fixture.run(&Alphabetical, given, RuleAction::new("alphabetical").with_options(options))
    }

    #[test]
    fn test_sorted_passes_and_reverse_fails() {
        assert!(run("$.sorted", json!({})).is_empty());
        let failed = run("$.reversed", json!({}));
        assert_eq!(failed.len(), 1);
        assert!(failed[0].message.contains("`banana` must be placed before `cherry`"));
        assert_eq!(failed[0].path, "$.reversed[1]");
    }

    #[test]
    fn test_numbers_compare_numerically() {
        let failed = run("$.numbers", json!({}));
        assert_eq!(failed.len(), 1);
        assert!(failed[0].message.contains("`2` must be placed before `10`"));
    }

    #[test]
    fn test_booleans_skip_container() {
        assert!(run("$.flags", json!({})).is_empty());
    }

    #[test]
    fn test_keyed_by() {
        let failed = run("$.tags", json!({"keyedBy": "name"}));
        assert_eq!(failed.len(), 1);
        assert!(failed[0].message.contains("`aardvark` must be placed before `zebra`"));
    }

    #[test]
    fn test_map_keys() {
        assert_eq!(run("$.map", json!({})).len(), 1);
        // non-string keys leave the map alone
        assert!(run("$.codes", json!({})).is_empty());
    }

    #[test]
    fn test_inline_ignore_key_is_not_sorted() {
        let fixture = Fixture::new("map:\n  x-lint-ignore: other-rule\n  a: 1\n  b: 2\n");
        let results = fixture.run(&Alphabetical, "$.map", RuleAction::new("alphabetical"));
        assert!(results.is_empty(), "{:?}", results);
    }
}
