//! # Correlation Resolver
//!
//! Finds every active instance a correlated message is meant for.
//!
//! ## Single key
//!
//! With exactly one constraint `(key, value)` an instance matches when
//!
//! 1. its variable `key`, or else its conventional `correlationKey`
//!    variable, stringifies to the same text as `value`, or else
//! 2. `value` is a string and **any** string-typed variable equals it.
//!
//! The second step lets processes keep the correlation value under their own
//! variable name. It is a plain string comparison: numbers and booleans are
//! never consulted on either side, so `42` and `"42"` only meet through the
//! variables of step 1.
//!
//! ## Multiple keys
//!
//! With two or more constraints an instance matches only if every key is
//! present and exactly value-equal. Partial matches do not count.
//!
//! ## Fan-out
//!
//! All matching instances are returned, never just the first.

use crate::engine::{InstanceId, ProcessInstanceRef};
use crate::message::{Value, Variables, CORRELATION_KEY};
use std::collections::BTreeSet;

/// Why an instance matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedBy {
    /// The variable named after the correlation key, or `correlationKey`.
    Key(String),
    /// Another string variable carrying the correlation value.
    Scan(String),
    /// Every constraint of a multi-key correlation.
    AllKeys,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationMatch {
    pub instance_id: InstanceId,
    pub matched_by: MatchedBy,
}

/// Ids of every active instance satisfying `keys`. Empty `keys` match nothing.
pub fn resolve(keys: &Variables, instances: &[ProcessInstanceRef]) -> BTreeSet<InstanceId> {
    find_matches(keys, instances)
        .into_iter()
        .map(|m| m.instance_id)
        .collect()
}

/// Like [`resolve`], but reports how each instance matched, in input order.
pub fn find_matches(keys: &Variables, instances: &[ProcessInstanceRef]) -> Vec<CorrelationMatch> {
    instances
        .iter()
        .filter(|instance| instance.is_active())
        .filter_map(|instance| {
            matches(keys, &instance.variables).map(|matched_by| CorrelationMatch {
                instance_id: instance.id,
                matched_by,
            })
        })
        .collect()
}

/// Tests one instance's variables against the constraints.
pub fn matches(keys: &Variables, variables: &Variables) -> Option<MatchedBy> {
    match keys.len() {
        0 => None,
        1 => {
            let (key, expected) = keys.iter().next()?;
            matches_single(key, expected, variables)
        }
        _ => keys
            .iter()
            .all(|(key, expected)| variables.get(key) == Some(expected))
            .then_some(MatchedBy::AllKeys),
    }
}

fn matches_single(key: &str, expected: &Value, variables: &Variables) -> Option<MatchedBy> {
    let text = stringify(expected);

    let primary = std::iter::once(key).chain((key != CORRELATION_KEY).then_some(CORRELATION_KEY));
    for name in primary {
        match variables.get(name) {
            Some(value) if !value.is_null() && stringify(value) == text => {
                return Some(MatchedBy::Key(name.to_string()));
            }
            _ => {}
        }
    }

    let Value::String(expected) = expected else {
        return None;
    };
    variables.iter().find_map(|(name, value)| match value {
        Value::String(s) if s == expected => Some(MatchedBy::Scan(name.clone())),
        _ => None,
    })
}

/// Text form used for single-key comparison: strings verbatim, anything else
/// as its JSON rendering.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InstanceStatus;
    use serde_json::json;

    fn vars(pairs: &[(&str, Value)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn instance(id: u64, pairs: &[(&str, Value)]) -> ProcessInstanceRef {
        ProcessInstanceRef::active(id, "proc", vars(pairs))
    }

    fn ids(list: &[u64]) -> BTreeSet<InstanceId> {
        list.iter().copied().map(InstanceId).collect()
    }

    #[test]
    fn test_single_key_on_conventional_variable() {
        let instances = vec![
            instance(1, &[("correlationKey", json!("ORD-1"))]),
            instance(2, &[("correlationKey", json!("ORD-2"))]),
        ];
        let keys = vars(&[("correlationKey", json!("ORD-1"))]);
        assert_eq!(resolve(&keys, &instances), ids(&[1]));
    }

    #[test]
    fn test_single_key_fans_out_to_every_match() {
        let instances = vec![
            instance(1, &[("correlationKey", json!("X"))]),
            instance(2, &[("correlationKey", json!("Y"))]),
            instance(3, &[("correlationKey", json!("X"))]),
        ];
        let keys = vars(&[("correlationKey", json!("X"))]);
        assert_eq!(resolve(&keys, &instances), ids(&[1, 3]));
    }

    #[test]
    fn test_single_key_stringifies_named_variable() {
        let instances = vec![instance(1, &[("correlationKey", json!(42))])];
        let keys = vars(&[("correlationKey", json!("42"))]);
        let found = find_matches(&keys, &instances);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].matched_by, MatchedBy::Key("correlationKey".into()));
    }

    #[test]
    fn test_secondary_scan_only_reads_strings() {
        let instances = vec![
            instance(1, &[("orderNumber", json!(42))]),
            instance(2, &[("orderNumber", json!("42"))]),
            instance(3, &[("flag", json!(true))]),
        ];
        let keys = vars(&[("correlationKey", json!("42"))]);
        let found = find_matches(&keys, &instances);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].instance_id, InstanceId(2));
        assert_eq!(found[0].matched_by, MatchedBy::Scan("orderNumber".into()));

        let keys = vars(&[("correlationKey", json!("true"))]);
        assert!(resolve(&keys, &instances).is_empty());
    }

    #[test]
    fn test_secondary_scan_after_mismatching_key_variable() {
        let instances = vec![instance(
            1,
            &[("correlationKey", json!("OTHER")), ("orderId", json!("ORD-9"))],
        )];
        let keys = vars(&[("correlationKey", json!("ORD-9"))]);
        assert_eq!(resolve(&keys, &instances), ids(&[1]));
    }

    #[test]
    fn test_null_key_variable_is_not_the_string_null() {
        let instances = vec![instance(1, &[("correlationKey", Value::Null)])];
        let keys = vars(&[("correlationKey", json!("null"))]);
        assert!(resolve(&keys, &instances).is_empty());
    }

    #[test]
    fn test_multi_key_requires_every_key() {
        let instances = vec![
            instance(1, &[("customer", json!("C1")), ("region", json!("EU"))]),
            instance(2, &[("customer", json!("C1")), ("region", json!("US"))]),
            instance(3, &[("customer", json!("C1"))]),
            instance(4, &[("customer", json!("C1")), ("region", json!("EU")), ("x", json!(1))]),
        ];
        let keys = vars(&[("customer", json!("C1")), ("region", json!("EU"))]);
        assert_eq!(resolve(&keys, &instances), ids(&[1, 4]));

        // Changing one required value removes the instance.
        let keys = vars(&[("customer", json!("C1")), ("region", json!("APAC"))]);
        assert!(resolve(&keys, &instances).is_empty());
    }

    #[test]
    fn test_multi_key_is_exact_intersection() {
        let instances = vec![
            instance(1, &[("a", json!(1)), ("b", json!("x"))]),
            instance(2, &[("a", json!(1)), ("b", json!("y"))]),
            instance(3, &[("a", json!(2)), ("b", json!("x"))]),
        ];
        let a = vars(&[("a", json!(1))]);
        let b = vars(&[("b", json!("x"))]);
        let both = vars(&[("a", json!(1)), ("b", json!("x"))]);

        let per_key_a: BTreeSet<_> = instances
            .iter()
            .filter(|i| i.variables.get("a") == a.get("a"))
            .map(|i| i.id)
            .collect();
        let per_key_b: BTreeSet<_> = instances
            .iter()
            .filter(|i| i.variables.get("b") == b.get("b"))
            .map(|i| i.id)
            .collect();
        let expected: BTreeSet<_> = per_key_a.intersection(&per_key_b).copied().collect();

        assert_eq!(resolve(&both, &instances), expected);
        assert_eq!(expected, ids(&[1]));
    }

    #[test]
    fn test_multi_key_uses_exact_equality() {
        let instances = vec![instance(1, &[("a", json!(1)), ("b", json!("2"))])];
        let keys = vars(&[("a", json!("1")), ("b", json!("2"))]);
        assert!(resolve(&keys, &instances).is_empty());
    }

    #[test]
    fn test_inactive_instances_never_match() {
        let mut done = instance(1, &[("correlationKey", json!("X"))]);
        done.status = InstanceStatus::Completed;
        let instances = vec![done, instance(2, &[("correlationKey", json!("X"))])];
        let keys = vars(&[("correlationKey", json!("X"))]);
        assert_eq!(resolve(&keys, &instances), ids(&[2]));
    }

    #[test]
    fn test_conventional_variable_backs_up_custom_key() {
        let instances = vec![
            instance(1, &[("correlationKey", json!(42))]),
            instance(2, &[("orderId", json!("7")), ("correlationKey", json!(42))]),
        ];
        let keys = vars(&[("orderId", json!("42"))]);
        let found = find_matches(&keys, &instances);
        assert_eq!(found.len(), 2);
        assert!(found
            .iter()
            .all(|m| m.matched_by == MatchedBy::Key("correlationKey".into())));
    }

    #[test]
    fn test_secondary_scan_needs_a_string_value() {
        let instances = vec![instance(1, &[("orderNumber", json!("42"))])];
        let keys = vars(&[("correlationKey", json!(42))]);
        assert!(resolve(&keys, &instances).is_empty());

        let keys = vars(&[("correlationKey", json!("42"))]);
        assert_eq!(resolve(&keys, &instances), ids(&[1]));
    }

    #[test]
    fn test_blank_constraint_keeps_multi_key_semantics() {
        let instances = vec![
            instance(1, &[("customer", json!("C1")), ("region", json!("EU"))]),
            instance(2, &[("owner", json!("C1"))]),
            instance(3, &[("customer", json!("C1")), ("region", json!(""))]),
        ];
        let message =
            crate::message::decode(r#"{"name":"x","correlationKeys":{"customer":"C1","region":""}}"#)
                .unwrap();
        assert_eq!(resolve(message.correlation_keys(), &instances), ids(&[3]));
    }

    #[test]
    fn test_empty_keys_match_nothing() {
        let instances = vec![instance(1, &[("correlationKey", json!("X"))])];
        assert!(resolve(&Variables::new(), &instances).is_empty());
    }
}
