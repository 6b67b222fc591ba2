//! # Process Definition Matcher
//!
//! Resolves a message name to a process definition when neither the sender
//! nor an operator override names one. The cascade runs in two stages, each
//! only if the previous one found nothing:
//!
//! 1. **Exact**: the lower-cased message name is a substring of a
//!    definition's lower-cased id or name.
//! 2. **Fuzzy**: the message name is split into keywords (camel-case humps
//!    and non-alphanumeric separators). Keywords of four or more characters
//!    are kept; only if there are none, keywords of three or more are used
//!    instead. The first definition, in catalog order, containing any keyword
//!    (tried in extraction order) wins.
//!
//! There is no scoring. When several definitions share a keyword, catalog
//! order decides, and catalog order is whatever the engine returned.
//!
//! ```rust
//! use process_router::engine::ProcessDefinitionRef;
//! use process_router::matching::definitions::{match_definition, MatchStrategy};
//!
//! let catalog = vec![
//!     ProcessDefinitionRef::new("orderProc", "Orders"),
//!     ProcessDefinitionRef::new("shipProc", "Shipping"),
//! ];
//! let found = match_definition("orderShipped", &catalog).unwrap();
//! assert_eq!(found.process_id, "orderProc");
//! assert_eq!(found.strategy, MatchStrategy::Fuzzy { keyword: "order".into() });
//! ```

use crate::engine::ProcessDefinitionRef;

/// Preferred minimum keyword length.
pub const PRIMARY_MIN_LEN: usize = 4;

/// Minimum keyword length used when no keyword reaches [`PRIMARY_MIN_LEN`].
pub const FALLBACK_MIN_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStrategy {
    Exact,
    Fuzzy { keyword: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionMatch {
    pub process_id: String,
    pub strategy: MatchStrategy,
}

/// Runs the exact → fuzzy cascade over `definitions` in the given order.
pub fn match_definition(
    message_name: &str,
    definitions: &[ProcessDefinitionRef],
) -> Option<DefinitionMatch> {
    let needle = message_name.to_lowercase();
    if !needle.is_empty() {
        if let Some(def) = definitions.iter().find(|d| contains(d, &needle)) {
            return Some(DefinitionMatch {
                process_id: def.id.clone(),
                strategy: MatchStrategy::Exact,
            });
        }
    }

    let keywords = keywords(message_name);
    definitions.iter().find_map(|def| {
        keywords
            .iter()
            .find(|kw| contains(def, kw))
            .map(|kw| DefinitionMatch {
                process_id: def.id.clone(),
                strategy: MatchStrategy::Fuzzy {
                    keyword: kw.clone(),
                },
            })
    })
}

/// Keywords used by the fuzzy stage, in extraction order.
///
/// Never mixes thresholds: either every keyword has at least
/// [`PRIMARY_MIN_LEN`] characters, or (when none does) every keyword has at
/// least [`FALLBACK_MIN_LEN`].
pub fn keywords(message_name: &str) -> Vec<String> {
    let tokens = tokenize(message_name);
    let primary: Vec<String> = tokens
        .iter()
        .filter(|t| t.len() >= PRIMARY_MIN_LEN)
        .cloned()
        .collect();
    if !primary.is_empty() {
        return primary;
    }
    tokens
        .into_iter()
        .filter(|t| t.len() >= FALLBACK_MIN_LEN)
        .collect()
}

/// Splits at lower→upper camel-case boundaries and at every character that
/// is not an ASCII letter or digit. Tokens are lower-cased and deduplicated,
/// keeping first occurrence order.
pub fn tokenize(message_name: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    let flush = |current: &mut String, tokens: &mut Vec<String>| {
        if !current.is_empty() {
            let token = std::mem::take(current);
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
    };

    for c in message_name.chars() {
        if !c.is_ascii_alphanumeric() {
            flush(&mut current, &mut tokens);
            prev_lower = false;
            continue;
        }
        if prev_lower && c.is_ascii_uppercase() {
            flush(&mut current, &mut tokens);
        }
        prev_lower = c.is_ascii_lowercase();
        current.push(c.to_ascii_lowercase());
    }
    flush(&mut current, &mut tokens);

    tokens
}

fn contains(def: &ProcessDefinitionRef, needle: &str) -> bool {
    def.id.to_lowercase().contains(needle) || def.name.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(id: &str, name: &str) -> ProcessDefinitionRef {
        ProcessDefinitionRef::new(id, name)
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("orderShipped"), vec!["order", "shipped"]);
        assert_eq!(tokenize("Order-Completed_v2"), vec!["order", "completed", "v2"]);
        assert_eq!(tokenize("HTTPRequestSent"), vec!["httprequest", "sent"]);
        assert_eq!(tokenize("order2Ship"), vec!["order2ship"]);
        assert_eq!(tokenize("pingPing ping"), vec!["ping"]);
        assert!(tokenize("--").is_empty());
    }

    #[test]
    fn test_keywords_prefer_long_tokens() {
        assert_eq!(keywords("ackShip"), vec!["ship"]);
        assert_eq!(keywords("fooOk"), vec!["foo"]);
        assert!(keywords("ok").is_empty());
        assert!(keywords("a-b-cd").is_empty());
    }

    #[test]
    fn test_exact_match_on_id_or_name() {
        let catalog = vec![def("billing", "Billing"), def("orderCompletedFlow", "Flow")];
        let found = match_definition("OrderCompleted", &catalog).unwrap();
        assert_eq!(found.process_id, "orderCompletedFlow");
        assert_eq!(found.strategy, MatchStrategy::Exact);

        let catalog = vec![def("p-17", "Payment Received Handler"), def("x", "y")];
        let found = match_definition("payment received", &catalog).unwrap();
        assert_eq!(found.process_id, "p-17");
    }

    #[test]
    fn test_exact_beats_earlier_fuzzy_candidate() {
        let catalog = vec![def("orderArchive", "Archive"), def("orderShippedProcess", "Ship")];
        let found = match_definition("orderShipped", &catalog).unwrap();
        assert_eq!(found.process_id, "orderShippedProcess");
        assert_eq!(found.strategy, MatchStrategy::Exact);
    }

    #[test]
    fn test_fuzzy_first_definition_first_keyword() {
        let catalog = vec![def("orderProc", ""), def("shipProc", "")];
        let found = match_definition("orderShipped", &catalog).unwrap();
        assert_eq!(found.process_id, "orderProc");
        assert_eq!(found.strategy, MatchStrategy::Fuzzy { keyword: "order".into() });

        // Catalog order beats keyword order.
        let catalog = vec![def("shippedProc", ""), def("orderProc", "")];
        let found = match_definition("orderShipped", &catalog).unwrap();
        assert_eq!(found.process_id, "shippedProc");
        assert_eq!(found.strategy, MatchStrategy::Fuzzy { keyword: "shipped".into() });
    }

    #[test]
    fn test_fallback_threshold_never_mixes() {
        // "ack" would match the first definition if short keywords were mixed in.
        let catalog = vec![def("ackProcess", ""), def("shipProcess", "")];
        let found = match_definition("ackShip", &catalog).unwrap();
        assert_eq!(found.process_id, "shipProcess");

        // With no four-letter keyword, three-letter keywords are used.
        let catalog = vec![def("fooHandler", "")];
        let found = match_definition("fooOk", &catalog).unwrap();
        assert_eq!(found.strategy, MatchStrategy::Fuzzy { keyword: "foo".into() });
    }

    #[test]
    fn test_no_match() {
        let catalog = vec![def("billing", "Billing")];
        assert_eq!(match_definition("ok", &catalog), None);
        assert_eq!(match_definition("inventoryChecked", &catalog), None);
        assert_eq!(match_definition("inventoryChecked", &[]), None);
    }

    #[test]
    fn test_matching_is_idempotent() {
        let catalog = vec![def("orderProc", "Orders"), def("shipProc", "Shipping")];
        let first = match_definition("orderShipped", &catalog);
        let second = match_definition("orderShipped", &catalog);
        assert_eq!(first, second);
    }
}
