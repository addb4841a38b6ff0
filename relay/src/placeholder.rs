//! `{{name}}` substitution for request URLs and header values.
//!
//! A placeholder starts at `{{` and ends at the first `}}` that follows at least one
//! character, so nesting is not supported: in `{{a{{b}}}}` the name is `a{{b`.
//! Names never span a line break and are trimmed before lookup.
use crate::token_broker::TokenBroker;
use environments::AuthConfigs;
use std::collections::HashMap;
use std::ops::Range;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, PartialEq)]
pub struct Placeholder<'a> {
    /// Byte range of the whole marker, braces included.
    pub span: Range<usize>,
    /// Trimmed name between the braces.
    pub key: &'a str,
}

/// Finds all non-overlapping placeholders, left to right.
pub fn scan(input: &str) -> Vec<Placeholder<'_>> {
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(offset) = input[pos..].find(OPEN) {
        let start = pos + offset;
        let inner_start = start + OPEN.len();

        let Some(first) = input[inner_start..].chars().next() else {
            break;
        };
        let search_from = inner_start + first.len_utf8();
        let Some(close) = input[search_from..].find(CLOSE) else {
            break;
        };
        let inner_end = search_from + close;
        let inner = &input[inner_start..inner_end];

        if inner.contains(is_line_break) {
            pos = start + 1;
            continue;
        }

        found.push(Placeholder {
            span: start..inner_end + CLOSE.len(),
            key: inner.trim(),
        });
        pos = inner_end + CLOSE.len();
    }

    found
}

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

/// What placeholders of one environment may resolve to.
#[derive(Debug, Default)]
pub struct Substitutions {
    pub auth_configs: AuthConfigs,
    pub variables: HashMap<String, String>,
}

impl Substitutions {
    pub fn is_empty(&self) -> bool {
        self.auth_configs.is_empty() && self.variables.is_empty()
    }
}

pub struct PlaceholderResolver<'a> {
    broker: &'a TokenBroker,
    substitutions: &'a Substitutions,
}

impl<'a> PlaceholderResolver<'a> {
    pub fn new(broker: &'a TokenBroker, substitutions: &'a Substitutions) -> Self {
        PlaceholderResolver {
            broker,
            substitutions,
        }
    }

    /// Replaces every placeholder naming an auth config with `Bearer <token>` and
    /// every placeholder naming a variable with its value.
    ///
    /// Placeholders that match nothing, or whose token cannot be obtained, are left
    /// as they were.
    pub async fn resolve(&self, input: &str) -> String {
        let placeholders = scan(input);
        if placeholders.is_empty() {
            return input.to_string();
        }

        let mut resolved: HashMap<&str, Option<String>> = HashMap::new();
        let mut output = String::with_capacity(input.len());
        let mut last = 0;

        for placeholder in placeholders {
            output.push_str(&input[last..placeholder.span.start]);

            let replacement = match resolved.get(placeholder.key) {
                Some(replacement) => replacement.clone(),
                None => {
                    let replacement = self.lookup(placeholder.key).await;
                    resolved.insert(placeholder.key, replacement.clone());
                    replacement
                }
            };

            match replacement {
                Some(value) => output.push_str(&value),
                None => output.push_str(&input[placeholder.span.clone()]),
            }
            last = placeholder.span.end;
        }

        output.push_str(&input[last..]);
        output
    }

    async fn lookup(&self, key: &str) -> Option<String> {
        if let Some(config) = self.substitutions.auth_configs.get(key) {
            // Failures are logged by the broker; the placeholder stays unresolved.
            let token = self.broker.get_token(key, config).await.ok()?;
            tracing::debug!(placeholder = key, "Substituted bearer token");
            return Some(format!("Bearer {token}"));
        }

        if let Some(value) = self.substitutions.variables.get(key) {
            tracing::debug!(placeholder = key, "Substituted variable");
            return Some(value.clone());
        }

        tracing::debug!(placeholder = key, "No auth config or variable for placeholder");
        None
    }
}
