use std::fmt;

use crate::error::{QueryError, Result};

/// Query parameters sent with every request to the query endpoint
///
/// Keeps insertion order. Setting a key that already exists replaces its value
/// in place, so a later `key value` pair on the command line wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Pairs in the shape `reqwest::RequestBuilder::query` expects
    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.entries
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        write!(f, "}}")
    }
}

/// Builds query parameters from a flat `key value key value ...` token list
///
/// An odd number of tokens is a usage error; nothing is built in that case.
///
/// ```
/// use orca_query::validation::parse_query_params;
///
/// let tokens = vec!["state.severity".to_string(), "hazardous".to_string()];
/// let params = parse_query_params(&tokens).unwrap();
/// assert_eq!(params.get("state.severity"), Some("hazardous"));
///
/// assert!(parse_query_params(&tokens[..1]).is_err());
/// ```
pub fn parse_query_params(tokens: &[String]) -> Result<QueryParams> {
    if tokens.len() % 2 != 0 {
        return Err(QueryError::OddParameterList {
            params: tokens.join(" "),
        });
    }

    let mut params = QueryParams::new();
    for pair in tokens.chunks_exact(2) {
        params.set(pair[0].as_str(), pair[1].as_str());
    }
    Ok(params)
}

/// Validates a resource-type name before it is spliced into the request path
///
/// The name must be non-empty and form a single URL path segment: no slashes,
/// query or fragment markers, whitespace or control characters.
pub fn validate_query_type(query_type: &str) -> Result<()> {
    if query_type.is_empty() {
        return Err(QueryError::InvalidQueryType("query type is empty".to_string()));
    }

    if query_type == "." || query_type == ".." {
        return Err(QueryError::InvalidQueryType(query_type.to_string()));
    }

    let forbidden = |c: char| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace() || c.is_control();
    if query_type.chars().any(forbidden) {
        return Err(QueryError::InvalidQueryType(query_type.to_string()));
    }

    Ok(())
}
