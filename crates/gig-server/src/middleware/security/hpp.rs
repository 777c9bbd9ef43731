//! HTTP parameter pollution protection.

use std::collections::{BTreeMap, HashMap};

use axum::extract::Request;
use axum::http::Uri;
use axum::http::uri::PathAndQuery;
use axum::middleware::Next;
use axum::response::Response;
use url::form_urlencoded;

use crate::TRACING_TARGET_SECURITY;

/// Every value of each query parameter that was sent more than once.
///
/// Handlers see only the last value; this extension keeps the full list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollutedParams(pub BTreeMap<String, Vec<String>>);

impl PollutedParams {
    /// Returns all values sent for `key`, if it was repeated.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// Whether no parameter was repeated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Collapses repeated keys to their last value, keeping first-seen order.
///
/// Linear in the number of pairs.
pub(crate) fn dedupe_params<I>(pairs: I) -> (Vec<(String, String)>, PollutedParams)
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut kept: Vec<(String, String)> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut polluted: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (key, value) in pairs {
        match position.get(&key) {
            Some(&index) => {
                let previous = std::mem::replace(&mut kept[index].1, value.clone());
                polluted
                    .entry(key)
                    .or_insert_with(|| vec![previous])
                    .push(value);
            }
            None => {
                position.insert(key.clone(), kept.len());
                kept.push((key, value));
            }
        }
    }

    (kept, PollutedParams(polluted))
}

fn rewrite_query(uri: &Uri, query: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = if query.is_empty() {
        uri.path().to_owned()
    } else {
        format!("{}?{query}", uri.path())
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    Ok(Uri::from_parts(parts)?)
}

/// Rewrites the query string so every parameter appears once.
pub(super) async fn parameter_pollution(mut request: Request, next: Next) -> Response {
    let Some(query) = request.uri().query() else {
        return next.run(request).await;
    };

    let pairs = form_urlencoded::parse(query.as_bytes()).into_owned();
    let (kept, polluted) = dedupe_params(pairs);

    if !polluted.is_empty() {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&kept)
            .finish();

        match rewrite_query(request.uri(), &query) {
            Ok(uri) => *request.uri_mut() = uri,
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_SECURITY,
                    error = %err,
                    "Could not rewrite polluted query string"
                );
            }
        }

        request.extensions_mut().insert(polluted);
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn last_value_wins() {
        let input = pairs(&[("sort", "asc"), ("q", "logo"), ("sort", "desc")]);
        let (kept, polluted) = dedupe_params(input);

        assert_eq!(kept, pairs(&[("sort", "desc"), ("q", "logo")]));
        assert_eq!(
            polluted.get("sort"),
            Some(&["asc".to_owned(), "desc".to_owned()][..])
        );
        assert_eq!(polluted.get("q"), None);
    }

    #[test]
    fn unique_params_are_untouched() {
        let input = pairs(&[("a", "1"), ("b", "2")]);
        let (kept, polluted) = dedupe_params(input.clone());
        assert_eq!(kept, input);
        assert!(polluted.is_empty());
    }

    #[test]
    fn large_parameter_sets_stay_linear() {
        let distinct = (0..100_000).map(|i| (format!("k{i}"), "v".to_owned()));
        let repeated = (0..1_000).map(|i| (format!("k{i}"), "w".to_owned()));

        let started = Instant::now();
        let (kept, polluted) = dedupe_params(distinct.chain(repeated));
        let elapsed = started.elapsed();

        assert_eq!(kept.len(), 100_000);
        assert_eq!(kept[0], ("k0".to_owned(), "w".to_owned()));
        assert_eq!(kept[99_999].1, "v");
        assert_eq!(polluted.0.len(), 1_000);
        assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    }

    #[test]
    fn rewrites_query_keeping_path() -> anyhow::Result<()> {
        let uri: Uri = "http://localhost:4004/api/v1/gig/search?page=1&page=2".parse()?;
        let rewritten = rewrite_query(&uri, "page=2")?;
        assert_eq!(rewritten.path(), "/api/v1/gig/search");
        assert_eq!(rewritten.query(), Some("page=2"));
        Ok(())
    }
}
