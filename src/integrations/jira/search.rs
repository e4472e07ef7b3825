use indexmap::IndexSet;
use log::{debug, error, warn};
use serde::Deserialize;

use super::Error;
use crate::{
    integrations::{truncate, DUMP_LIMIT},
    jql::{Clause, Query, Scope},
    stats::CountResult,
};

/// Upper bound on the issues scanned when collecting labels.
pub(crate) const LABEL_SCAN_LIMIT: u32 = 9999;

/// Which slice of the matching issues a search returns.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Page {
    pub(crate) start_at: u32,
    pub(crate) max_results: u32,
}

impl Page {
    /// No issues at all, only the total.
    pub(crate) const COUNT_ONLY: Self = Self::first(0);

    pub(crate) const fn first(max_results: u32) -> Self {
        Self {
            start_at: 0,
            max_results,
        }
    }
}

/// Anything that can run a JQL search and hand back the raw response body.
pub(crate) trait Search {
    async fn search(&self, query: &Query, page: Page, fields: &[&str]) -> Result<String, Error>;
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub(crate) total: Option<u64>,
    #[serde(default)]
    pub(crate) issues: Vec<Issue>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Issue {
    #[serde(default)]
    pub(crate) fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IssueFields {
    #[serde(default)]
    pub(crate) labels: Vec<String>,
    #[serde(default)]
    pub(crate) timetracking: Option<TimeTracking>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TimeTracking {
    #[serde(default)]
    pub(crate) original_estimate_seconds: Option<u64>,
}

/// Run `query` and parse the response. Failures are logged and come back as `None`.
pub(crate) async fn search<S: Search>(
    source: &S,
    query: &Query,
    page: Page,
    fields: &[&str],
) -> Option<SearchResponse> {
    let body = match source.search(query, page, fields).await {
        Ok(body) => body,
        Err(err) => {
            error!("Search `{query}` failed: {err}");
            return None;
        }
    };
    match serde_json::from_str(&body) {
        Ok(response) => Some(response),
        Err(err) => {
            error!(
                "Invalid search response ({err}): {}",
                truncate(&body, DUMP_LIMIT)
            );
            None
        }
    }
}

/// The number of issues matching `query`, without fetching any of them.
pub(crate) async fn count<S: Search>(source: &S, query: &Query) -> CountResult {
    match search(source, query, Page::COUNT_ONLY, &[]).await {
        Some(SearchResponse {
            total: Some(total), ..
        }) => {
            debug!("{total} issues match `{query}`");
            CountResult::Count(total)
        }
        Some(_) => {
            error!("Search response for `{query}` has no total");
            CountResult::Unavailable
        }
        None => CountResult::Unavailable,
    }
}

/// All labels on issues within `scope`, in the order they were first seen, limited to those
/// starting with `prefix` if one is given.
pub(crate) async fn list_labels<S: Search>(
    source: &S,
    scope: &Scope,
    prefix: Option<&str>,
) -> IndexSet<String> {
    let query = Query::build(scope, [Clause::is_not_empty("labels")], None);
    let Some(response) = search(source, &query, Page::first(LABEL_SCAN_LIMIT), &["labels"]).await
    else {
        error!("Could not collect labels with `{query}`");
        return IndexSet::new();
    };
    if response.issues.is_empty() {
        warn!("No labelled issues found with `{query}`");
    }
    response
        .issues
        .into_iter()
        .flat_map(|issue| issue.fields.labels)
        .filter(|label| prefix.map_or(true, |prefix| label.starts_with(prefix)))
        .collect()
}
