//! Effort estimates: how much original estimate is booked against each label.

use indexmap::IndexMap;
use log::debug;

use crate::{
    integrations::jira::{search, Page, Search},
    jql::{Clause, Query, Scope},
};

/// Most issues looked at per label.
pub(crate) const ESTIMATE_SCAN_LIMIT: u32 = 500;

const SECONDS_PER_HOUR: f64 = 3600.0;
const HOURS_PER_DAY: f64 = 8.0;

/// Summed original estimates over the issues of one label that have one.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct LabelEstimate {
    pub(crate) hours: f64,
    pub(crate) issues: u64,
}

impl LabelEstimate {
    pub(crate) fn total_days(&self) -> f64 {
        self.hours / HOURS_PER_DAY
    }

    pub(crate) fn average_hours(&self) -> f64 {
        if self.issues == 0 {
            0.0
        } else {
            self.hours / self.issues as f64
        }
    }

    pub(crate) fn average_days(&self) -> f64 {
        self.average_hours() / HOURS_PER_DAY
    }

    fn is_empty(&self) -> bool {
        self.issues == 0 || self.hours == 0.0
    }
}

/// Sum the original estimate of every issue in `scope` carrying `label`.
pub(crate) async fn estimate_label<S: Search>(source: &S, scope: &Scope, label: &str) -> LabelEstimate {
    let query = Query::build(scope, [Clause::in_set("labels", [label])], None);
    let Some(response) = search(
        source,
        &query,
        Page::first(ESTIMATE_SCAN_LIMIT),
        &["timetracking"],
    )
    .await
    else {
        return LabelEstimate::default();
    };

    let estimate = response
        .issues
        .iter()
        .filter_map(|issue| issue.fields.timetracking.as_ref())
        .filter_map(|timetracking| timetracking.original_estimate_seconds)
        .fold(LabelEstimate::default(), |estimate, seconds| LabelEstimate {
            hours: estimate.hours + seconds as f64 / SECONDS_PER_HOUR,
            issues: estimate.issues + 1,
        });
    if !estimate.is_empty() {
        debug!(
            "{label}: {:.1} hours ({:.1} days) in {} issues, average {:.2} hours ({:.3} days)",
            estimate.hours,
            estimate.total_days(),
            estimate.issues,
            estimate.average_hours(),
            estimate.average_days()
        );
    }
    estimate
}

/// Estimates for each of `labels`, leaving out labels with no estimated issues.
pub(crate) async fn estimate_labels<S, I>(
    source: &S,
    scope: &Scope,
    labels: I,
) -> IndexMap<String, LabelEstimate>
where
    S: Search,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut estimates = IndexMap::new();
    for label in labels {
        let label = label.as_ref();
        let estimate = estimate_label(source, scope, label).await;
        if estimate.is_empty() {
            debug!("Skipping {label}, nothing is estimated");
            continue;
        }
        estimates.insert(label.to_string(), estimate);
    }
    estimates
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::integrations::jira::fake::{block_on, FakeJira};

    const TWO_ISSUES: &str = r#"{"total": 3, "issues": [
        {"fields": {"timetracking": {"originalEstimate": "2h", "originalEstimateSeconds": 7200}}},
        {"fields": {"timetracking": {"originalEstimateSeconds": 3600}}},
        {"fields": {"timetracking": {}}}
    ]}"#;

    fn label_query(scope: &Scope, label: &str) -> Query {
        Query::build(scope, [Clause::in_set("labels", [label])], None)
    }

    #[test]
    fn two_estimated_issues() {
        let scope = Scope::component("ABC", "UI");
        let jira = FakeJira::default().answer(&label_query(&scope, "ui-login"), TWO_ISSUES);
        let estimate = block_on(estimate_label(&jira, &scope, "ui-login"));
        assert_eq!(
            estimate,
            LabelEstimate {
                hours: 3.0,
                issues: 2
            }
        );
        assert_eq!(estimate.average_hours(), 1.5);
        assert_eq!(estimate.average_days(), 0.1875);
        assert_eq!(estimate.total_days(), 0.375);

        let seen = jira.seen.borrow();
        assert_eq!(seen[0].1, Page::first(ESTIMATE_SCAN_LIMIT));
        assert_eq!(seen[0].2, "timetracking");
    }

    #[test]
    fn labels_without_estimates_are_skipped() {
        let scope = Scope::component("ABC", "UI");
        let jira = FakeJira::with_default(r#"{"total": 1, "issues": [{"fields": {}}]}"#)
            .answer(&label_query(&scope, "ui-login"), TWO_ISSUES)
            .answer(
                &label_query(&scope, "ui-zero"),
                r#"{"issues": [{"fields": {"timetracking": {"originalEstimateSeconds": 0}}}]}"#,
            );
        let estimates = block_on(estimate_labels(
            &jira,
            &scope,
            ["ui-empty", "ui-login", "ui-zero"],
        ));
        assert_eq!(estimates.keys().collect::<Vec<_>>(), vec!["ui-login"]);
    }

    #[test]
    fn failed_search_estimates_nothing() {
        let jira = FakeJira::default();
        let estimate = block_on(estimate_label(&jira, &Scope::project("ABC"), "x"));
        assert_eq!(estimate, LabelEstimate::default());
        assert_eq!(estimate.average_hours(), 0.0);
    }
}
