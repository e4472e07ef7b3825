//! Created/resolved issue counts per year, per assignee or label.

use std::fmt;

use indexmap::IndexMap;
use log::{debug, info};
use time::OffsetDateTime;

use crate::{
    integrations::jira::{count, Search},
    jql::{Clause, DateField, Query, Scope, YearRange},
};

pub(crate) mod estimates;

/// The number of issues matching a query, or `Unavailable` if Jira couldn't tell us.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum CountResult {
    Count(u64),
    Unavailable,
}

impl fmt::Display for CountResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(count) => write!(f, "{count}"),
            Self::Unavailable => write!(f, "?"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct YearBucket {
    pub(crate) year: i32,
    pub(crate) created: CountResult,
    pub(crate) resolved: CountResult,
}

/// One subject's buckets, newest year first.
pub(crate) type SubjectSeries = Vec<YearBucket>;

/// Series per subject, in the order the subjects were given.
pub(crate) type Statistics = IndexMap<String, SubjectSeries>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SubjectKind {
    Assignee,
    Label,
}

impl SubjectKind {
    fn clause(self, subject: &str) -> Clause {
        match self {
            Self::Assignee => Clause::equals("assignee", subject),
            Self::Label => Clause::in_set("labels", [subject]),
        }
    }

    /// Heading of the subject column in reports.
    pub(crate) fn title(self) -> &'static str {
        match self {
            Self::Assignee => "Name",
            Self::Label => "Label",
        }
    }
}

/// The most recent `years` years, ending with `current_year`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Lookback {
    pub(crate) current_year: i32,
    pub(crate) years: u16,
}

impl Lookback {
    pub(crate) fn new(current_year: i32, years: u16) -> Self {
        Self {
            current_year,
            years,
        }
    }

    /// A window ending with the current calendar year (UTC).
    pub(crate) fn from_now(years: u16) -> Self {
        Self::new(OffsetDateTime::now_utc().year(), years)
    }

    /// Every year in the window, newest first.
    pub(crate) fn iter(self) -> impl Iterator<Item = i32> {
        (0..self.years).map(move |offset| self.current_year - i32::from(offset))
    }
}

/// Count the issues `subject` created and resolved in every year of `lookback`.
pub(crate) async fn subject_series<S: Search>(
    source: &S,
    scope: &Scope,
    kind: SubjectKind,
    subject: &str,
    lookback: Lookback,
) -> SubjectSeries {
    let mut series = SubjectSeries::with_capacity(lookback.years.into());
    for year in lookback.iter() {
        let in_year = |field| {
            Query::build(
                scope,
                [kind.clause(subject)],
                Some(YearRange::new(field, year)),
            )
        };
        let created = count(source, &in_year(DateField::Created)).await;
        let resolved = count(source, &in_year(DateField::Resolved)).await;
        debug!("{subject} in {year}: {created} created, {resolved} resolved");
        series.push(YearBucket {
            year,
            created,
            resolved,
        });
    }
    series
}

/// Build a [`SubjectSeries`] for each of `subjects`, one after the other.
pub(crate) async fn aggregate<S, I>(
    source: &S,
    scope: &Scope,
    subjects: I,
    kind: SubjectKind,
    lookback: Lookback,
) -> Statistics
where
    S: Search,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut statistics = Statistics::new();
    for subject in subjects {
        let subject = subject.as_ref();
        if statistics.contains_key(subject) {
            continue;
        }
        info!("Collecting statistics for {subject}");
        let series = subject_series(source, scope, kind, subject, lookback).await;
        statistics.insert(subject.to_string(), series);
    }
    statistics
}
