//! Fixed-width text tables for everything gojira collects.

use indexmap::IndexMap;

use crate::{
    integrations::gerrit::{status, ChangeCounts},
    stats::{estimates::LabelEstimate, Statistics},
};

/// Narrowest width of the leading column holding the name of the subject.
pub(crate) const SUBJECT_WIDTH: usize = 20;
/// Width of every per-year cell.
pub(crate) const CELL_WIDTH: usize = 10;

/// Shown in the Gerrit table for a status nobody had any changes in.
const NONE: &str = ".";
/// Shown in the Gerrit table when the changes couldn't be fetched at all.
const UNAVAILABLE: &str = "?";

/// [`SUBJECT_WIDTH`], or wider if one of `names` would not fit.
fn subject_width<'a>(names: impl IntoIterator<Item = &'a String>) -> usize {
    names
        .into_iter()
        .map(|name| name.chars().count())
        .fold(SUBJECT_WIDTH, usize::max)
}

/// One header line of years followed by one `created/resolved` line per subject.
///
/// The years in the header come from the first subject, every subject is expected to cover the
/// same years.
pub(crate) fn statistics_table(title: &str, statistics: &Statistics) -> String {
    let years = statistics
        .values()
        .next()
        .map(|series| series.iter().map(|bucket| bucket.year).collect::<Vec<_>>())
        .unwrap_or_default();

    let width = subject_width(statistics.keys());
    let mut lines = Vec::with_capacity(statistics.len() + 1);
    let mut header = format!("{title:>width$}");
    for year in years {
        header.push_str(&format!("{year:>CELL_WIDTH$}"));
    }
    lines.push(header);

    for (subject, series) in statistics {
        let mut line = format!("{subject:>width$}");
        for bucket in series {
            let cell = format!("{}/{}", bucket.created, bucket.resolved);
            line.push_str(&format!("{cell:>CELL_WIDTH$}"));
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Issue count, total and average effort per label, in hours and in 8 hour days.
pub(crate) fn estimates_table(estimates: &IndexMap<String, LabelEstimate>) -> String {
    let width = subject_width(estimates.keys());
    let mut lines = vec![format!(
        "{:>width$} {:>10} {:>21} {:>21}",
        "Label", "Issues", "Total(hours, days)", "Average(hours, days)"
    )];
    lines.extend(estimates.iter().map(|(label, estimate)| {
        format!(
            "{label:>width$} {:>10} {:>10.1} {:>10.1} {:>10.1} {:>10.1}",
            estimate.issues,
            estimate.hours,
            estimate.total_days(),
            estimate.average_hours(),
            estimate.average_days()
        )
    }));
    lines.join("\n")
}

/// Merged, new and abandoned changes per owner. `None` marks an owner whose changes couldn't be fetched.
pub(crate) fn changes_table(changes: &IndexMap<String, Option<ChangeCounts>>) -> String {
    let width = subject_width(changes.keys());
    let mut lines = vec![format!(
        "{:>width$}   {:>6} {:>6} {:>9}",
        "Name", "Merged", "New", "Abandoned"
    )];
    lines.extend(changes.iter().map(|(owner, counts)| {
        let cell = |status: &str| match counts {
            Some(counts) => counts
                .get(status)
                .map_or_else(|| NONE.to_string(), ToString::to_string),
            None => UNAVAILABLE.to_string(),
        };
        format!(
            "{owner:>width$}   {:>6} {:>6} {:>9}",
            cell(status::MERGED),
            cell(status::NEW),
            cell(status::ABANDONED),
        )
    }));
    lines.join("\n")
}
