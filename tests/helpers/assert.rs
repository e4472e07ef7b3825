use snapbox::{Assert, Redactions as Substitutions};
use time::OffsetDateTime;

/// Assert that replaces the current and previous year with [YEAR] and [LAST_YEAR]
pub fn assert() -> Assert {
    let year = OffsetDateTime::now_utc().year();
    let mut substitutions = Substitutions::default();
    substitutions.insert("[YEAR]", year.to_string()).unwrap();
    substitutions
        .insert("[LAST_YEAR]", (year - 1).to_string())
        .unwrap();
    Assert::new()
        .substitutions(substitutions)
        .action_env("SNAPSHOTS")
}
