use indexmap::IndexMap;
use log::{info, warn};

use super::banner;
use crate::{
    app_config::Netrc,
    config::GerritSettings,
    integrations::gerrit::{self, ChangeCounts, Gerrit},
    report::changes_table,
    stats::Lookback,
};

/// Print a table of change counts per owner for each year, for each server in turn.
///
/// ## Errors
/// One of the URLs is not a valid URL.
pub(crate) async fn run(settings: GerritSettings) -> Result<(), gerrit::Error> {
    let netrc = Netrc::load();
    if settings.team.is_empty() {
        warn!("Nobody to count changes for");
    }
    let lookback = Lookback::from_now(settings.years);

    for url in &settings.urls {
        let gerrit = Gerrit::new(url, settings.timeout, netrc.as_ref())?;
        banner(gerrit.base_url());
        for year in lookback.iter() {
            info!("Counting changes from {year}");
            let changes = year_changes(&gerrit, &settings.team, year).await;
            println!("{} {year}", gerrit.base_url());
            println!("{}", changes_table(&changes));
        }
    }
    Ok(())
}

async fn year_changes(
    gerrit: &Gerrit,
    team: &[String],
    year: i32,
) -> IndexMap<String, Option<ChangeCounts>> {
    let mut changes = IndexMap::with_capacity(team.len());
    for owner in team {
        changes.insert(owner.clone(), gerrit.change_counts(owner, year).await);
    }
    changes
}
