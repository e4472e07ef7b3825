use log::{error, info, warn};
use miette::Diagnostic;

use super::banner;
use crate::{
    app_config::{self, jira_credentials},
    config::JiraSettings,
    integrations::{
        jira::{self, count, list_labels, Page, Search, Session},
        truncate, DUMP_LIMIT,
    },
    jql::{Query, Scope},
    report::{estimates_table, statistics_table},
    stats::{aggregate, estimates::estimate_labels, Lookback, SubjectKind},
};

/// What to do once logged in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Mode {
    /// Team statistics, then effort estimates, then label statistics.
    Report,
    /// Exercise every endpoint once and dump what comes back.
    SelfTest,
    /// Count the issues matching a query typed by the user.
    Jql(String),
}

pub(crate) async fn run(
    settings: JiraSettings,
    username: Option<String>,
    password: Option<String>,
    mode: Mode,
) -> Result<(), Error> {
    let credentials = jira_credentials(username, password)?;
    info!("Logging in to {} as {}", settings.url, credentials.username);
    let session = Session::open(&settings.url, &credentials, settings.timeout).await?;
    let scope = Scope::component(&settings.project, &settings.component);

    match mode {
        Mode::Jql(jql) => {
            let query = Query::verbatim(&jql);
            println!("{}", count(&session, &query).await);
        }
        Mode::SelfTest => self_test(&session, &scope).await,
        Mode::Report => {
            let lookback = Lookback::from_now(settings.years);
            report(&session, &settings, lookback, |section| println!("{section}")).await;
        }
    }
    Ok(())
}

/// Build each table of the default report, handing it to `print` as soon as it's ready.
async fn report<S: Search>(
    source: &S,
    settings: &JiraSettings,
    lookback: Lookback,
    mut print: impl FnMut(&str),
) {
    let scope = Scope::component(&settings.project, &settings.component);

    banner("Team statistics");
    if settings.team.is_empty() {
        warn!("Skipping team statistics, there is nobody on the team");
    } else {
        let team = aggregate(
            source,
            &scope.project_only(),
            &settings.team,
            SubjectKind::Assignee,
            lookback,
        )
        .await;
        print(&statistics_table(SubjectKind::Assignee.title(), &team));
    }

    let labels = list_labels(source, &scope, Some(settings.prefix.as_str())).await;
    info!("Found {} labels", labels.len());

    banner("Estimates");
    print(&estimates_table(&estimate_labels(source, &scope, &labels).await));

    banner("Label statistics");
    let statistics = aggregate(source, &scope, &labels, SubjectKind::Label, lookback).await;
    print(&statistics_table(SubjectKind::Label.title(), &statistics));
}

async fn self_test(session: &Session, scope: &Scope) {
    banner("Current user");
    dump(session.myself().await);

    let everything = Query::build(scope, [], None);
    banner("Count-only search");
    dump(session.search(&everything, Page::COUNT_ONLY, &[]).await);
    println!("{everything}: {}", count(session, &everything).await);

    banner("Project labels");
    if let Some(id) = session.project_id(&scope.project).await {
        println!("Project {} has ID {id}", scope.project);
        println!("{}", session.project_labels(&id).await.join("\n"));
    }

    banner("Oldest issue");
    let oldest = everything.oldest_first("created");
    dump(session.search(&oldest, Page::first(1), &["created"]).await);
}

fn dump(response: Result<String, jira::Error>) {
    match response {
        Ok(body) => println!("{}", truncate(&body, DUMP_LIMIT)),
        Err(err) => error!("{err}"),
    }
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Credentials(#[from] app_config::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Jira(#[from] jira::Error),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::integrations::jira::fake::{block_on, FakeJira};

    const BODY: &str = r#"{"total": 2, "issues": [
        {"fields": {"labels": ["ui-login", "backend"], "timetracking": {"originalEstimateSeconds": 28800}}}
    ]}"#;

    fn settings(team: &[&str]) -> JiraSettings {
        JiraSettings {
            url: "https://jira.example.com".to_string(),
            project: "ABC".to_string(),
            component: "UI".to_string(),
            prefix: "ui-".to_string(),
            team: team.iter().map(ToString::to_string).collect(),
            years: 2,
            timeout: Duration::from_secs(1),
        }
    }

    fn run_report(jira: &FakeJira, settings: &JiraSettings) -> Vec<String> {
        let mut sections = Vec::new();
        block_on(report(jira, settings, Lookback::new(2024, 2), |section| {
            sections.push(section.to_string());
        }));
        sections
    }

    #[test]
    fn sections_come_in_order() {
        let jira = FakeJira::with_default(BODY);
        let sections = run_report(&jira, &settings(&["alice"]));

        assert_eq!(sections.len(), 3);
        assert_eq!(
            sections[0],
            format!(
                "{:>20}{:>10}{:>10}\n{:>20}{:>10}{:>10}",
                "Name", 2024, 2023, "alice", "2/2", "2/2"
            )
        );
        assert!(sections[1].lines().nth(1).unwrap().trim_start().starts_with("ui-login"));
        assert_eq!(sections[1].lines().count(), 2);
        assert_eq!(
            sections[2],
            format!(
                "{:>20}{:>10}{:>10}\n{:>20}{:>10}{:>10}",
                "Label", 2024, 2023, "ui-login", "2/2", "2/2"
            )
        );
    }

    #[test]
    fn team_is_counted_across_the_whole_project() {
        let jira = FakeJira::with_default(BODY);
        run_report(&jira, &settings(&["alice"]));
        let seen = jira.seen.borrow();
        assert!(seen[0]
            .0
            .starts_with(r#"project = "ABC" AND assignee = "alice" AND created"#));
        assert!(seen
            .iter()
            .filter(|(jql, ..)| jql.contains("labels"))
            .all(|(jql, ..)| jql.contains(r#"component in ("UI")"#)));
    }

    #[test]
    fn empty_team_skips_its_table() {
        let jira = FakeJira::with_default(BODY);
        let sections = run_report(&jira, &settings(&[]));
        assert_eq!(sections.len(), 2);
        assert!(sections[0].trim_start().starts_with("Label"));
    }

    #[test]
    fn unreachable_jira_still_reports() {
        let jira = FakeJira::default();
        let sections = run_report(&jira, &settings(&["alice"]));
        assert_eq!(
            sections[0].lines().nth(1).unwrap(),
            format!("{:>20}{:>10}{:>10}", "alice", "?/?", "?/?")
        );
    }
}
