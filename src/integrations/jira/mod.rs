use std::time::Duration;

use log::{debug, error, info};
use miette::Diagnostic;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::{client_builder, receive, truncate, HttpError, DUMP_LIMIT};
use crate::{app_config::Credentials, jql::Query};

mod search;

#[cfg(test)]
pub(crate) use search::fake;
pub(crate) use search::{count, list_labels, search, Page, Search};

/// An open, authenticated Jira session.
///
/// The cookie issued on login is kept in this session's own [`Client`], every request made
/// through the session carries it automatically.
pub(crate) struct Session {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    session: Option<SessionInfo>,
}

#[derive(Debug, Deserialize)]
struct SessionInfo {
    name: String,
}

impl Session {
    /// Log in to the Jira instance at `base_url`.
    ///
    /// ## Errors
    /// 1. `base_url` is not a URL
    /// 2. The server can't be reached or doesn't answer in time
    /// 3. The server rejects the credentials or answers without a session
    pub(crate) async fn open(
        base_url: &str,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|err| Error::InvalidUrl {
            url: base_url.clone(),
            reason: err.to_string(),
        })?;
        let client = client_builder(timeout)
            .cookie_store(true)
            .build()
            .map_err(|source| Error::Client(Box::new(source)))?;

        let session_url = format!("{base_url}/rest/auth/1/session");
        debug!("Session URL: {session_url}");
        let request = client.post(&session_url).json(&LoginBody {
            username: &credentials.username,
            password: &credentials.password,
        });
        let body = match receive(request, &base_url, "creating a session").await {
            Err(HttpError::Status {
                status: 401 | 403,
                body,
                ..
            }) => {
                return Err(Error::Authentication {
                    host: base_url,
                    details: body,
                })
            }
            other => other?,
        };
        debug!("Response: {}", truncate(&body, DUMP_LIMIT));

        match serde_json::from_str::<LoginResponse>(&body) {
            Ok(LoginResponse {
                session: Some(session),
            }) => {
                info!("Jira session created successfully!");
                debug!("Session name: {}", session.name);
                Ok(Self { client, base_url })
            }
            _ => Err(Error::Authentication {
                host: base_url,
                details: truncate(&body, DUMP_LIMIT).to_string(),
            }),
        }
    }

    /// Authenticated GET of `path` (relative to the base URL) with `query` parameters.
    pub(crate) async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, Error> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!("Request URL: {url}");
        let request = self.client.get(&url).query(query);
        Ok(receive(request, &self.base_url, "requesting data").await?)
    }

    /// The raw description of the logged in user.
    pub(crate) async fn myself(&self) -> Result<String, Error> {
        self.get("rest/api/2/myself", &[]).await
    }

    /// Look up the numeric ID of the project with `project_key`.
    pub(crate) async fn project_id(&self, project_key: &str) -> Option<String> {
        let body = self
            .get("rest/api/2/project", &[])
            .await
            .map_err(|err| error!("{err}"))
            .ok()?;
        let Ok(projects) = serde_json::from_str::<Vec<ProjectSummary>>(&body) else {
            error!("Invalid result: {}...", truncate(&body, DUMP_LIMIT));
            return None;
        };
        let id = projects
            .into_iter()
            .find(|project| project.key.as_deref() == Some(project_key))
            .and_then(|project| project.id);
        if id.is_none() {
            error!("Project '{project_key}' not found");
        }
        id
    }

    /// Every label used anywhere in the project with `project_id`.
    pub(crate) async fn project_labels(&self, project_id: &str) -> Vec<String> {
        let path = format!("rest/gadget/1.0/labels/gadget/project-{project_id}/labels");
        let body = match self.get(&path, &[]).await {
            Ok(body) if !body.is_empty() => body,
            Ok(_) => {
                error!("Empty response for the labels of project {project_id}");
                return Vec::new();
            }
            Err(err) => {
                error!("{err}");
                return Vec::new();
            }
        };
        match serde_json::from_str::<LabelGroups>(&body) {
            Ok(groups) => groups
                .groups
                .into_iter()
                .flat_map(|group| group.labels)
                .map(|label| label.label)
                .collect(),
            Err(err) => {
                error!("Invalid labels response ({err}): {}", truncate(&body, DUMP_LIMIT));
                Vec::new()
            }
        }
    }
}

impl Search for Session {
    async fn search(&self, query: &Query, page: Page, fields: &[&str]) -> Result<String, Error> {
        debug!("JQL: {query}");
        self.get(
            "rest/api/2/search",
            &[
                ("jql", query.to_string()),
                ("startAt", page.start_at.to_string()),
                ("maxResults", page.max_results.to_string()),
                ("fields", fields.join(",")),
            ],
        )
        .await
    }
}

#[derive(Debug, Deserialize)]
struct ProjectSummary {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LabelGroups {
    #[serde(default)]
    groups: Vec<LabelGroup>,
}

#[derive(Debug, Default, Deserialize)]
struct LabelGroup {
    #[serde(default)]
    labels: Vec<GadgetLabel>,
}

#[derive(Debug, Deserialize)]
struct GadgetLabel {
    label: String,
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub(crate) enum Error {
    #[error("`{url}` is not a valid Jira URL: {reason}")]
    #[diagnostic(
        code(jira::invalid_url),
        help("Pass the base URL of the Jira instance, like https://jira.example.com")
    )]
    InvalidUrl { url: String, reason: String },
    #[error("Could not set up an HTTP client: {0}")]
    #[diagnostic(code(jira::client))]
    Client(#[source] Box<reqwest::Error>),
    #[error("Jira at {host} did not accept the credentials")]
    #[diagnostic(
        code(jira::authentication),
        help("Check the username and password. The server answered: {details}")
    )]
    Authentication { host: String, details: String },
    #[error(transparent)]
    #[diagnostic(transparent)]
    Http(#[from] HttpError),
}
