//! Change counts per owner from a Gerrit server.

use std::{fmt, time::Duration};

use base64::{prelude::BASE64_STANDARD as base64, Engine};
use indexmap::IndexMap;
use log::{debug, error, warn};
use miette::Diagnostic;
use reqwest::{header::AUTHORIZATION, Client, Url};
use serde::Deserialize;

use super::{client_builder, receive, truncate, HttpError, DUMP_LIMIT};
use crate::{app_config::Netrc, jql::quote};

/// Every JSON body Gerrit sends starts with this, to stop it being run as a script.
pub(crate) const MAGIC_PREFIX: &str = ")]}'";

pub(crate) mod status {
    pub(crate) const MERGED: &str = "MERGED";
    pub(crate) const NEW: &str = "NEW";
    pub(crate) const ABANDONED: &str = "ABANDONED";
}

/// Number of changes per status, in the order the statuses were first seen.
pub(crate) type ChangeCounts = IndexMap<String, u64>;

#[derive(Debug, Deserialize)]
pub(crate) struct Change {
    #[serde(default)]
    status: Option<String>,
}

/// Changes owned by `owner` created during `year`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ChangeQuery<'a> {
    pub(crate) owner: &'a str,
    pub(crate) year: i32,
}

impl fmt::Display for ChangeQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "after:{}-01-01 before:{}-01-01 owner:{}",
            self.year,
            self.year + 1,
            quote(self.owner)
        )
    }
}

/// A client for one Gerrit server, authenticated with netrc credentials when there are some.
pub(crate) struct Gerrit {
    client: Client,
    base_url: String,
    authorization: Option<String>,
}

impl Gerrit {
    pub(crate) fn new(base_url: &str, timeout: Duration, netrc: Option<&Netrc>) -> Result<Self, Error> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let invalid = |reason: String| Error::InvalidUrl {
            url: base_url.clone(),
            reason,
        };
        let url = Url::parse(&base_url).map_err(|err| invalid(err.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid(String::from("there is no host")))?;

        let authorization = match netrc.and_then(|netrc| netrc.machine(host)) {
            Some(machine) => {
                debug!("Using netrc credentials for {host}");
                let credentials = format!("{}:{}", machine.login, machine.password);
                Some(format!("Basic {}", base64.encode(credentials)))
            }
            None => {
                warn!("No netrc entry found for {host}, requesting without authentication");
                None
            }
        };

        let client = client_builder(timeout)
            .build()
            .map_err(|source| Error::Client(Box::new(source)))?;
        Ok(Self {
            client,
            base_url,
            authorization,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The raw (still prefixed) body of a change search.
    pub(crate) async fn query_changes(&self, query: &ChangeQuery<'_>) -> Result<String, Error> {
        // Only the `/a/` endpoints check credentials.
        let endpoint = if self.authorization.is_some() {
            "a/changes/"
        } else {
            "changes/"
        };
        let url = format!("{}/{endpoint}", self.base_url);
        debug!("Request URL: {url}?q={query}");
        let mut request = self.client.get(&url).query(&[("q", query.to_string())]);
        if let Some(authorization) = &self.authorization {
            request = request.header(AUTHORIZATION, authorization.as_str());
        }
        Ok(receive(request, &self.base_url, "querying changes").await?)
    }

    /// Changes per status for `owner` in `year`. Any failure is logged and gives `None`.
    pub(crate) async fn change_counts(&self, owner: &str, year: i32) -> Option<ChangeCounts> {
        let query = ChangeQuery { owner, year };
        let changes = match self.query_changes(&query).await {
            Ok(body) => parse_changes(&body),
            Err(err) => Err(err),
        };
        match changes {
            Ok(changes) => Some(count_statuses(&changes)),
            Err(err) => {
                error!("{err}");
                None
            }
        }
    }
}

/// Strip [`MAGIC_PREFIX`] and parse the list of changes that follows.
pub(crate) fn parse_changes(body: &str) -> Result<Vec<Change>, Error> {
    let json = body
        .strip_prefix(MAGIC_PREFIX)
        .ok_or_else(|| Error::MissingPrefix {
            body: truncate(body, DUMP_LIMIT).to_string(),
        })?;
    serde_json::from_str(json).map_err(|source| Error::Parse {
        source,
        body: truncate(json, DUMP_LIMIT).to_string(),
    })
}

pub(crate) fn count_statuses(changes: &[Change]) -> ChangeCounts {
    let mut counts = ChangeCounts::new();
    for status in changes.iter().filter_map(|change| change.status.as_deref()) {
        *counts.entry(status.to_string()).or_default() += 1;
    }
    counts
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub(crate) enum Error {
    #[error("`{url}` is not a valid Gerrit URL: {reason}")]
    #[diagnostic(
        code(gerrit::invalid_url),
        help("Pass the base URL of the Gerrit server, like https://gerrit.example.com")
    )]
    InvalidUrl { url: String, reason: String },
    #[error("Could not set up an HTTP client: {0}")]
    #[diagnostic(code(gerrit::client))]
    Client(#[source] Box<reqwest::Error>),
    #[error("Gerrit response does not start with )]}}': {body}")]
    #[diagnostic(
        code(gerrit::missing_prefix),
        help("The URL may not point at a Gerrit server, or a login page was returned.")
    )]
    MissingPrefix { body: String },
    #[error("Could not decode Gerrit changes: {source}")]
    #[diagnostic(code(gerrit::parse), help("Response body: {body}"))]
    Parse {
        #[source]
        source: serde_json::Error,
        body: String,
    },
    #[error(transparent)]
    #[diagnostic(transparent)]
    Http(#[from] HttpError),
}
