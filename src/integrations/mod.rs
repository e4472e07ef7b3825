use std::time::Duration;

use miette::Diagnostic;
use reqwest::{Client, ClientBuilder, RequestBuilder};

pub(crate) mod gerrit;
pub(crate) mod jira;

/// Longest slice of a response body that ends up in a log message.
pub(crate) const DUMP_LIMIT: usize = 2000;

/// Every backend gets its own client, so auth state (cookies included) never leaks between them.
fn client_builder(timeout: Duration) -> ClientBuilder {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
}

/// Send `request` and read the whole body, turning anything but a 2xx answer into an error.
async fn receive(
    request: RequestBuilder,
    host: &str,
    activity: &'static str,
) -> Result<String, HttpError> {
    let transport = |source: reqwest::Error| {
        if source.is_timeout() {
            HttpError::Timeout {
                activity,
                host: host.to_string(),
            }
        } else {
            HttpError::Transport {
                activity,
                host: host.to_string(),
                source: Box::new(source),
            }
        }
    };
    let response = request.send().await.map_err(transport)?;
    let status = response.status();
    let body = response.text().await.map_err(transport)?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(HttpError::Status {
            activity,
            host: host.to_string(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default(),
            body: truncate(&body, DUMP_LIMIT).to_string(),
        })
    }
}

/// Cut `body` down to at most `limit` characters for logging.
pub(crate) fn truncate(body: &str, limit: usize) -> &str {
    match body.char_indices().nth(limit) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub(crate) enum HttpError {
    #[error("Timed out waiting for {host} while {activity}")]
    #[diagnostic(
        code(http::timeout),
        help("The server may be overloaded or unreachable. Try a larger --timeout.")
    )]
    Timeout { activity: &'static str, host: String },
    #[error("Trouble communicating with {host} while {activity}: {source}")]
    #[diagnostic(
        code(http::request),
        help("This may be a network issue, check that {host} is reachable.")
    )]
    Transport {
        activity: &'static str,
        host: String,
        #[source]
        source: Box<reqwest::Error>,
    },
    #[error("{host} answered {status} {reason} while {activity}")]
    #[diagnostic(code(http::status), help("Response body: {body}"))]
    Status {
        activity: &'static str,
        host: String,
        status: u16,
        reason: &'static str,
        body: String,
    },
}
