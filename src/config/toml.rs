use serde::Deserialize;

/// The contents of a `gojira.toml` file. Every key is optional, anything unknown is an error.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigLoader {
    /// The people to collect statistics for, by Jira username and Gerrit owner
    #[serde(default)]
    pub(crate) team: Vec<String>,
    /// Seconds to wait for any single request
    #[serde(default)]
    pub(crate) timeout: Option<u64>,
    #[serde(default)]
    pub(crate) jira: Option<Jira>,
    #[serde(default)]
    pub(crate) gerrit: Option<Gerrit>,
}

/// Where to find Jira and which part of it to report on.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Jira {
    /// The base URL of the Jira instance
    pub(crate) url: Option<String>,
    /// The key of the project every query is limited to
    pub(crate) project: Option<String>,
    pub(crate) component: Option<String>,
    /// Only labels starting with this are reported on
    pub(crate) prefix: Option<String>,
    pub(crate) years: Option<u16>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Gerrit {
    /// One or more Gerrit servers, each reported on separately
    #[serde(default)]
    pub(crate) url: Vec<String>,
    pub(crate) years: Option<u16>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::ConfigLoader;

    #[test]
    fn everything() {
        let config: ConfigLoader = toml::from_str(
            r#"
            team = ["alice", "bob"]
            timeout = 10

            [jira]
            url = "https://jira.example.com"
            project = "ABC"
            component = "UI"
            prefix = "ui-"
            years = 3

            [gerrit]
            url = ["https://gerrit.example.com", "https://review.example.org"]
            years = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.team, vec!["alice", "bob"]);
        assert_eq!(config.timeout, Some(10));
        let jira = config.jira.unwrap();
        assert_eq!(jira.project.as_deref(), Some("ABC"));
        assert_eq!(jira.years, Some(3));
        assert_eq!(config.gerrit.unwrap().url.len(), 2);
    }

    #[test]
    fn empty_file() {
        let config: ConfigLoader = toml::from_str("").unwrap();
        assert!(config.team.is_empty());
        assert!(config.jira.is_none());
        assert!(config.gerrit.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<ConfigLoader>("teams = [\"alice\"]").is_err());
        assert!(toml::from_str::<ConfigLoader>("[jira]\nuser = \"alice\"").is_err());
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(toml::from_str::<ConfigLoader>("timeout = \"soon\"").is_err());
        assert!(toml::from_str::<ConfigLoader>("[jira]\nyears = -1").is_err());
    }
}
