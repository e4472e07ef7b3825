use std::{fs, io, path::Path, time::Duration};

use log::{debug, error, warn};
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

pub(crate) mod toml;

pub(crate) use self::toml::ConfigLoader;

/// Read from the working directory unless `--config` says otherwise.
pub(crate) const CONFIG_PATH: &str = "gojira.toml";
pub(crate) const DEFAULT_YEARS: u16 = 5;
/// Seconds.
pub(crate) const DEFAULT_TIMEOUT: u64 = 30;

impl ConfigLoader {
    /// Parse the file at `path`. A file that doesn't exist is `Ok(None)`.
    ///
    /// ## Errors
    /// 1. The file exists but can't be read
    /// 2. The contents are not valid TOML or don't match the schema
    pub(crate) fn load(path: &Path) -> Result<Option<Self>, Error> {
        let source_code = match fs::read_to_string(path) {
            Ok(source_code) => source_code,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        Self::parse(source_code).map(Some)
    }

    fn parse(source_code: String) -> Result<Self, Error> {
        ::toml::from_str(&source_code).map_err(|err| Error::Toml {
            message: err.message().to_string(),
            span: err.span().map(SourceSpan::from),
            source_code,
        })
    }

    /// Like [`Self::load`], but a broken or missing file is only logged and nothing is configured.
    pub(crate) fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(Some(config)) => {
                debug!("Loaded {}", path.display());
                config
            }
            Ok(None) => {
                debug!("No {} found, using command line options only", path.display());
                Self::default()
            }
            Err(err) => {
                error!("{err}");
                warn!(
                    "Ignoring {}, using command line options and defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }
}

/// Jira options as given on the command line. Anything left out comes from the config file.
#[derive(Debug, Default)]
pub(crate) struct JiraArgs {
    pub(crate) url: Option<String>,
    pub(crate) project: Option<String>,
    pub(crate) component: Option<String>,
    pub(crate) prefix: Option<String>,
    pub(crate) team: Option<Vec<String>>,
    pub(crate) years: Option<u16>,
    pub(crate) timeout: Option<u64>,
}

/// Everything a Jira run needs, after merging arguments, config and defaults.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct JiraSettings {
    pub(crate) url: String,
    pub(crate) project: String,
    pub(crate) component: String,
    pub(crate) prefix: String,
    pub(crate) team: Vec<String>,
    pub(crate) years: u16,
    pub(crate) timeout: Duration,
}

impl JiraArgs {
    /// ## Errors
    /// 1. The URL, project or component is neither passed nor configured
    /// 2. `years` is 0
    pub(crate) fn resolve(self, config: &ConfigLoader) -> Result<JiraSettings, Error> {
        let section = config.jira.clone().unwrap_or_default();
        Ok(JiraSettings {
            url: required(self.url, section.url, "jira", "url")?,
            project: required(self.project, section.project, "jira", "project")?,
            component: required(self.component, section.component, "jira", "component")?,
            prefix: self.prefix.or(section.prefix).unwrap_or_default(),
            team: self.team.unwrap_or_else(|| config.team.clone()),
            years: years(self.years, section.years, "jira")?,
            timeout: timeout(self.timeout, config),
        })
    }
}

#[derive(Debug, Default)]
pub(crate) struct GerritArgs {
    pub(crate) urls: Option<Vec<String>>,
    pub(crate) team: Option<Vec<String>>,
    pub(crate) years: Option<u16>,
    pub(crate) timeout: Option<u64>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct GerritSettings {
    pub(crate) urls: Vec<String>,
    pub(crate) team: Vec<String>,
    pub(crate) years: u16,
    pub(crate) timeout: Duration,
}

impl GerritArgs {
    /// ## Errors
    /// 1. No server URL is passed or configured
    /// 2. `years` is 0
    pub(crate) fn resolve(self, config: &ConfigLoader) -> Result<GerritSettings, Error> {
        let section = config.gerrit.clone().unwrap_or_default();
        let urls = self.urls.unwrap_or(section.url);
        if urls.is_empty() {
            return Err(Error::Missing {
                section: "gerrit",
                setting: "url",
            });
        }
        Ok(GerritSettings {
            urls,
            team: self.team.unwrap_or_else(|| config.team.clone()),
            years: years(self.years, section.years, "gerrit")?,
            timeout: timeout(self.timeout, config),
        })
    }
}

fn required(
    arg: Option<String>,
    configured: Option<String>,
    section: &'static str,
    setting: &'static str,
) -> Result<String, Error> {
    arg.or(configured)
        .filter(|value| !value.trim().is_empty())
        .ok_or(Error::Missing { section, setting })
}

fn years(arg: Option<u16>, configured: Option<u16>, section: &'static str) -> Result<u16, Error> {
    match arg.or(configured) {
        Some(0) => Err(Error::Invalid {
            section,
            setting: "years",
            reason: "at least one year is needed",
        }),
        years => Ok(years.unwrap_or(DEFAULT_YEARS)),
    }
}

fn timeout(arg: Option<u64>, config: &ConfigLoader) -> Duration {
    let seconds = arg.or(config.timeout).filter(|&seconds| seconds > 0);
    Duration::from_secs(seconds.unwrap_or(DEFAULT_TIMEOUT))
}

#[derive(Debug, Diagnostic, Error)]
pub(crate) enum Error {
    #[error("Could not read {path}: {source}")]
    #[diagnostic(code(config::read))]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Invalid config: {message}")]
    #[diagnostic(
        code(config::toml),
        help("Check the TOML is valid. Known keys are team, timeout, [jira] and [gerrit].")
    )]
    Toml {
        message: String,
        #[label("here")]
        span: Option<SourceSpan>,
        #[source_code]
        source_code: String,
    },
    #[error("No {section} {setting} was given")]
    #[diagnostic(
        code(config::missing),
        help("Pass --{setting} or set `{setting}` in the [{section}] section of gojira.toml")
    )]
    Missing {
        section: &'static str,
        setting: &'static str,
    },
    #[error("The {section} {setting} setting is invalid: {reason}")]
    #[diagnostic(
        code(config::invalid),
        help("Fix `{setting}` in the [{section}] section of gojira.toml")
    )]
    Invalid {
        section: &'static str,
        setting: &'static str,
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn config(source: &str) -> ConfigLoader {
        ConfigLoader::parse(source.to_string()).unwrap()
    }

    const FULL: &str = r#"
        team = ["alice", "bob"]
        timeout = 10
        [jira]
        url = "https://jira.example.com"
        project = "ABC"
        component = "UI"
        years = 3
        [gerrit]
        url = ["https://gerrit.example.com"]
    "#;

    #[test]
    fn config_fills_in_for_missing_args() {
        let settings = JiraArgs::default().resolve(&config(FULL)).unwrap();
        assert_eq!(
            settings,
            JiraSettings {
                url: "https://jira.example.com".to_string(),
                project: "ABC".to_string(),
                component: "UI".to_string(),
                prefix: String::new(),
                team: vec!["alice".to_string(), "bob".to_string()],
                years: 3,
                timeout: Duration::from_secs(10),
            }
        );
    }

    #[test]
    fn args_win_over_config() {
        let args = JiraArgs {
            project: Some("XYZ".to_string()),
            team: Some(vec!["carol".to_string()]),
            years: Some(1),
            timeout: Some(2),
            ..JiraArgs::default()
        };
        let settings = args.resolve(&config(FULL)).unwrap();
        assert_eq!(settings.project, "XYZ");
        assert_eq!(settings.component, "UI");
        assert_eq!(settings.team, vec!["carol"]);
        assert_eq!(settings.years, 1);
        assert_eq!(settings.timeout, Duration::from_secs(2));
    }

    #[test]
    fn defaults() {
        let args = JiraArgs {
            url: Some("https://jira.example.com".to_string()),
            project: Some("ABC".to_string()),
            component: Some("UI".to_string()),
            ..JiraArgs::default()
        };
        let settings = args.resolve(&ConfigLoader::default()).unwrap();
        assert_eq!(settings.years, DEFAULT_YEARS);
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT));
        assert!(settings.team.is_empty());
    }

    #[test]
    fn missing_project() {
        let args = JiraArgs {
            url: Some("https://jira.example.com".to_string()),
            project: Some("  ".to_string()),
            ..JiraArgs::default()
        };
        let err = args.resolve(&ConfigLoader::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Missing {
                section: "jira",
                setting: "project"
            }
        ));
    }

    #[test]
    fn zero_years_in_config_is_rejected() {
        let config = config(
            "[jira]\nurl = \"https://jira.example.com\"\nproject = \"ABC\"\ncomponent = \"UI\"\nyears = 0\n\n[gerrit]\nurl = [\"https://gerrit.example.com\"]\nyears = 0\n",
        );
        let err = JiraArgs::default().resolve(&config).unwrap_err();
        assert!(
            matches!(
                err,
                Error::Invalid {
                    section: "jira",
                    setting: "years",
                    ..
                }
            ),
            "{err:?}"
        );
        let err = GerritArgs::default().resolve(&config).unwrap_err();
        assert!(matches!(err, Error::Invalid { section: "gerrit", .. }), "{err:?}");

        let args = JiraArgs {
            years: Some(2),
            ..JiraArgs::default()
        };
        assert_eq!(args.resolve(&config).unwrap().years, 2);
    }

    #[test]
    fn gerrit_urls() {
        let settings = GerritArgs::default().resolve(&config(FULL)).unwrap();
        assert_eq!(settings.urls, vec!["https://gerrit.example.com"]);
        assert_eq!(settings.years, DEFAULT_YEARS);

        let err = GerritArgs::default()
            .resolve(&ConfigLoader::default())
            .unwrap_err();
        assert!(matches!(err, Error::Missing { section: "gerrit", .. }));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigLoader::load(&dir.path().join(CONFIG_PATH))
            .unwrap()
            .is_none());
    }

    #[test]
    fn invalid_file_points_at_the_problem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_PATH);
        fs::write(&path, "[jira]\nproject = \"ABC\"\nboard = 7\n").unwrap();
        let err = ConfigLoader::load(&path).unwrap_err();
        assert!(
            matches!(err, Error::Toml { span: Some(_), .. }),
            "{err:?}"
        );
        assert!(ConfigLoader::load_or_default(&path).jira.is_none());
    }
}
