use std::{
    env,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use miette::Diagnostic;

use crate::prompt::get_input;

/// Username and password handed to Jira when opening a session.
#[derive(Clone)]
pub(crate) struct Credentials {
    pub(crate) username: String,
    pub(crate) password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Fill in whatever wasn't passed: the username from the OS account, the password from a prompt.
pub(crate) fn jira_credentials(
    username: Option<String>,
    password: Option<String>,
) -> Result<Credentials, Error> {
    let username = match username {
        Some(username) => username,
        None => os_username().ok_or(Error::NoUsername)?,
    };
    let password = match password {
        Some(password) => password,
        None => get_input(&format!("Enter the Jira password for {username}"))?,
    };
    Ok(Credentials { username, password })
}

fn os_username() -> Option<String> {
    ["USER", "USERNAME", "LOGNAME"]
        .into_iter()
        .find_map(|key| env::var(key).ok().filter(|value| !value.is_empty()))
}

/// Login details for one host in a netrc file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Machine {
    pub(crate) login: String,
    pub(crate) password: String,
}

/// The `machine` entries (and optional `default` entry) of a netrc file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Netrc {
    machines: Vec<(String, Machine)>,
    default: Option<Machine>,
}

impl Netrc {
    /// Read `$NETRC`, falling back to `~/.netrc`. A missing or unreadable file gives `None`.
    pub(crate) fn load() -> Option<Self> {
        let path = env::var_os("NETRC")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".netrc")))?;
        Self::read(&path)
    }

    fn read(path: &Path) -> Option<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                debug!("Using credentials from {}", path.display());
                Some(Self::parse(&contents))
            }
            Err(err) => {
                warn!("Could not read {}: {err}", path.display());
                None
            }
        }
    }

    /// Parse netrc syntax. Macro definitions are skipped, unknown tokens are ignored.
    pub(crate) fn parse(contents: &str) -> Self {
        enum Entry {
            Machine(String),
            Default,
        }

        let mut netrc = Self::default();
        let mut current: Option<(Entry, Machine)> = None;
        let mut in_macro = false;

        let finish = |current: Option<(Entry, Machine)>, netrc: &mut Self| match current {
            Some((Entry::Machine(host), machine)) => netrc.machines.push((host, machine)),
            Some((Entry::Default, machine)) => netrc.default = Some(machine),
            None => {}
        };

        for line in contents.lines() {
            if in_macro {
                in_macro = !line.trim().is_empty();
                continue;
            }
            let mut tokens = line.split_whitespace();
            while let Some(token) = tokens.next() {
                match token {
                    "machine" => {
                        finish(current.take(), &mut netrc);
                        if let Some(host) = tokens.next() {
                            current = Some((Entry::Machine(host.to_string()), Machine::default()));
                        }
                    }
                    "default" => {
                        finish(current.take(), &mut netrc);
                        current = Some((Entry::Default, Machine::default()));
                    }
                    "login" => {
                        if let (Some((_, machine)), Some(login)) = (current.as_mut(), tokens.next()) {
                            machine.login = login.to_string();
                        }
                    }
                    "password" => {
                        if let (Some((_, machine)), Some(password)) =
                            (current.as_mut(), tokens.next())
                        {
                            machine.password = password.to_string();
                        }
                    }
                    "account" => {
                        tokens.next();
                    }
                    "macdef" => {
                        finish(current.take(), &mut netrc);
                        in_macro = true;
                        break;
                    }
                    _ => {}
                }
            }
        }
        finish(current, &mut netrc);
        netrc
    }

    /// Credentials for `host`, or the `default` entry if there is no exact match.
    pub(crate) fn machine(&self, host: &str) -> Option<&Machine> {
        self.machines
            .iter()
            .find(|(name, _)| name == host)
            .map(|(_, machine)| machine)
            .or(self.default.as_ref())
    }
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub(crate) enum Error {
    #[error("Could not determine a username")]
    #[diagnostic(
        code(app_config::no_username),
        help("Pass one with --username")
    )]
    NoUsername,
    #[error(transparent)]
    #[diagnostic(transparent)]
    Prompt(#[from] crate::prompt::Error),
}
