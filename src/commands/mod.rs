use log::info;

pub(crate) mod gerrit;
pub(crate) mod jira;

/// Mark the start of a section in the log.
fn banner(title: &str) {
    info!("***** {title} *****");
}
