// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Registrar: resolves project, location, and agent identities against the
//! index service at startup, materializing per-project endpoints.

use tracing::debug;
use uuid::Uuid;

use crate::client::IndexClient;
use crate::config::{Config, ProjectConfig};
use crate::error::{Error, Result};

/// Ensures every project in `config` has a remote id and document endpoint,
/// checking an id already on file or looking up by name, creating the
/// project remotely as a last resort.
///
/// Stamps the already-resolved `location_id`/`agent_id` onto each project
/// too, since every document it produces carries them. Mutates each
/// `ProjectConfig` in place; the caller persists the updated `Config` once
/// all three `ensure_*` steps succeed.
pub fn ensure_projects(
    client: &IndexClient,
    base_url: &str,
    location_id: &str,
    agent_id: &str,
    projects: &mut [ProjectConfig],
) -> Result<()> {
    for project in projects {
        let (id, endpoint) = match &project.id {
            Some(id) => {
                if !client.verify_exists(base_url, "projects", id)? {
                    return Err(Error::Config(format!(
                        "project id {id} does not appear to exist - was it deleted?"
                    )));
                }
                (id.clone(), client.get_project_endpoint(base_url, id)?)
            }
            None => match client.find_by_name(base_url, "projects", &project.name)? {
                Some(id) => {
                    let endpoint = client.get_project_endpoint(base_url, &id)?;
                    (id, endpoint)
                }
                None => client.create_project(base_url, &project.name)?,
            },
        };

        debug!(project = %project.name, %endpoint, "resolved project endpoint");
        project.id = Some(id);
        project.endpoint = Some(endpoint);
        project.location = location_id.to_string();
        project.agent = agent_id.to_string();
    }
    Ok(())
}

/// Ensures `config`'s location has a remote id, looking it up by name or
/// creating it as a last resort.
pub fn ensure_location(client: &IndexClient, base_url: &str, config: &mut Config) -> Result<()> {
    if config.location.id.is_some() {
        return Ok(());
    }

    if let Some(id) = client.find_by_name(base_url, "locations", &config.location.name)? {
        config.location.id = Some(id);
        return Ok(());
    }

    let hostname = hostname();
    let id = client.create_location(base_url, &format!("{}@{hostname}", config.location.name))?;
    config.location.id = Some(id);
    Ok(())
}

/// Ensures `config`'s agent has a remote id, generating one locally if
/// absent and creating the corresponding useragent record remotely if it
/// doesn't already exist.
pub fn ensure_agent(client: &IndexClient, base_url: &str, config: &mut Config) -> Result<()> {
    if config.agent.id.is_none() {
        config.agent.id = Some(Uuid::new_v4().to_string());
    }
    let agent_id = config.agent.id.clone().expect("just set above");

    if client.verify_exists(base_url, "useragents", &agent_id)? {
        debug!(agent = %agent_id, "useragent already registered");
        return Ok(());
    }

    let user = client.get_logged_in_user(base_url)?;
    let label = format!("{agent_id}:{user}");
    let created = client.create_useragent(base_url, &label)?;
    debug!(agent = %created, "useragent created");
    Ok(())
}

/// Returns the machine's hostname via the OS, not an environment variable:
/// `HOSTNAME` is a shell variable, not something a daemon started by
/// systemd/cron/init inherits, so env-sniffing would silently degrade to
/// the fallback on the most common way this binary actually runs.
fn hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_resolves_to_a_nonempty_name() {
        // Every CI/dev machine has a real hostname, so this should always
        // take the `hostname::get()` path rather than the fallback.
        let name = hostname();
        assert!(!name.is_empty());
    }
}
