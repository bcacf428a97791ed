// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Configuration loading, validation, and scaffold regeneration.

pub mod project;

use chrono::Utc;
use configparser::ini::Ini;
use std::fs;
use std::path::{Path, PathBuf};

pub use project::{PathRules, ProjectConfig, RichMetadata};

use crate::error::{Error, Result};

/// API host configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Index service host, e.g. `https://index.example.com`.
    pub host: String,
    /// Optional port, appended to `host` as `:port`.
    pub port: Option<u16>,
}

impl ApiConfig {
    /// Returns `host`, with `:port` appended if one was configured.
    #[must_use]
    pub fn base_url(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{port}", self.host),
            None => self.host.clone(),
        }
    }
}

/// Agent-wide configuration, shared across projects.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Remote agent id, if already registered.
    pub id: Option<String>,
    /// Minimum file age in days before a file is admitted.
    pub mtime_days: u64,
    /// Minimum file size in bytes before a file is admitted.
    pub minsize: u64,
    /// Console/file log level (`trace`/`debug`/`info`/`warn`/`error`).
    pub loglevel: String,
}

/// Location configuration, shared across projects on this agent.
#[derive(Debug, Clone)]
pub struct LocationConfig {
    /// Human-readable location name.
    pub name: String,
    /// Remote location id, if already registered.
    pub id: Option<String>,
}

/// Fully loaded configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path the configuration was loaded from.
    pub path: PathBuf,
    /// API section.
    pub api: ApiConfig,
    /// Agent section.
    pub agent: AgentConfig,
    /// Location section.
    pub location: LocationConfig,
    /// One entry per configured project.
    pub projects: Vec<ProjectConfig>,
}

const REQUIRED_PROJECT_KEYS: &[&str] = &["rootdir", "name"];

impl Config {
    /// Loads and validates configuration from `path`.
    ///
    /// On a missing required field, writes a `.old` backup of the broken
    /// file, regenerates a default scaffold in its place, and returns
    /// [`Error::Config`] describing the offending field; the caller (the
    /// Supervisor) is expected to log this and exit non-zero, per the
    /// config-invalid policy.
    pub fn load(path: &Path) -> Result<Self> {
        let mut ini = Ini::new();
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        ini.read(text).map_err(Error::Config)?;

        match Self::from_ini(path, &ini) {
            Ok(config) => Ok(config),
            Err(err) => {
                regenerate_scaffold(path)?;
                Err(err)
            }
        }
    }

    fn from_ini(path: &Path, ini: &Ini) -> Result<Self> {
        let host = ini
            .get("api", "host")
            .ok_or(Error::MissingConfig("api.host"))?;
        let port = ini.getuint("api", "port").ok().flatten().map(|p| p as u16);

        let mtime_days = ini.getuint("agent", "mtime").ok().flatten().unwrap_or(0);
        let minsize = ini.getuint("agent", "minsize").ok().flatten().unwrap_or(0);
        let loglevel = ini
            .get("agent", "loglevel")
            .unwrap_or_else(|| "info".to_string());
        let agent_id = ini.get("agent", "id");

        let location_name = ini
            .get("location", "name")
            .ok_or(Error::MissingConfig("location.name"))?;
        let location_id = ini.get("location", "id");

        let project_list = ini
            .get("projects", "project_list")
            .ok_or(Error::MissingConfig("projects.project_list"))?;

        let mut projects = Vec::new();
        for name in project_list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            projects.push(Self::project_from_ini(ini, name)?);
        }

        Ok(Self {
            path: path.to_path_buf(),
            api: ApiConfig { host, port },
            agent: AgentConfig { id: agent_id, mtime_days, minsize, loglevel },
            location: LocationConfig { name: location_name, id: location_id },
            projects,
        })
    }

    fn project_from_ini(ini: &Ini, section: &str) -> Result<ProjectConfig> {
        for key in REQUIRED_PROJECT_KEYS {
            if ini.get(section, key).is_none() {
                return Err(Error::Config(format!("[{section}] missing required key `{key}`")));
            }
        }

        let root_dir = PathBuf::from(ini.get(section, "rootdir").expect("checked above"));
        let name = ini.get(section, "name").expect("checked above");

        let rules = PathRules {
            included_files: split_list(ini.get(section, "included_files")),
            excluded_files: split_list(ini.get(section, "excluded_files")),
            included_dirs: split_list(ini.get(section, "included_dirs")),
            excluded_dirs: split_list(ini.get(section, "excluded_dirs")),
        };

        let rich_metadata = match ini.get(section, "rich_metadata").as_deref() {
            Some("enabled") => RichMetadata::Enabled,
            _ => RichMetadata::Disabled,
        };

        Ok(ProjectConfig {
            name,
            root_dir,
            endpoint: ini.get(section, "endpoint"),
            rules,
            tika_host: ini.get(section, "tika_host"),
            rich_metadata,
            id: ini.get(section, "id"),
            location: String::new(),
            agent: String::new(),
            minsize: 0,
            mtime_days: 0,
        })
    }

    /// Persists the current configuration back to [`Config::path`], used by
    /// the Registrar after it materializes `id`/`endpoint` fields.
    pub fn save(&self) -> Result<()> {
        let mut ini = Ini::new();
        ini.set("api", "host", Some(self.api.host.clone()));
        if let Some(port) = self.api.port {
            ini.set("api", "port", Some(port.to_string()));
        }
        ini.set("agent", "mtime", Some(self.agent.mtime_days.to_string()));
        ini.set("agent", "minsize", Some(self.agent.minsize.to_string()));
        ini.set("agent", "loglevel", Some(self.agent.loglevel.clone()));
        if let Some(id) = &self.agent.id {
            ini.set("agent", "id", Some(id.clone()));
        }
        ini.set("location", "name", Some(self.location.name.clone()));
        if let Some(id) = &self.location.id {
            ini.set("location", "id", Some(id.clone()));
        }

        let names: Vec<&str> = self.projects.iter().map(|p| p.name.as_str()).collect();
        ini.set("projects", "project_list", Some(names.join(",")));

        for project in &self.projects {
            let section = &project.name;
            ini.set(section, "rootdir", Some(project.root_dir.display().to_string()));
            ini.set(section, "name", Some(project.name.clone()));
            ini.set(section, "included_files", Some(project.rules.included_files.join(",")));
            ini.set(section, "excluded_files", Some(project.rules.excluded_files.join(",")));
            ini.set(section, "included_dirs", Some(project.rules.included_dirs.join(",")));
            ini.set(section, "excluded_dirs", Some(project.rules.excluded_dirs.join(",")));
            if let Some(host) = &project.tika_host {
                ini.set(section, "tika_host", Some(host.clone()));
            }
            if project.rich_metadata == RichMetadata::Enabled {
                ini.set(section, "rich_metadata", Some("enabled".to_string()));
            }
            if let Some(id) = &project.id {
                ini.set(section, "id", Some(id.clone()));
            }
            if let Some(endpoint) = &project.endpoint {
                ini.set(section, "endpoint", Some(endpoint.clone()));
            }
        }

        ini.write(&self.path).map_err(Error::BareIo)
    }
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Backs up the existing configuration file with a `.old` suffix and writes
/// a default scaffold in its place.
fn regenerate_scaffold(path: &Path) -> Result<()> {
    if path.exists() {
        let backup = path.with_extension(format!(
            "old.{}",
            Utc::now().format("%Y%m%d%H%M%S")
        ));
        fs::copy(path, &backup).map_err(|e| Error::io(&backup, e))?;
    }
    fs::write(path, DEFAULT_SCAFFOLD).map_err(|e| Error::io(path, e))
}

const DEFAULT_SCAFFOLD: &str = "\
[api]
host = https://index.example.com

[agent]
mtime = 0
minsize = 0
loglevel = info

[location]
name = default

[projects]
project_list =
";

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radiam.txt");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_minimal_valid_config() {
        let (_dir, path) = write_config(
            "[api]\nhost = https://idx.example.com\n\n\
             [agent]\nmtime = 0\nminsize = 0\n\n\
             [location]\nname = hq\n\n\
             [projects]\nproject_list = docs\n\n\
             [docs]\nrootdir = /data/docs\nname = docs\n",
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.projects.len(), 1);
        assert_eq!(config.projects[0].root_dir, PathBuf::from("/data/docs"));
        assert_eq!(config.location.name, "hq");
    }

    #[test]
    fn missing_required_field_regenerates_scaffold_with_backup() {
        let (_dir, path) = write_config("[api]\nhost = https://idx.example.com\n");
        let result = Config::load(&path);
        assert!(result.is_err());

        let regenerated = fs::read_to_string(&path).unwrap();
        assert_eq!(regenerated, DEFAULT_SCAFFOLD);

        let has_backup = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(std::result::Result::ok)
            .any(|e| e.file_name().to_string_lossy().contains(".old."));
        assert!(has_backup, "expected a .old backup file to exist");
    }

    #[test]
    fn split_list_trims_and_drops_blanks() {
        assert_eq!(
            split_list(Some("a, b ,,c".to_string())),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }
}
