//! Fleet configuration module
//!
//! Parses and validates the fleet descriptor from a YAML file.
//!
//! Uses serde_yaml for parsing. Defaults come from the `default_*` functions
//! below; everything that needs cross-field knowledge (interval clamping, the
//! kill-policy exclusivity, per-server fallbacks) happens after validation in
//! [`FleetConfig::normalize`].

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::fleet::ServerTarget;
use crate::policy::KillPolicy;

/// Every KF2 map file name starts with this prefix.
pub const MAP_PREFIX: &str = "KF-";

/// Shortest allowed check interval, in seconds.
pub const MIN_CHECK_INTERVAL: u64 = 60;

/// Interval used when none is configured or the configured one is too short.
pub const DEFAULT_CHECK_INTERVAL: u64 = 300;

/// Game types understood by the WebAdmin map-change form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Survival,
    Endless,
    Objective,
    VersusSurvival,
    WeeklySurvival,
}

impl GameMode {
    /// Game-info class name as posted in the `gametype` form field.
    pub fn class_name(&self) -> &'static str {
        match self {
            GameMode::Survival => "KFGameContent.KFGameInfo_Survival",
            GameMode::Endless => "KFGameContent.KFGameInfo_Endless",
            GameMode::Objective => "KFGameContent.KFGameInfo_Objective",
            GameMode::VersusSurvival => "KFGameContent.KFGameInfo_VersusSurvival",
            GameMode::WeeklySurvival => "KFGameContent.KFGameInfo_WeeklySurvival",
        }
    }
}

/// One managed server instance as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    pub name: String,

    /// WebAdmin port, combined with `server_address`
    pub port: u16,

    /// Falls back to the fleet-wide `desired_map`
    #[serde(default)]
    pub desired_map: Option<String>,

    /// Falls back to the fleet-wide `game_mode`
    #[serde(default)]
    pub game_mode: Option<GameMode>,

    /// Passed through as `?ConfigSubDir=` on map changes
    #[serde(default)]
    pub config_subfolder: String,

    /// Disabled servers are never contacted
    #[serde(default)]
    pub disabled: bool,
}

/// Main fleet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    // ============================================
    // Fleet-wide defaults
    // ============================================
    #[serde(default = "default_desired_map")]
    pub desired_map: String,

    #[serde(default)]
    pub game_mode: GameMode,

    // ============================================
    // WebAdmin access
    // ============================================
    /// Scheme and host shared by every server, e.g. `http://192.168.1.222`
    #[serde(default = "default_server_address")]
    pub server_address: String,

    pub username: String,
    pub password: String,

    /// Seconds between two fleet checks
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,

    // ============================================
    // Idle shutdown
    // ============================================
    /// Shut a server down as soon as it is found empty
    #[serde(default)]
    pub kill_on_empty: bool,

    /// Shut empty servers down once this local hour has passed (-1 = never)
    #[serde(default = "default_kill_after_hour")]
    pub kill_after_hour: i32,

    // ============================================
    // Servers
    // ============================================
    pub servers: Vec<ServerEntry>,
}

// ============================================
// Default value functions
// ============================================

fn default_desired_map() -> String {
    "KF-BioticsLab".to_string()
}

fn default_server_address() -> String {
    "http://127.0.0.1".to_string()
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL
}

fn default_kill_after_hour() -> i32 {
    -1
}

/// Prefix a map name with `KF-` unless it already carries it.
///
/// The comparison is case-insensitive so `kf-bioticslab` is left alone.
pub fn normalize_map_name(name: &str) -> String {
    let name = name.trim();
    let has_prefix = name
        .get(..MAP_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(MAP_PREFIX));
    if has_prefix {
        name.to_string()
    } else {
        format!("{}{}", MAP_PREFIX, name)
    }
}

impl FleetConfig {
    /// Load, validate and normalize configuration from a YAML file
    ///
    /// # Example
    /// ```no_run
    /// use kf2_warden::config::FleetConfig;
    ///
    /// let config = FleetConfig::from_file("conf/fleet.yaml")
    ///     .expect("Failed to load config");
    /// println!("Servers: {}", config.servers.len());
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&contents)
            .with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Parse configuration from a YAML string
    pub fn from_str(contents: &str) -> Result<Self> {
        let mut config: FleetConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML")?;

        config.validate()?;
        config.normalize();

        Ok(config)
    }

    /// Reject values that cannot be fixed up with a default
    fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.username.is_empty(), "username cannot be empty");
        anyhow::ensure!(!self.password.is_empty(), "password cannot be empty");

        let address = self.base_url()?;
        anyhow::ensure!(
            matches!(address.scheme(), "http" | "https"),
            "server_address must be http or https, got {}",
            address.scheme()
        );
        anyhow::ensure!(
            address.host_str().is_some(),
            "server_address has no host: {}",
            self.server_address
        );

        anyhow::ensure!(
            (-1..=23).contains(&self.kill_after_hour),
            "kill_after_hour must be between -1 and 23, got {}",
            self.kill_after_hour
        );

        anyhow::ensure!(!self.servers.is_empty(), "servers cannot be empty");

        let mut names = HashSet::new();
        for (index, server) in self.servers.iter().enumerate() {
            anyhow::ensure!(
                !server.name.trim().is_empty(),
                "servers[{}]: name cannot be empty",
                index
            );
            anyhow::ensure!(server.port != 0, "server {}: port cannot be 0", server.name);
            anyhow::ensure!(
                names.insert(server.name.as_str()),
                "Duplicate server name: {}",
                server.name
            );
        }

        Ok(())
    }

    /// Apply clamps and fallbacks, warning about anything that was overridden
    fn normalize(&mut self) {
        if self.check_interval < MIN_CHECK_INTERVAL {
            tracing::warn!(
                "[config] [check_interval] {}s is below the minimum of {}s, using {}s",
                self.check_interval,
                MIN_CHECK_INTERVAL,
                DEFAULT_CHECK_INTERVAL
            );
            self.check_interval = DEFAULT_CHECK_INTERVAL;
        }

        if self.kill_on_empty && self.kill_after_hour != -1 {
            tracing::warn!(
                "[config] [kill_policy] kill_on_empty and kill_after_hour={} are both set, disabling kill_after_hour",
                self.kill_after_hour
            );
            self.kill_after_hour = -1;
        }

        if self.desired_map.trim().is_empty() {
            self.desired_map = default_desired_map();
        }
        self.desired_map = normalize_map_name(&self.desired_map);

        for server in &mut self.servers {
            let map = match server.desired_map.as_deref().map(str::trim) {
                Some(map) if !map.is_empty() => normalize_map_name(map),
                _ => self.desired_map.clone(),
            };
            server.desired_map = Some(map);

            if server.game_mode.is_none() {
                server.game_mode = Some(self.game_mode);
            }
        }
    }

    fn base_url(&self) -> Result<Url> {
        Url::parse(&self.server_address)
            .with_context(|| format!("Invalid server_address: {}", self.server_address))
    }

    /// Time between two fleet checks
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }

    /// Idle-shutdown policy after exclusivity has been applied
    pub fn kill_policy(&self) -> KillPolicy {
        KillPolicy {
            kill_on_empty: self.kill_on_empty,
            kill_after_hour: self.kill_after_hour,
        }
    }

    /// Build the managed targets, in configured order
    pub fn targets(&self) -> Result<Vec<ServerTarget>> {
        let base = self.base_url()?;

        self.servers
            .iter()
            .map(|server| {
                let mut root = base.clone();
                root.set_port(Some(server.port))
                    .map_err(|_| anyhow!("Cannot set port {} on {}", server.port, base))?;
                root.set_path("/");

                let desired_map = server
                    .desired_map
                    .clone()
                    .unwrap_or_else(|| self.desired_map.clone());
                let game_mode = server.game_mode.unwrap_or(self.game_mode);

                Ok(ServerTarget::new(
                    server.name.clone(),
                    root,
                    desired_map,
                    game_mode,
                    server.config_subfolder.clone(),
                    server.disabled,
                ))
            })
            .collect()
    }
}
