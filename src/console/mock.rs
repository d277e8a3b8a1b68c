//! Scripted console for controller tests.

use std::collections::{HashMap, VecDeque};
use url::Url;

use super::{AdminConsole, ConsoleError};
use crate::config::GameMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Probe,
    Login,
    PlayerCount,
    CurrentMap,
    ChangeMap {
        game_mode: GameMode,
        config_subfolder: String,
        map: String,
    },
    Shutdown,
}

/// Canned answers for one server. Queued results are used first; once a
/// queue is empty the steady-state value applies.
#[derive(Debug, Clone)]
pub struct ServerScript {
    pub authenticated: bool,
    pub players: u32,
    pub map: String,
    pub probe_errors: VecDeque<ConsoleError>,
    pub login_error: Option<ConsoleError>,
    pub player_count_error: Option<ConsoleError>,
    pub map_error: Option<ConsoleError>,
    pub change_map_error: Option<ConsoleError>,
    pub shutdown_error: Option<ConsoleError>,
}

impl Default for ServerScript {
    fn default() -> Self {
        Self {
            authenticated: true,
            players: 0,
            map: "KF-BioticsLab".to_string(),
            probe_errors: VecDeque::new(),
            login_error: None,
            player_count_error: None,
            map_error: None,
            change_map_error: None,
            shutdown_error: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct MockConsole {
    scripts: HashMap<String, ServerScript>,
    calls: Vec<(String, Call)>,
}

pub fn network_error(root: &Url) -> ConsoleError {
    ConsoleError::Network {
        url: root.to_string(),
        reason: "connection refused".to_string(),
    }
}

impl MockConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&mut self, root: &Url) -> &mut ServerScript {
        self.scripts.entry(root.to_string()).or_default()
    }

    pub fn calls(&self) -> &[(String, Call)] {
        &self.calls
    }

    pub fn calls_for(&self, root: &Url) -> Vec<Call> {
        let key = root.to_string();
        self.calls
            .iter()
            .filter(|(r, _)| *r == key)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn record(&mut self, root: &Url, call: Call) -> &mut ServerScript {
        self.calls.push((root.to_string(), call));
        self.script(root)
    }
}

impl AdminConsole for MockConsole {
    async fn probe_session(&mut self, root: &Url) -> Result<bool, ConsoleError> {
        let script = self.record(root, Call::Probe);
        match script.probe_errors.pop_front() {
            Some(err) => Err(err),
            None => Ok(script.authenticated),
        }
    }

    async fn login(&mut self, root: &Url, _username: &str, _password: &str) -> Result<(), ConsoleError> {
        let script = self.record(root, Call::Login);
        match script.login_error.clone() {
            Some(err) => Err(err),
            None => {
                script.authenticated = true;
                Ok(())
            }
        }
    }

    async fn player_count(&mut self, root: &Url) -> Result<u32, ConsoleError> {
        let script = self.record(root, Call::PlayerCount);
        match script.player_count_error.clone() {
            Some(err) => Err(err),
            None => Ok(script.players),
        }
    }

    async fn current_map(&mut self, root: &Url) -> Result<String, ConsoleError> {
        let script = self.record(root, Call::CurrentMap);
        match script.map_error.clone() {
            Some(err) => Err(err),
            None => Ok(script.map.clone()),
        }
    }

    async fn change_map(
        &mut self,
        root: &Url,
        game_mode: GameMode,
        config_subfolder: &str,
        map: &str,
    ) -> Result<(), ConsoleError> {
        let call = Call::ChangeMap {
            game_mode,
            config_subfolder: config_subfolder.to_string(),
            map: map.to_string(),
        };
        let script = self.record(root, call);
        match script.change_map_error.clone() {
            Some(err) => Err(err),
            None => {
                script.map = map.to_string();
                Ok(())
            }
        }
    }

    async fn shutdown(&mut self, root: &Url) -> Result<(), ConsoleError> {
        let script = self.record(root, Call::Shutdown);
        match script.shutdown_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
