use std::collections::{BTreeMap, HashMap};
use std::io;

use async_trait::async_trait;
use dog_mogile::{Tracker, TrackerArgs, TrackerError, TrackerResponse, UNKNOWN_KEY};
use parking_lot::Mutex;

/// Canned answer that overrides the simulated tracker for one command
#[derive(Debug, Clone)]
pub enum Script {
    Reply(TrackerResponse),
    Reject(&'static str, &'static str),
    /// The exchange itself fails, as with an unreachable tracker
    Unavailable(&'static str),
}

#[derive(Debug, Clone)]
struct OpenCreate {
    key: String,
    class: Option<String>,
    devid: String,
    path: String,
}

#[derive(Default)]
struct State {
    committed: BTreeMap<String, Vec<String>>,
    open: HashMap<String, OpenCreate>,
    next_fid: u64,
    scripts: HashMap<String, Script>,
    log: Vec<(String, TrackerArgs)>,
}

/// Tracker simulation backed by a map, with scriptable failures
pub struct MemoryTracker {
    node: String,
    state: Mutex<State>,
}

impl MemoryTracker {
    pub fn new(node: &str) -> Self {
        Self {
            node: node.trim_end_matches('/').to_string(),
            state: Mutex::new(State {
                next_fid: 1,
                ..State::default()
            }),
        }
    }

    /// Make `key` resolve to the given locations without an upload
    pub fn place(&self, key: &str, paths: &[&str]) {
        self.state
            .lock()
            .committed
            .insert(key.to_string(), paths.iter().map(|p| p.to_string()).collect());
    }

    pub fn script(&self, command: &str, script: Script) {
        self.state.lock().scripts.insert(command.to_string(), script);
    }

    pub fn committed(&self, key: &str) -> Option<Vec<String>> {
        self.state.lock().committed.get(key).cloned()
    }

    /// Arguments of every call to `command`, oldest first
    pub fn calls(&self, command: &str) -> Vec<TrackerArgs> {
        self.state
            .lock()
            .log
            .iter()
            .filter(|(c, _)| c == command)
            .map(|(_, a)| a.clone())
            .collect()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().log.iter().map(|(c, _)| c.clone()).collect()
    }
}

fn arg<'a>(args: &'a TrackerArgs, name: &str) -> Result<&'a str, TrackerError> {
    args.get(name)
        .map(String::as_str)
        .ok_or_else(|| TrackerError::rejected("bad_params", format!("missing {name}")))
}

fn unknown_key() -> TrackerError {
    TrackerError::rejected(UNKNOWN_KEY, "Unknown key")
}

#[async_trait]
impl Tracker for MemoryTracker {
    async fn send(
        &self,
        domain: &str,
        command: &str,
        args: &TrackerArgs,
    ) -> Result<TrackerResponse, TrackerError> {
        let mut state = self.state.lock();
        let mut logged = args.clone();
        logged.insert("domain".to_string(), domain.to_string());
        state.log.push((command.to_string(), logged));

        if let Some(script) = state.scripts.get(command) {
            return match script.clone() {
                Script::Reply(response) => Ok(response),
                Script::Reject(code, message) => Err(TrackerError::rejected(code, message)),
                Script::Unavailable(reason) => Err(TrackerError::unavailable(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    reason,
                ))),
            };
        }

        match command {
            "get_paths" => {
                let key = arg(args, "key")?;
                let paths = state.committed.get(key).ok_or_else(unknown_key)?;
                let mut response = TrackerResponse::new().with("paths", paths.len().to_string());
                for (i, path) in paths.iter().enumerate() {
                    response = response.with(format!("path{}", i + 1), path.clone());
                }
                Ok(response)
            }
            "create_open" => {
                let key = arg(args, "key")?.to_string();
                let fid = state.next_fid.to_string();
                state.next_fid += 1;
                let open = OpenCreate {
                    key,
                    class: args.get("class").cloned(),
                    devid: "1".to_string(),
                    path: format!("{}/dev1/0/000/000/{:0>10}.fid", self.node, fid),
                };
                let response = TrackerResponse::new()
                    .with("fid", fid.clone())
                    .with("devid", open.devid.clone())
                    .with("path", open.path.clone());
                state.open.insert(fid, open);
                Ok(response)
            }
            "create_close" => {
                let fid = arg(args, "fid")?;
                let open = state
                    .open
                    .remove(fid)
                    .ok_or_else(|| TrackerError::rejected("no_temp_file", "No tempfile or file already closed"))?;
                if arg(args, "key")? != open.key
                    || arg(args, "devid")? != open.devid
                    || arg(args, "path")? != open.path
                    || args.get("class") != open.class.as_ref()
                {
                    return Err(TrackerError::rejected("bad_params", "create_close does not match create_open"));
                }
                state.committed.insert(open.key, vec![open.path]);
                Ok(TrackerResponse::new())
            }
            "delete" => {
                let key = arg(args, "key")?;
                state.committed.remove(key).ok_or_else(unknown_key)?;
                Ok(TrackerResponse::new())
            }
            "rename" => {
                let from = arg(args, "from_key")?;
                let to = arg(args, "to_key")?.to_string();
                let paths = state.committed.remove(from).ok_or_else(unknown_key)?;
                state.committed.insert(to, paths);
                Ok(TrackerResponse::new())
            }
            "list_keys" => {
                let prefix = arg(args, "prefix")?;
                let after = args.get("after").cloned();
                let limit = args
                    .get("limit")
                    .and_then(|l| l.parse::<usize>().ok())
                    .unwrap_or(1000);
                let keys: Vec<String> = state
                    .committed
                    .keys()
                    .filter(|k| k.starts_with(prefix))
                    .filter(|k| after.as_ref().map_or(true, |a| k.as_str() > a.as_str()))
                    .take(limit)
                    .cloned()
                    .collect();
                let mut response = TrackerResponse::new().with("key_count", keys.len().to_string());
                for (i, key) in keys.iter().enumerate() {
                    response = response.with(format!("key{}", i + 1), key.clone());
                }
                Ok(response)
            }
            other => Err(TrackerError::rejected("unknown_command", format!("Unknown command {other}"))),
        }
    }
}
