use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use taskq::sched::ProcessProbe;

/// A `ProcessProbe` whose idea of "alive" is a set the test controls.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProbe {
    alive: Arc<Mutex<HashSet<i64>>>,
}

impl ScriptedProbe {
    /// Probe that reports exactly `pids` as alive.
    pub fn with_alive(pids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            alive: Arc::new(Mutex::new(pids.into_iter().collect())),
        }
    }

    pub fn spawn(&self, pid: i64) {
        self.alive.lock().unwrap().insert(pid);
    }

    pub fn kill(&self, pid: i64) {
        self.alive.lock().unwrap().remove(&pid);
    }
}

impl ProcessProbe for ScriptedProbe {
    fn is_alive(&self, pid: i64) -> bool {
        self.alive.lock().unwrap().contains(&pid)
    }
}
