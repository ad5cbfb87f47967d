//! Scripted [`CommandRunner`] for tests.
//!
//! Responses are consumed in order; once the script runs dry the runner
//! answers with the repeat response if one is set, or a silent success
//! otherwise. Every call is recorded together with the contents of the
//! manifest it referenced, read at call time before the scratch directory
//! goes away.
//!
//! All shared state sits behind a single `parking_lot::Mutex`, and no lock
//! is held across an `.await`.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::request::flag_value;
use crate::runner::{CommandOutput, CommandRunner};

/// One scripted response.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Return this output.
    Output(CommandOutput),
    /// Fail to start with this error kind.
    SpawnError(std::io::ErrorKind),
    /// Never complete. Useful for cancellation tests.
    Hang,
}

/// A recorded call.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Program that was run.
    pub program: PathBuf,
    /// Arguments, lossily converted for easy assertions.
    pub args: Vec<String>,
    /// The `-srcs-file` argument, if present.
    pub manifest_path: Option<PathBuf>,
    /// Contents of the `-srcs-file` at call time.
    pub manifest: Option<String>,
    /// When the call started, on the tokio clock.
    pub at: tokio::time::Instant,
}

#[derive(Debug, Default)]
struct State {
    script: VecDeque<Scripted>,
    repeat: Option<Scripted>,
    materialize: bool,
    invocations: Vec<Invocation>,
}

/// A [`CommandRunner`] that replays a script and records its calls.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    state: Mutex<State>,
}

impl ScriptedRunner {
    /// An empty script: every call succeeds silently.
    pub fn new() -> Self {
        Self::default()
    }

    /// On successful `cp` calls, create an empty file at `-dst/<path>` for
    /// every manifest line, the way the real tool would.
    pub fn materializing(self) -> Self {
        self.state.lock().materialize = true;
        self
    }

    /// Queue a response.
    pub fn push(&self, response: Scripted) {
        self.state.lock().script.push_back(response);
    }

    /// Queue an output.
    pub fn push_output(&self, output: CommandOutput) {
        self.push(Scripted::Output(output));
    }

    /// Queue a spawn failure.
    pub fn push_spawn_error(&self, kind: std::io::ErrorKind) {
        self.push(Scripted::SpawnError(kind));
    }

    /// Queue a call that never completes.
    pub fn push_hang(&self) {
        self.push(Scripted::Hang);
    }

    /// Answer with `output` once the queued script is exhausted.
    pub fn repeat_output(&self, output: CommandOutput) {
        self.state.lock().repeat = Some(Scripted::Output(output));
    }

    /// All calls so far.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.state.lock().invocations.clone()
    }

    /// Number of calls so far.
    pub fn call_count(&self) -> usize {
        self.state.lock().invocations.len()
    }

    /// Manifest contents of every call that referenced one.
    pub fn manifests(&self) -> Vec<String> {
        self.state
            .lock()
            .invocations
            .iter()
            .filter_map(|i| i.manifest.clone())
            .collect()
    }

    /// Gaps between consecutive call start times.
    pub fn gaps(&self) -> Vec<std::time::Duration> {
        let calls = self.state.lock();
        calls
            .invocations
            .windows(2)
            .map(|w| w[1].at.duration_since(w[0].at))
            .collect()
    }
}

fn materialize(args: &[OsString], manifest: &str) -> std::io::Result<()> {
    let Some(dst) = flag_value(args, "-dst") else {
        return Ok(());
    };
    for line in manifest.lines().filter(|l| !l.is_empty()) {
        let path = dst.join(line);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, b"")?;
    }
    Ok(())
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &Path, args: &[OsString]) -> std::io::Result<CommandOutput> {
        let manifest_path = flag_value(args, "-srcs-file").map(Path::to_path_buf);
        let manifest = manifest_path
            .as_ref()
            .and_then(|p| std::fs::read_to_string(p).ok());

        let (response, materialize_on_success) = {
            let mut state = self.state.lock();
            state.invocations.push(Invocation {
                program: program.to_path_buf(),
                args: args
                    .iter()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect(),
                manifest_path,
                manifest: manifest.clone(),
                at: tokio::time::Instant::now(),
            });
            let response = state
                .script
                .pop_front()
                .or_else(|| state.repeat.clone())
                .unwrap_or_else(|| Scripted::Output(CommandOutput::success("")));
            (response, state.materialize)
        };

        match response {
            Scripted::Output(output) => {
                if output.is_success() && materialize_on_success {
                    if let Some(manifest) = &manifest {
                        materialize(args, manifest)?;
                    }
                }
                Ok(output)
            }
            Scripted::SpawnError(kind) => Err(std::io::Error::new(kind, "scripted spawn failure")),
            Scripted::Hang => std::future::pending().await,
        }
    }
}
