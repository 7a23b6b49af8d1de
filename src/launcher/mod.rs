//! Environment check and hand-off to the collector script.
//!
//! Looks for an isolated interpreter installation at a fixed relative path,
//! runs the script through it when present, and always waits for the operator
//! to acknowledge before returning.

mod process;

pub use process::{ConsolePause, Pause, ProcessRunner, SystemRunner};

use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherConfig {
    /// Directory holding the environment's executables.
    pub env_dir: PathBuf,
    /// Interpreter file name inside `env_dir`.
    pub interpreter: String,
    pub script: PathBuf,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        let (env_dir, interpreter) = if cfg!(windows) {
            (Path::new("venv").join("Scripts"), "python.exe")
        } else {
            (Path::new("venv").join("bin"), "python")
        };

        Self {
            env_dir,
            interpreter: interpreter.to_string(),
            script: PathBuf::from("parse_influx.py"),
        }
    }
}

impl LauncherConfig {
    pub fn interpreter_path(&self) -> PathBuf {
        self.env_dir.join(&self.interpreter)
    }

    pub fn environment_present(&self) -> bool {
        self.env_dir.is_dir()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The script ran; its exit status is deliberately not acted on.
    Launched { exit_code: Option<i32> },
    /// The environment exists but the interpreter could not be started.
    SpawnFailed { reason: String },
    EnvironmentMissing,
}

pub struct Launcher<R: ProcessRunner, P: Pause> {
    config: LauncherConfig,
    runner: R,
    pause: P,
}

impl Launcher<SystemRunner, ConsolePause> {
    pub fn system(config: LauncherConfig) -> Self {
        Self::new(config, SystemRunner, ConsolePause)
    }
}

impl<R: ProcessRunner, P: Pause> Launcher<R, P> {
    pub fn new(config: LauncherConfig, runner: R, pause: P) -> Self {
        Self {
            config,
            runner,
            pause,
        }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn run(&self) -> LaunchOutcome {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.run_with(&mut out)
    }

    /// Same as [`run`](Self::run) with status lines going to `out`.
    pub fn run_with<W: Write>(&self, out: &mut W) -> LaunchOutcome {
        let outcome = self.launch(out);
        let _ = out.flush();
        self.pause.pause();
        outcome
    }

    fn launch<W: Write>(&self, out: &mut W) -> LaunchOutcome {
        tracing::debug!("Checking for environment at {}", self.config.env_dir.display());

        if !self.config.environment_present() {
            tracing::warn!(
                "Environment directory {} does not exist",
                self.config.env_dir.display()
            );
            let _ = writeln!(
                out,
                "Virtual environment not found ({}).",
                self.config.env_dir.display()
            );
            return LaunchOutcome::EnvironmentMissing;
        }

        let interpreter = self.config.interpreter_path();
        let _ = writeln!(
            out,
            "Virtual environment found. Running {}...",
            self.config.script.display()
        );
        let _ = out.flush();

        match self.runner.run(&interpreter, &self.config.script) {
            Ok(exit_code) => {
                tracing::debug!("{} exited with {:?}", self.config.script.display(), exit_code);
                LaunchOutcome::Launched { exit_code }
            }
            Err(e) => {
                tracing::warn!("Failed to start {}: {}", interpreter.display(), e);
                let _ = writeln!(out, "Could not start {}: {}", interpreter.display(), e);
                LaunchOutcome::SpawnFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::io;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeRunner {
        calls: RefCell<Vec<(PathBuf, PathBuf)>>,
        fail: bool,
        exit_code: Option<i32>,
    }

    impl ProcessRunner for FakeRunner {
        fn run(&self, program: &Path, script: &Path) -> io::Result<Option<i32>> {
            self.calls
                .borrow_mut()
                .push((program.to_path_buf(), script.to_path_buf()));
            if self.fail {
                Err(io::Error::new(io::ErrorKind::NotFound, "no such file"))
            } else {
                Ok(self.exit_code)
            }
        }
    }

    #[derive(Default)]
    struct CountingPause {
        count: Cell<usize>,
    }

    impl Pause for CountingPause {
        fn pause(&self) {
            self.count.set(self.count.get() + 1);
        }
    }

    fn config_in(dir: &TempDir) -> LauncherConfig {
        LauncherConfig {
            env_dir: dir.path().join("venv").join("Scripts"),
            interpreter: "python.exe".to_string(),
            script: PathBuf::from("parse_influx.py"),
        }
    }

    #[test]
    fn test_present_environment_runs_script_then_pauses() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        std::fs::create_dir_all(&config.env_dir).unwrap();

        let launcher = Launcher::new(
            config.clone(),
            FakeRunner {
                exit_code: Some(1),
                ..Default::default()
            },
            CountingPause::default(),
        );
        let mut out = Vec::new();
        let outcome = launcher.run_with(&mut out);

        // the script's failure does not change anything
        assert_eq!(outcome, LaunchOutcome::Launched { exit_code: Some(1) });
        assert_eq!(
            *launcher.runner.calls.borrow(),
            vec![(config.interpreter_path(), PathBuf::from("parse_influx.py"))]
        );
        assert_eq!(launcher.pause.count.get(), 1);
        assert!(String::from_utf8(out).unwrap().contains("Running parse_influx.py"));
    }

    #[test]
    fn test_missing_environment_reports_and_pauses_without_running() {
        let dir = TempDir::new().unwrap();
        let launcher = Launcher::new(
            config_in(&dir),
            FakeRunner::default(),
            CountingPause::default(),
        );

        let mut out = Vec::new();
        let outcome = launcher.run_with(&mut out);

        assert_eq!(outcome, LaunchOutcome::EnvironmentMissing);
        assert!(launcher.runner.calls.borrow().is_empty());
        assert_eq!(launcher.pause.count.get(), 1);
        assert!(String::from_utf8(out)
            .unwrap()
            .contains("Virtual environment not found"));
    }

    #[test]
    fn test_plain_file_is_not_an_environment() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        std::fs::create_dir_all(config.env_dir.parent().unwrap()).unwrap();
        std::fs::write(&config.env_dir, b"").unwrap();

        assert!(!config.environment_present());
    }

    #[test]
    fn test_spawn_failure_still_pauses() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        std::fs::create_dir_all(&config.env_dir).unwrap();

        let launcher = Launcher::new(
            config,
            FakeRunner {
                fail: true,
                ..Default::default()
            },
            CountingPause::default(),
        );
        let outcome = launcher.run_with(&mut Vec::new());

        assert!(matches!(outcome, LaunchOutcome::SpawnFailed { .. }));
        assert_eq!(launcher.pause.count.get(), 1);
    }

    #[test]
    fn test_repeated_runs_take_the_same_branch() {
        let dir = TempDir::new().unwrap();
        let launcher = Launcher::new(
            config_in(&dir),
            FakeRunner::default(),
            CountingPause::default(),
        );

        let outcomes: Vec<_> = (0..3).map(|_| launcher.run_with(&mut Vec::new())).collect();
        assert!(outcomes.iter().all(|o| *o == LaunchOutcome::EnvironmentMissing));
        assert_eq!(launcher.pause.count.get(), 3);

        std::fs::create_dir_all(&launcher.config().env_dir).unwrap();
        let outcomes: Vec<_> = (0..3).map(|_| launcher.run_with(&mut Vec::new())).collect();
        assert!(outcomes
            .iter()
            .all(|o| *o == LaunchOutcome::Launched { exit_code: None }));
        assert_eq!(launcher.runner.calls.borrow().len(), 3);
    }

    #[test]
    fn test_default_paths() {
        let config = LauncherConfig::default();
        assert_eq!(config.script, PathBuf::from("parse_influx.py"));
        assert!(config.interpreter_path().starts_with("venv"));
    }
}
