use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::Command;

/// Runs `program script` to completion.
pub trait ProcessRunner {
    /// Returns the exit code, `None` if the child was killed by a signal.
    fn run(&self, program: &Path, script: &Path) -> io::Result<Option<i32>>;
}

/// Blocks until the operator acknowledges.
pub trait Pause {
    fn pause(&self);
}

/// Spawns the interpreter with inherited stdio and no extra arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &Path, script: &Path) -> io::Result<Option<i32>> {
        let status = Command::new(program).arg(script).status()?;
        Ok(status.code())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePause;

impl Pause for ConsolePause {
    fn pause(&self) {
        print!("Press Enter to continue . . . ");
        let _ = io::stdout().flush();

        // EOF or a closed stdin counts as acknowledgment
        let mut line = String::new();
        if let Err(e) = io::stdin().lock().read_line(&mut line) {
            tracing::debug!("Could not read acknowledgment: {}", e);
        }
    }
}
