//! External command execution.
//!
//! The child's stdout and stderr are drained on two scoped threads while
//! the caller blocks on process completion, so neither pipe can fill up
//! and stall the child.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use cellc_common::error::{CellError, Result};

/// A program invocation with its arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    program: PathBuf,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl ShellCommand {
    /// Creates an invocation of `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Runs the command from `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Runs the command, logging stdout lines at debug and stderr lines
    /// as warnings.
    ///
    /// # Errors
    ///
    /// See [`ShellCommand::run_with`].
    pub fn run(&self) -> Result<String> {
        self.run_with(
            |line| tracing::debug!(target: "cellc::shell", "{line}"),
            |line| tracing::warn!(target: "cellc::shell", "{line}"),
        )
    }

    /// Runs the command, feeding each output line to the matching sink.
    ///
    /// Returns the collected stdout, or the collected stderr when stdout
    /// is empty.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::Io`] if the program cannot be started and
    /// [`CellError::ExternalTool`] if it exits with a nonzero code.
    pub fn run_with<O, E>(&self, on_stdout: O, on_stderr: E) -> Result<String>
    where
        O: FnMut(&str) + Send,
        E: FnMut(&str) + Send,
    {
        tracing::debug!(command = %self, "executing");
        let mut command = Command::new(&self.program);
        let _ = command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.current_dir {
            let _ = command.current_dir(dir);
        }
        let mut child = command.spawn().map_err(|e| CellError::Io {
            path: self.program.clone(),
            source: e,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (status, out, err) = thread::scope(|scope| {
            let out = scope.spawn(move || drain(stdout, on_stdout));
            let err = scope.spawn(move || drain(stderr, on_stderr));
            let status = child.wait();
            (status, out.join(), err.join())
        });

        let status = status.map_err(|e| CellError::Io {
            path: self.program.clone(),
            source: e,
        })?;
        let (Ok(out), Ok(err)) = (out, err) else {
            return Err(self.failure(-1, "output reader panicked".into()));
        };

        if !status.success() {
            return Err(self.failure(status.code().unwrap_or(-1), err.trim().to_string()));
        }
        Ok(if out.is_empty() { err } else { out })
    }

    fn failure(&self, code: i32, message: String) -> CellError {
        CellError::ExternalTool {
            command: self.to_string(),
            code,
            message,
        }
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Reads `stream` line by line into a string, passing each line to `sink`.
fn drain<R: Read>(stream: Option<R>, mut sink: impl FnMut(&str)) -> String {
    let mut collected = String::new();
    let Some(stream) = stream else {
        return collected;
    };
    for line in BufReader::new(stream).lines().map_while(std::result::Result::ok) {
        sink(&line);
        collected.push_str(&line);
        collected.push('\n');
    }
    collected
}
