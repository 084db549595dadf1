use std::{
    ffi::OsString,
    fmt::{self, Display},
    io::Read,
    path::PathBuf,
    process::{Child, Command, ExitStatus, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{info, trace};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A command line together with the directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        ProcessCommand {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn git() -> Self {
        Self::new("git")
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// First argument, which for git is the subcommand.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().and_then(|arg| arg.to_str())
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl Display for ProcessCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        if let Some(dir) = &self.current_dir {
            write!(f, " (in {})", dir.display())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal or never ran.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub dry_run: bool,
}

impl ProcessOutput {
    /// Sentinel returned by a runner that performs no side effects.
    pub fn dry_run() -> Self {
        ProcessOutput {
            dry_run: true,
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.dry_run || self.exit_code == Some(0)
    }
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Could not start `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("Error while waiting for `{command}`: {source}")]
    Wait {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` did not finish within {}s", timeout.as_secs_f32())]
    Timeout { command: String, timeout: Duration },
}

/// Runs external commands on behalf of the resolver and the cache.
pub trait CommandRunner {
    fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput, ProcessError>;
}

/// Runs commands as child processes of the current one.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    dry_run: bool,
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(dry_run: bool, timeout: Option<Duration>) -> Self {
        SystemRunner { dry_run, timeout }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        if self.dry_run {
            info!("{}", command);
            return Ok(ProcessOutput::dry_run());
        }

        trace!("Running {}", command);
        let mut child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.timeout {
            Some(timeout) => wait_with_timeout(&mut child, command, timeout)?,
            None => child.wait().map_err(|source| ProcessError::Wait {
                command: command.to_string(),
                source,
            })?,
        };

        let output = ProcessOutput {
            exit_code: status.code(),
            stdout: collect(stdout),
            stderr: collect(stderr),
            dry_run: false,
        };
        trace!("`{}` exited with {:?}", command, output.exit_code);
        Ok(output)
    }
}

fn wait_with_timeout(
    child: &mut Child,
    command: &ProcessCommand,
    timeout: Duration,
) -> Result<ExitStatus, ProcessError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if start.elapsed() < timeout => thread::sleep(POLL_INTERVAL),
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProcessError::Timeout {
                    command: command.to_string(),
                    timeout,
                });
            }
            Err(source) => {
                return Err(ProcessError::Wait {
                    command: command.to_string(),
                    source,
                })
            }
        }
    }
}

// Each pipe is read on its own thread while the child runs.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    let bytes = handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}
