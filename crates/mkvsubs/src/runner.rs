use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::error::ToolError;

/// One external command to run
///
/// Arguments are kept as OS strings so file names that are not valid UTF-8
/// reach the tool byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Working directory for the child, inherited when None
    pub cwd: Option<PathBuf>,
    /// Echo stdout lines into the debug log while the tool runs
    pub log_stdout: bool,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            log_stdout: true,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Keep stdout out of the debug log (machine-readable output such as `mkvmerge -J`)
    pub fn quiet(mut self) -> Self {
        self.log_stdout = false;
        self
    }

    /// Name used in logs and error messages
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Shell-like rendering for debug logs
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            line.push(' ');
            if arg.contains(' ') {
                line.push('"');
                line.push_str(&arg);
                line.push('"');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }
}

/// Captured result of a tool that exited successfully
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external tools to completion
///
/// A non-zero exit is reported as `ToolError::Failed`, so callers only see
/// `Ok` for clean exits.
#[allow(async_fn_in_trait)]
pub trait ToolRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError>;
}

impl<R: ToolRunner + ?Sized> ToolRunner for &R {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        (**self).run(invocation).await
    }
}

/// Read a pipe to EOF, one line at a time
///
/// Tools print in whatever code page the console uses, so each line is
/// decoded lossily instead of ending the read at the first bad byte.
async fn drain_lines<P: AsyncRead + Unpin>(pipe: Option<P>, echo_as: Option<&str>) -> String {
    let mut lines = Vec::new();
    let Some(pipe) = pipe else {
        return String::new();
    };

    let mut segments = BufReader::new(pipe).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(raw)) => {
                let line = String::from_utf8_lossy(&raw);
                let line = line.strip_suffix('\r').unwrap_or(&line).to_string();
                if let Some(tag) = echo_as {
                    debug!("[{}] {}", tag, line);
                }
                lines.push(line);
            }
            Ok(None) => break,
            Err(e) => {
                debug!("pipe read failed: {}", e);
                break;
            }
        }
    }
    lines.join("\n")
}

/// Runs tools as child processes, streaming stdout into the debug log
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        let program = invocation.program_name();
        debug!("Executing: {}", invocation.command_line());

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|cause| ToolError::Spawn {
            program: program.clone(),
            cause,
        })?;

        let echo_as = invocation.log_stdout.then_some(program.as_str());
        let stdout_reader = drain_lines(child.stdout.take(), echo_as);
        let stderr_reader = drain_lines(child.stderr.take(), None);

        // Drain both pipes while waiting so a chatty tool never blocks on a full pipe
        let (status, stdout, stderr) = tokio::join!(child.wait(), stdout_reader, stderr_reader);
        let status = status.map_err(|cause| ToolError::Spawn {
            program: program.clone(),
            cause,
        })?;

        if !status.success() {
            // mkvmerge and friends print their errors on stdout
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(ToolError::Failed {
                program,
                exit_code: status.code().unwrap_or(-1),
                stderr: detail,
            });
        }

        debug!("{} completed successfully", program);
        Ok(ToolOutput { stdout, stderr })
    }
}
