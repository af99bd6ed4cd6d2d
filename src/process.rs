//! Thin builder around `std::process::Command` for running external tools.
//!
//! Every bundled or system tool (engine binary, admin client, dump/restore
//! clients, migration tool, `systemctl`) goes through [`Cmd`], which captures
//! combined output and turns a non-zero exit into a [`CmdError`] carrying that
//! output, so callers never have to re-run a tool to see why it failed.

use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;

/// Structured failure from a tool invocation.
#[derive(Debug, Error)]
pub enum CmdError {
    /// The program could not be launched at all.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// A redirection target could not be opened.
    #[error("failed to open {path} for {program}: {source}")]
    Redirect {
        program: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The program ran and exited unsuccessfully.
    #[error("{context} ({status})\n{output}")]
    Failed {
        context: String,
        status: String,
        output: String,
    },
}

/// Captured result of a completed invocation.
#[derive(Debug)]
pub struct CmdResult {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

impl CmdResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Stdout and stderr concatenated, for error reporting.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.trim_end().to_string();
        let err = self.stderr.trim_end();
        if !err.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(err);
        }
        out
    }
}

/// Builder for a single synchronous tool invocation.
pub struct Cmd {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(&'static str, OsString)>,
    stdin_file: Option<PathBuf>,
    stdout_file: Option<PathBuf>,
    allow_fail: bool,
    error_msg: Option<String>,
}

impl Cmd {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            stdin_file: None,
            stdout_file: None,
            allow_fail: false,
            error_msg: None,
        }
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

    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.as_os_str().to_os_string());
        self
    }

    pub fn env(mut self, key: &'static str, value: impl Into<OsString>) -> Self {
        self.envs.push((key, value.into()));
        self
    }

    /// Feed the program's stdin from a file.
    pub fn stdin_file(mut self, path: &Path) -> Self {
        self.stdin_file = Some(path.to_path_buf());
        self
    }

    /// Redirect the program's stdout into a file instead of capturing it.
    pub fn stdout_file(mut self, path: &Path) -> Self {
        self.stdout_file = Some(path.to_path_buf());
        self
    }

    /// A non-zero exit is returned as a normal result instead of an error.
    /// The caller checks `CmdResult::success()`.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    /// Context line used in the error when the program exits non-zero.
    pub fn error_msg(mut self, msg: &str) -> Self {
        self.error_msg = Some(msg.to_string());
        self
    }

    pub fn run(self) -> Result<CmdResult, CmdError> {
        let program_name = self.program.display().to_string();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }

        match &self.stdin_file {
            Some(path) => {
                let f = File::open(path).map_err(|source| CmdError::Redirect {
                    program: program_name.clone(),
                    path: path.clone(),
                    source,
                })?;
                cmd.stdin(Stdio::from(f));
            }
            None => {
                cmd.stdin(Stdio::null());
            }
        }

        if let Some(path) = &self.stdout_file {
            let f = File::create(path).map_err(|source| CmdError::Redirect {
                program: program_name.clone(),
                path: path.clone(),
                source,
            })?;
            cmd.stdout(Stdio::from(f));
        }

        let output = cmd.output().map_err(|source| CmdError::Spawn {
            program: program_name.clone(),
            source,
        })?;

        let result = CmdResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status,
        };

        if result.success() || self.allow_fail {
            return Ok(result);
        }

        let context = self
            .error_msg
            .unwrap_or_else(|| format!("{} failed", program_name));
        let status = match result.status.code() {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        };
        let mut output_text = result.combined();
        if output_text.is_empty() {
            output_text = "(no output)".to_string();
        }

        Err(CmdError::Failed {
            context,
            status,
            output: output_text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn captures_stdout_and_stderr() {
        let result = Cmd::new("sh")
            .args(["-c", "echo out; echo err >&2"])
            .run()
            .unwrap();
        assert!(result.success());
        assert_eq!(result.stdout.trim(), "out");
        assert_eq!(result.stderr.trim(), "err");
        assert_eq!(result.combined(), "out\nerr");
    }

    #[test]
    fn nonzero_exit_becomes_failed_error_with_output() {
        let err = Cmd::new("sh")
            .args(["-c", "echo boom >&2; exit 3"])
            .error_msg("tool blew up")
            .run()
            .unwrap_err();
        match err {
            CmdError::Failed {
                context,
                status,
                output,
            } => {
                assert_eq!(context, "tool blew up");
                assert_eq!(status, "exit status 3");
                assert!(output.contains("boom"));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn allow_fail_returns_result_for_nonzero_exit() {
        let result = Cmd::new("sh")
            .args(["-c", "exit 7"])
            .allow_fail()
            .run()
            .unwrap();
        assert!(!result.success());
        assert_eq!(result.status.code(), Some(7));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let err = Cmd::new("/nonexistent/definitely-missing-tool")
            .run()
            .unwrap_err();
        assert!(matches!(err, CmdError::Spawn { .. }));
    }

    #[test]
    fn stdout_redirects_to_file() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out.txt");

        let result = Cmd::new("sh")
            .args(["-c", "echo redirected"])
            .stdout_file(&out)
            .run()
            .unwrap();

        assert!(result.success());
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "redirected");
        // Captured stdout is empty once redirected.
        assert!(result.stdout.is_empty());
    }

    #[test]
    fn stdin_feeds_from_file() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in.txt");
        fs::write(&input, "hello stdin\n").unwrap();

        let result = Cmd::new("cat").stdin_file(&input).run().unwrap();
        assert_eq!(result.stdout, "hello stdin\n");
    }

    #[test]
    fn env_is_passed_through() {
        let result = Cmd::new("sh")
            .args(["-c", "printf '%s' \"$APPSTACK_TEST_VAR\""])
            .env("APPSTACK_TEST_VAR", "present")
            .run()
            .unwrap();
        assert_eq!(result.stdout, "present");
    }
}
