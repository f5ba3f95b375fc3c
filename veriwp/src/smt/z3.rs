//! Interactive Z3 process
//!
//! Z3 runs as `z3 -in` for the whole checking session of one function.
//! `:print-success` makes every command answer, so each command is followed
//! by exactly one response line, except `(get-model)` which is read until its
//! parentheses balance.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::trace;

use super::model::Model;
use super::solver::{Declaration, SatResult, Solver, SolverError};

/// Z3 driven over stdin/stdout
pub struct Z3Process {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Z3Process {
    /// Start Z3 and configure it; `timeout_ms` of `None` keeps Z3's own default
    pub fn spawn(path: &str, timeout_ms: Option<u64>) -> Result<Self, SolverError> {
        let mut child = Command::new(path)
            .args(["-in", "-smt2"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SolverError::Spawn {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let stdin = child.stdin.take().ok_or(SolverError::Closed)?;
        let stdout = child.stdout.take().ok_or(SolverError::Closed)?;
        let mut z3 = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };

        z3.command("(set-option :print-success true)")?;
        z3.command("(set-option :produce-models true)")?;
        if let Some(ms) = timeout_ms {
            z3.command(&format!("(set-option :timeout {ms})"))?;
        }
        Ok(z3)
    }

    /// True if `path -version` runs successfully
    pub fn is_available(path: &str) -> bool {
        Command::new(path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn write(&mut self, cmd: &str) -> Result<(), SolverError> {
        trace!(target: "veriwp::smt", "> {cmd}");
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, SolverError> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(SolverError::Closed);
        }
        let line = line.trim().to_string();
        trace!(target: "veriwp::smt", "< {line}");
        Ok(line)
    }

    /// Send a command that answers `success`
    fn command(&mut self, cmd: &str) -> Result<(), SolverError> {
        self.write(cmd)?;
        let response = self.read_line()?;
        if response == "success" {
            Ok(())
        } else {
            Err(SolverError::Rejected {
                command: cmd.to_string(),
                response,
            })
        }
    }

    /// Read one balanced s-expression, possibly spread over several lines
    fn read_sexp(&mut self) -> Result<String, SolverError> {
        let mut text = String::new();
        let mut depth: i64 = 0;
        loop {
            let line = self.read_line()?;
            for c in line.chars() {
                match c {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    _ => {}
                }
            }
            text.push_str(&line);
            text.push('\n');
            if depth <= 0 && !text.trim().is_empty() {
                return Ok(text);
            }
        }
    }

    fn reason_unknown(&mut self) -> Result<String, SolverError> {
        self.write("(get-info :reason-unknown)")?;
        let response = self.read_sexp()?;
        // (:reason-unknown "timeout")
        Ok(response
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .trim_start_matches(":reason-unknown")
            .trim()
            .trim_matches('"')
            .to_string())
    }
}

impl Solver for Z3Process {
    fn declare(&mut self, decl: &Declaration) -> Result<(), SolverError> {
        self.command(&decl.to_smt())
    }

    fn push(&mut self) -> Result<(), SolverError> {
        self.command("(push 1)")
    }

    fn pop(&mut self) -> Result<(), SolverError> {
        self.command("(pop 1)")
    }

    fn add(&mut self, constraint: &str) -> Result<(), SolverError> {
        self.command(&format!("(assert {constraint})"))
    }

    fn check(&mut self) -> Result<SatResult, SolverError> {
        self.write("(check-sat)")?;
        match self.read_line()?.as_str() {
            "sat" => Ok(SatResult::Sat),
            "unsat" => Ok(SatResult::Unsat),
            "unknown" => Ok(SatResult::Unknown(self.reason_unknown()?)),
            "timeout" => Ok(SatResult::Unknown("timeout".to_string())),
            other => Err(SolverError::Unexpected(other.to_string())),
        }
    }

    fn model(&mut self) -> Result<Model, SolverError> {
        self.write("(get-model)")?;
        let text = self.read_sexp()?;
        if text.trim_start().starts_with("(error") {
            return Err(SolverError::Rejected {
                command: "(get-model)".to_string(),
                response: text.trim().to_string(),
            });
        }
        Model::parse(&text)
    }
}

impl Drop for Z3Process {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
