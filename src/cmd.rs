use anyhow::{Context, Result, anyhow};
use std::io::Write;
use std::process::{Command, Output, Stdio};

/// A builder for executing shell commands with unified error handling
pub struct Cmd<'a> {
    command: &'a str,
    args: Vec<&'a str>,
    envs: Vec<(&'a str, &'a str)>,
}

impl<'a> Cmd<'a> {
    /// Create a new command builder
    pub fn new(command: &'a str) -> Self {
        Self {
            command,
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Add a single argument
    pub fn arg(mut self, arg: &'a str) -> Self {
        self.args.push(arg);
        self
    }

    /// Add multiple arguments
    pub fn args(mut self, args: &[&'a str]) -> Self {
        self.args.extend_from_slice(args);
        self
    }

    /// Add an environment variable on top of the inherited environment
    pub fn env(mut self, key: &'a str, value: &'a str) -> Self {
        self.envs.push((key, value));
        self
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(self.command);
        cmd.args(&self.args);
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    fn describe(&self) -> String {
        format!("{} {}", self.command, self.args.join(" "))
    }

    /// Execute the command and return the output
    /// Returns an error if the command fails (non-zero exit code)
    pub fn run(self) -> Result<Output> {
        let output = self
            .build()
            .output()
            .with_context(|| format!("Failed to execute command: {}", self.describe()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "Command failed: {}\n{}",
                self.describe(),
                stderr.trim()
            ));
        }
        Ok(output)
    }

    /// Execute the command and return stdout as a trimmed string
    pub fn run_and_capture_stdout(self) -> Result<String> {
        let output = self.run()?;
        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }

    /// Execute the command and return stdout as raw bytes, untrimmed.
    /// Diff output is byte-exact; trimming would corrupt it.
    pub fn run_and_capture_bytes(self) -> Result<Vec<u8>> {
        Ok(self.run()?.stdout)
    }

    /// Execute the command, returning Ok(true) if it succeeds, Ok(false) if it fails
    /// This is useful for commands that are used as checks (e.g., git rev-parse --verify)
    pub fn run_as_check(self) -> Result<bool> {
        let output = self
            .build()
            .output()
            .with_context(|| format!("Failed to execute command: {}", self.describe()))?;

        Ok(output.status.success())
    }

    /// Execute the command with the given bytes piped to its standard input.
    /// Returns an error if the command fails (non-zero exit code).
    pub fn run_with_input(self, input: &[u8]) -> Result<Output> {
        let mut child = self
            .build()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to execute command: {}", self.describe()))?;

        // Write stdin from a thread to avoid a pipe deadlock on large input
        if let Some(mut stdin) = child.stdin.take() {
            let input = input.to_vec();
            std::thread::spawn(move || {
                let _ = stdin.write_all(&input);
            });
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for command: {}", self.describe()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "Command failed: {}\n{}",
                self.describe(),
                stderr.trim()
            ));
        }
        Ok(output)
    }
}
