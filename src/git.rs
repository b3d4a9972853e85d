//! The seam to the host VCS.
//!
//! Everything stagehand needs from git goes through the [`Git`] trait:
//! diff capture, numstat passes, patching the index, and color
//! configuration. The real implementation shells out via [`Cmd`]; tests
//! substitute canned output.

use anyhow::{Context, Result};
use tracing::debug;

use crate::cmd::Cmd;

/// SHA-1 id of the empty tree, the staged-side baseline when HEAD does
/// not resolve (fresh repository with no commits).
const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Which pair of trees a diff or stat pass compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffSide {
    /// Working tree vs index.
    Worktree,
    /// Index vs HEAD (or the empty tree).
    Staged,
}

pub trait Git {
    /// Capture the patch-format diff for the given side.
    fn capture_diff(&self, side: DiffSide, color: bool, pathspec: &[String]) -> Result<Vec<u8>>;

    /// Capture `--numstat -z` output for the given side.
    fn numstat(&self, side: DiffSide, pathspec: &[String]) -> Result<Vec<u8>>;

    /// Pipe a reassembled patch into `apply --cached`.
    fn apply_cached(&self, patch: &[u8]) -> Result<()>;

    /// Refresh the index's stat information.
    fn refresh_index(&self) -> Result<()>;

    /// Resolve a colorbool config key, with `auto` decided by the tty bit.
    fn config_colorbool(&self, key: &str, stdout_is_tty: bool) -> Result<bool>;

    /// Resolve a color config key to its ANSI escape, falling back to the
    /// given default.
    fn config_color(&self, key: &str, default: &str) -> Result<String>;
}

/// [`Git`] backed by the `git` binary, with every child process pointed
/// at the session's index file.
pub struct GitCli {
    index_file: String,
}

impl GitCli {
    /// Resolve the repository's index file. Fails outside a repository.
    pub fn new() -> Result<Self> {
        let index_file = Cmd::new("git")
            .args(&["rev-parse", "--git-path", "index"])
            .run_and_capture_stdout()
            .context("not inside a git repository")?;
        Ok(Self { index_file })
    }

    fn git(&self) -> Cmd<'_> {
        Cmd::new("git").env("GIT_INDEX_FILE", &self.index_file)
    }

    fn head_or_empty_tree(&self) -> Result<&'static str> {
        let has_head = self
            .git()
            .args(&["rev-parse", "--verify", "--quiet", "HEAD"])
            .run_as_check()?;
        Ok(if has_head { "HEAD" } else { EMPTY_TREE })
    }
}

impl Git for GitCli {
    fn capture_diff(&self, side: DiffSide, color: bool, pathspec: &[String]) -> Result<Vec<u8>> {
        let color_arg = if color { "--color" } else { "--no-color" };
        let mut cmd = self.git();
        match side {
            DiffSide::Worktree => {
                cmd = cmd.args(&["diff-files", "-p", color_arg]);
            }
            DiffSide::Staged => {
                cmd = cmd
                    .args(&["diff-index", "-p", "--cached", color_arg])
                    .arg(self.head_or_empty_tree()?);
            }
        }
        cmd = cmd.arg("--");
        for path in pathspec {
            cmd = cmd.arg(path);
        }
        debug!(?side, color, "capturing diff");
        cmd.run_and_capture_bytes()
    }

    fn numstat(&self, side: DiffSide, pathspec: &[String]) -> Result<Vec<u8>> {
        let mut cmd = self.git();
        match side {
            DiffSide::Worktree => {
                cmd = cmd.args(&["diff-files", "--numstat", "-z"]);
            }
            DiffSide::Staged => {
                cmd = cmd
                    .args(&["diff-index", "--cached", "--numstat", "-z"])
                    .arg(self.head_or_empty_tree()?);
            }
        }
        cmd = cmd.arg("--");
        for path in pathspec {
            cmd = cmd.arg(path);
        }
        cmd.run_and_capture_bytes()
    }

    fn apply_cached(&self, patch: &[u8]) -> Result<()> {
        debug!(bytes = patch.len(), "applying patch to the index");
        self.git()
            .args(&["apply", "--cached"])
            .run_with_input(patch)?;
        Ok(())
    }

    fn refresh_index(&self) -> Result<()> {
        self.git().args(&["update-index", "-q", "--refresh"]).run()?;
        Ok(())
    }

    fn config_colorbool(&self, key: &str, stdout_is_tty: bool) -> Result<bool> {
        let tty = if stdout_is_tty { "true" } else { "false" };
        let value = self
            .git()
            .args(&["config", "--get-colorbool", key, tty])
            .run_and_capture_stdout()?;
        Ok(value == "true")
    }

    fn config_color(&self, key: &str, default: &str) -> Result<String> {
        // `--get-color` prints the raw escape with no trailing newline
        let output = self
            .git()
            .args(&["config", "--get-color", key, default])
            .run()?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use anyhow::bail;
    use std::cell::{Cell, RefCell};

    /// Canned [`Git`] for driving the interactive flows in tests.
    #[derive(Default)]
    pub struct FakeGit {
        pub worktree_diff: Vec<u8>,
        pub colored_worktree_diff: Option<Vec<u8>>,
        pub staged_diff: Vec<u8>,
        pub worktree_numstat: Vec<u8>,
        pub staged_numstat: Vec<u8>,
        pub use_color: bool,
        pub fail_apply: bool,
        pub applied: RefCell<Vec<Vec<u8>>>,
        pub refreshes: Cell<usize>,
    }

    impl Git for FakeGit {
        fn capture_diff(
            &self,
            side: DiffSide,
            color: bool,
            _pathspec: &[String],
        ) -> Result<Vec<u8>> {
            Ok(match (side, color) {
                (DiffSide::Worktree, false) => self.worktree_diff.clone(),
                (DiffSide::Worktree, true) => self
                    .colored_worktree_diff
                    .clone()
                    .unwrap_or_else(|| self.worktree_diff.clone()),
                (DiffSide::Staged, _) => self.staged_diff.clone(),
            })
        }

        fn numstat(&self, side: DiffSide, _pathspec: &[String]) -> Result<Vec<u8>> {
            Ok(match side {
                DiffSide::Worktree => self.worktree_numstat.clone(),
                DiffSide::Staged => self.staged_numstat.clone(),
            })
        }

        fn apply_cached(&self, patch: &[u8]) -> Result<()> {
            if self.fail_apply {
                bail!("'apply --cached' exited with status 1");
            }
            self.applied.borrow_mut().push(patch.to_vec());
            Ok(())
        }

        fn refresh_index(&self) -> Result<()> {
            self.refreshes.set(self.refreshes.get() + 1);
            Ok(())
        }

        fn config_colorbool(&self, _key: &str, _stdout_is_tty: bool) -> Result<bool> {
            Ok(self.use_color)
        }

        fn config_color(&self, _key: &str, default: &str) -> Result<String> {
            Ok(format!("[{default}]"))
        }
    }
}
