//! The modified-file list behind `status` and the menu.

use std::collections::HashMap;
use std::io::{self, Write};

use anyhow::Result;

use crate::chooser::ChoiceItem;
use crate::colors::Palette;
use crate::git::{DiffSide, Git};

/// Per-side change statistics for one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub added: u64,
    pub deleted: u64,
    /// The diff pass reported this file on this side.
    pub seen: bool,
    /// Binary file; the counts are meaningless.
    pub binary: bool,
}

impl ChangeCounts {
    /// `+A/-D`, `binary`, or the side's no-changes word.
    pub fn render(&self, no_changes: &str) -> String {
        if self.binary {
            "binary".to_string()
        } else if self.seen {
            format!("+{}/-{}", self.added, self.deleted)
        } else {
            no_changes.to_string()
        }
    }
}

/// A modified path with its staged and unstaged statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileItem {
    pub path: String,
    /// Staged side (index vs HEAD).
    pub index: ChangeCounts,
    /// Unstaged side (working tree vs index).
    pub worktree: ChangeCounts,
}

impl ChoiceItem for FileItem {
    fn name(&self) -> &str {
        &self.path
    }

    fn write_item(
        &self,
        n: usize,
        _prefix_len: usize,
        _colors: &Palette,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        write!(
            out,
            " {n:>2}: {:>12} {:>12} {}",
            self.index.render("unchanged"),
            self.worktree.render("nothing"),
            self.path
        )
    }
}

/// Column header aligned with [`FileItem`]'s listing format.
pub fn file_list_header() -> String {
    format!("     {:>12} {:>12} path", "staged", "unstaged")
}

#[derive(Debug, PartialEq, Eq)]
pub struct StatRecord {
    pub path: String,
    pub added: u64,
    pub deleted: u64,
    pub binary: bool,
}

/// Parse `--numstat -z` records: `added TAB deleted TAB path NUL`, with
/// `-` in place of the counts for binary files.
pub fn parse_numstat(raw: &[u8]) -> Vec<StatRecord> {
    raw.split(|&b| b == 0)
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let mut fields = record.splitn(3, |&b| b == b'\t');
            let added = fields.next()?;
            let deleted = fields.next()?;
            let path = fields.next()?;
            Some(StatRecord {
                path: String::from_utf8_lossy(path).to_string(),
                added: parse_count(added),
                deleted: parse_count(deleted),
                binary: added == b"-" || deleted == b"-",
            })
        })
        .collect()
}

fn parse_count(field: &[u8]) -> u64 {
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Gather the modified-file list: one unstaged pass and one staged pass,
/// merged per path, sorted by path.
pub fn collect_files(git: &dyn Git, pathspec: &[String]) -> Result<Vec<FileItem>> {
    let mut files: Vec<FileItem> = Vec::new();
    let mut by_path: HashMap<String, usize> = HashMap::new();

    for side in [DiffSide::Worktree, DiffSide::Staged] {
        let raw = git.numstat(side, pathspec)?;
        for record in parse_numstat(&raw) {
            let index = *by_path.entry(record.path.clone()).or_insert_with(|| {
                files.push(FileItem {
                    path: record.path.clone(),
                    ..FileItem::default()
                });
                files.len() - 1
            });
            let counts = match side {
                DiffSide::Worktree => &mut files[index].worktree,
                DiffSide::Staged => &mut files[index].index,
            };
            counts.seen = true;
            counts.binary = record.binary;
            counts.added = record.added;
            counts.deleted = record.deleted;
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
