//! The hunk-by-hunk staging session.
//!
//! Per file, every hunk is shown in turn and decided with a single key;
//! once nothing is left undecided, the staged hunks are reassembled into
//! a patch and piped into `apply --cached`.

use std::io::{BufRead, Write};

use anyhow::Result;
use tracing::warn;

use crate::colors::Palette;
use crate::diff::{Decision, DiffBuffers, FileDiff, parse_diff};
use crate::git::{DiffSide, Git};
use crate::session::{Flow, Session};

const HUNK_HELP: &str = "\
y - stage this hunk
n - do not stage this hunk
a - stage this hunk and all later hunks in the file
d - do not stage this hunk or any later hunks in the file
j - leave this hunk undecided, see next undecided hunk
J - leave this hunk undecided, see next hunk
k - leave this hunk undecided, see previous undecided hunk
K - leave this hunk undecided, see previous hunk";

/// Capture the working-tree diff and walk it file by file.
///
/// A failure in one file does not stop the session; the last error is
/// surfaced once every file has been offered.
pub fn run(session: &mut Session) -> Result<Flow> {
    let plain = session
        .git
        .capture_diff(DiffSide::Worktree, false, &session.pathspec)?;
    if plain.is_empty() {
        writeln!(session.out, "No changes.")?;
        return Ok(Flow::Continue);
    }
    let colored = if session.colors.enabled() {
        Some(
            session
                .git
                .capture_diff(DiffSide::Worktree, true, &session.pathspec)?,
        )
    } else {
        None
    };
    let mut parsed = parse_diff(plain, colored)?;

    let mut last_err = None;
    for file in &mut parsed.files {
        if let Err(e) = patch_update_file(
            session.git,
            &session.colors,
            &parsed.buffers,
            file,
            &mut *session.input,
            &mut *session.out,
            &mut *session.err,
        ) {
            last_err = Some(e);
        }
    }
    match last_err {
        Some(e) => Err(e),
        None => Ok(Flow::Continue),
    }
}

/// Walk one file's hunks until everything is decided (or input ends),
/// then stage whatever was accepted.
fn patch_update_file(
    git: &dyn Git,
    colors: &Palette,
    buffers: &DiffBuffers,
    file: &mut FileDiff,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    if file.hunks.is_empty() {
        return Ok(());
    }
    let colored = buffers.colored.is_some();
    let mut buf = Vec::new();
    buffers.render_hunk(&file.head, 0, colored, colors, &mut buf);
    out.write_all(&buf)?;

    let mut hunk_index = 0;
    loop {
        if hunk_index >= file.hunks.len() {
            hunk_index = 0;
        }
        let undecided_previous = file.hunks[..hunk_index]
            .iter()
            .rposition(|hunk| hunk.decision == Decision::Undecided);
        let undecided_next = file.hunks[hunk_index + 1..]
            .iter()
            .position(|hunk| hunk.decision == Decision::Undecided)
            .map(|i| hunk_index + 1 + i);

        // Everything decided?
        if undecided_previous.is_none()
            && undecided_next.is_none()
            && file.hunks[hunk_index].decision != Decision::Undecided
        {
            break;
        }

        buf.clear();
        buffers.render_hunk(&file.hunks[hunk_index], 0, colored, colors, &mut buf);
        out.write_all(&buf)?;

        let mut nav = String::new();
        if undecided_previous.is_some() {
            nav.push_str(",k");
        }
        if hunk_index > 0 {
            nav.push_str(",K");
        }
        if undecided_next.is_some() {
            nav.push_str(",j");
        }
        if hunk_index + 1 < file.hunks.len() {
            nav.push_str(",J");
        }
        write!(
            out,
            "{}Stage this hunk [y,n,a,d{nav},?]? {}",
            colors.prompt, colors.reset
        )?;
        out.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            break;
        }
        let answer = answer.trim_end_matches(['\r', '\n']);
        if answer.is_empty() {
            continue;
        }

        match answer.as_bytes()[0].to_ascii_lowercase() {
            b'y' => {
                file.hunks[hunk_index].decision = Decision::Stage;
                hunk_index = next_undecided_from(file, hunk_index);
            }
            b'n' => {
                file.hunks[hunk_index].decision = Decision::Skip;
                hunk_index = next_undecided_from(file, hunk_index);
            }
            b'a' => {
                for hunk in &mut file.hunks[hunk_index..] {
                    if hunk.decision == Decision::Undecided {
                        hunk.decision = Decision::Stage;
                    }
                }
                hunk_index = file.hunks.len();
            }
            b'd' => {
                for hunk in &mut file.hunks[hunk_index..] {
                    if hunk.decision == Decision::Undecided {
                        hunk.decision = Decision::Skip;
                    }
                }
                hunk_index = file.hunks.len();
            }
            _ => match answer.as_bytes()[0] {
                b'K' => {
                    if hunk_index > 0 {
                        hunk_index -= 1;
                    } else {
                        error_line(colors, err, "No previous hunk")?;
                    }
                }
                b'J' => {
                    if hunk_index + 1 < file.hunks.len() {
                        hunk_index += 1;
                    } else {
                        error_line(colors, err, "No next hunk")?;
                    }
                }
                b'k' => match undecided_previous {
                    Some(i) => hunk_index = i,
                    None => error_line(colors, err, "No previous hunk")?,
                },
                b'j' => match undecided_next {
                    Some(i) => hunk_index = i,
                    None => error_line(colors, err, "No next hunk")?,
                },
                _ => error_line(colors, err, HUNK_HELP)?,
            },
        }
    }

    if file
        .hunks
        .iter()
        .any(|hunk| hunk.decision == Decision::Stage)
    {
        let mut patch = Vec::new();
        buffers.reassemble_patch(file, &mut patch);
        match git.apply_cached(&patch) {
            Ok(()) => {
                if let Err(e) = git.refresh_index() {
                    warn!(error = %e, "could not refresh the index after apply");
                }
            }
            Err(e) => error_line(colors, err, &format!("{e:#}"))?,
        }
    }
    writeln!(out)?;
    Ok(())
}

/// Step past the current hunk to the next undecided one, or to the end
/// of the list; the loop head wraps back to zero from there.
fn next_undecided_from(file: &FileDiff, current: usize) -> usize {
    let mut i = current + 1;
    while i < file.hunks.len() && file.hunks[i].decision != Decision::Undecided {
        i += 1;
    }
    i
}

fn error_line(colors: &Palette, err: &mut dyn Write, msg: &str) -> Result<()> {
    writeln!(err, "{}{msg}{}", colors.error, colors.reset)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ParsedDiff;
    use crate::git::testing::FakeGit;
    use std::io::Cursor;

    const ONE_HUNK: &str = "\
diff --git a/foo b/foo
--- a/foo
+++ b/foo
@@ -1,2 +1,2 @@
 a
-b
+c
";

    const THREE_HUNKS: &str = "\
diff --git a/foo b/foo
--- a/foo
+++ b/foo
@@ -1,3 +1,4 @@
 a
+a2
 b
 c
@@ -10,5 +11,2 @@
 d
-e
-f
-g
 h
@@ -20,3 +18,3 @@
 u
-v
+w
";

    struct Run {
        parsed: ParsedDiff,
        out: String,
        err: String,
    }

    fn walk(git: &FakeGit, diff: &str, keys: &str) -> Run {
        let mut parsed = parse_diff(diff.as_bytes().to_vec(), None).unwrap();
        let mut out = Vec::new();
        let mut err = Vec::new();
        patch_update_file(
            git,
            &Palette::plain(),
            &parsed.buffers,
            &mut parsed.files[0],
            &mut Cursor::new(keys.as_bytes()),
            &mut out,
            &mut err,
        )
        .unwrap();
        Run {
            parsed,
            out: String::from_utf8(out).unwrap(),
            err: String::from_utf8(err).unwrap(),
        }
    }

    fn decisions(run: &Run) -> Vec<Decision> {
        run.parsed.files[0]
            .hunks
            .iter()
            .map(|hunk| hunk.decision)
            .collect()
    }

    #[test]
    fn accepting_the_only_hunk_stages_the_whole_diff() {
        let git = FakeGit::default();
        let run = walk(&git, ONE_HUNK, "y\n");
        assert_eq!(decisions(&run), vec![Decision::Stage]);
        let applied = git.applied.borrow();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0], ONE_HUNK.as_bytes());
        assert_eq!(git.refreshes.get(), 1);
    }

    #[test]
    fn rejecting_the_only_hunk_applies_nothing() {
        let git = FakeGit::default();
        let run = walk(&git, ONE_HUNK, "n\n");
        assert_eq!(decisions(&run), vec![Decision::Skip]);
        assert!(git.applied.borrow().is_empty());
        assert_eq!(git.refreshes.get(), 0);
    }

    #[test]
    fn upper_case_y_also_accepts() {
        let git = FakeGit::default();
        let run = walk(&git, ONE_HUNK, "Y\n");
        assert_eq!(decisions(&run), vec![Decision::Stage]);
    }

    #[test]
    fn skipping_a_hunk_shifts_later_offsets() {
        let git = FakeGit::default();
        let run = walk(&git, THREE_HUNKS, "y\nn\ny\n");
        assert_eq!(
            decisions(&run),
            vec![Decision::Stage, Decision::Skip, Decision::Stage]
        );
        let applied = git.applied.borrow();
        let patch = String::from_utf8(applied[0].clone()).unwrap();
        assert!(patch.contains("@@ -1,3 +1,4 @@"));
        assert!(!patch.contains("-e\n"));
        // The skipped middle hunk hands its 5-2=3 lines back to the third.
        assert!(patch.contains("@@ -20,3 +21,3 @@"));
    }

    #[test]
    fn previous_navigation_at_the_first_hunk_reports_an_error() {
        let git = FakeGit::default();
        let run = walk(&git, THREE_HUNKS, "K\nk\n");
        assert_eq!(run.err, "No previous hunk\nNo previous hunk\n");
        assert_eq!(
            decisions(&run),
            vec![Decision::Undecided; 3],
        );
        assert!(git.applied.borrow().is_empty());
    }

    #[test]
    fn next_navigation_at_the_last_hunk_reports_an_error() {
        let git = FakeGit::default();
        let run = walk(&git, THREE_HUNKS, "J\nJ\nJ\nj\n");
        assert_eq!(run.err, "No next hunk\nNo next hunk\n");
    }

    #[test]
    fn the_first_prompt_offers_only_forward_navigation() {
        let git = FakeGit::default();
        let run = walk(&git, THREE_HUNKS, "");
        assert!(run.out.contains("Stage this hunk [y,n,a,d,j,J,?]? "));
    }

    #[test]
    fn a_revisited_hunk_offers_backward_navigation() {
        let git = FakeGit::default();
        let run = walk(&git, THREE_HUNKS, "J\n");
        assert!(run.out.contains("Stage this hunk [y,n,a,d,k,K,j,J,?]? "));
    }

    #[test]
    fn undecided_hunk_left_behind_is_revisited_before_the_loop_ends() {
        let git = FakeGit::default();
        let run = walk(&git, THREE_HUNKS, "y\nJ\ny\ny\ny\n");
        assert_eq!(decisions(&run), vec![Decision::Stage; 3]);
        let applied = git.applied.borrow();
        assert_eq!(applied[0], THREE_HUNKS.as_bytes());
    }

    #[test]
    fn end_of_input_applies_only_the_recorded_decisions() {
        let git = FakeGit::default();
        let run = walk(&git, THREE_HUNKS, "y\nJ\ny\n");
        assert_eq!(
            decisions(&run),
            vec![Decision::Stage, Decision::Undecided, Decision::Stage]
        );
        let patch = String::from_utf8(git.applied.borrow()[0].clone()).unwrap();
        assert!(patch.contains("@@ -1,3 +1,4 @@"));
        assert!(patch.contains("@@ -20,3 +21,3 @@"));
        assert!(!patch.contains("@@ -10,5"));
    }

    #[test]
    fn accept_rest_decides_every_remaining_hunk() {
        let git = FakeGit::default();
        let run = walk(&git, THREE_HUNKS, "n\na\n");
        assert_eq!(
            decisions(&run),
            vec![Decision::Skip, Decision::Stage, Decision::Stage]
        );
        let patch = String::from_utf8(git.applied.borrow()[0].clone()).unwrap();
        // The first hunk added one line; skipping it pulls later hunks up.
        assert!(patch.contains("@@ -10,5 +10,2 @@"));
        assert!(patch.contains("@@ -20,3 +17,3 @@"));
    }

    #[test]
    fn reject_rest_leaves_nothing_to_apply() {
        let git = FakeGit::default();
        let run = walk(&git, THREE_HUNKS, "d\n");
        assert_eq!(decisions(&run), vec![Decision::Skip; 3]);
        assert!(git.applied.borrow().is_empty());
    }

    #[test]
    fn unknown_keys_print_the_help_text() {
        let git = FakeGit::default();
        let run = walk(&git, ONE_HUNK, "x\ny\n");
        assert!(run.err.contains("y - stage this hunk"));
        assert!(run.err.contains("K - leave this hunk undecided, see previous hunk"));
        assert_eq!(decisions(&run), vec![Decision::Stage]);
    }

    #[test]
    fn blank_answers_reprompt_without_deciding() {
        let git = FakeGit::default();
        let run = walk(&git, ONE_HUNK, "\n\ny\n");
        assert_eq!(decisions(&run), vec![Decision::Stage]);
    }

    #[test]
    fn apply_failure_is_reported_and_not_fatal() {
        let git = FakeGit {
            fail_apply: true,
            ..FakeGit::default()
        };
        let run = walk(&git, ONE_HUNK, "y\n");
        assert!(run.err.contains("'apply --cached' exited with status 1"));
        assert_eq!(git.refreshes.get(), 0);
    }

    #[test]
    fn file_without_hunks_is_skipped_silently() {
        let git = FakeGit::default();
        let mut parsed = parse_diff(
            b"diff --git a/bin b/bin\nBinary files a/bin and b/bin differ\n".to_vec(),
            None,
        )
        .unwrap();
        let mut out = Vec::new();
        let mut err = Vec::new();
        patch_update_file(
            &git,
            &Palette::plain(),
            &parsed.buffers,
            &mut parsed.files[0],
            &mut Cursor::new(b""),
            &mut out,
            &mut err,
        )
        .unwrap();
        assert!(out.is_empty());
        assert!(git.applied.borrow().is_empty());
    }

    #[test]
    fn the_file_prelude_is_printed_before_the_first_hunk() {
        let git = FakeGit::default();
        let run = walk(&git, ONE_HUNK, "y\n");
        assert!(run.out.starts_with("diff --git a/foo b/foo\n"));
    }
}
