use anyhow::Result;

use crate::chooser::{self, Choice, ChoiceItem, ListOptions};
use crate::files::file_list_header;
use crate::git::DiffSide;
use crate::session::{Flow, Session};

/// Pick one file with staged changes and show its HEAD-vs-index diff.
pub fn run(session: &mut Session) -> Result<Flow> {
    session.update_files()?;
    let staged: Vec<_> = session
        .files
        .iter()
        .filter(|file| file.index.seen)
        .collect();
    if staged.is_empty() {
        writeln!(session.out, "No staged changes.")?;
        return Ok(Flow::Continue);
    }

    let header = file_list_header();
    let items: Vec<&dyn ChoiceItem> = staged
        .iter()
        .map(|file| *file as &dyn ChoiceItem)
        .collect();
    let opts = ListOptions {
        header: Some(&header),
        prompt: "Review diff",
        columns: 0,
    };
    let choice = chooser::list_and_choose(
        &items,
        &opts,
        &session.colors,
        &mut *session.input,
        &mut *session.out,
    )?;

    if let Choice::Item(i) = choice {
        let pathspec = vec![staged[i].path.clone()];
        let raw = session
            .git
            .capture_diff(DiffSide::Staged, session.colors.enabled(), &pathspec)?;
        session.out.write_all(&raw)?;
    }
    Ok(Flow::Continue)
}
