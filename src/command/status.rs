use anyhow::Result;

use crate::session::{Flow, Session};

/// List every modified path with its staged and unstaged change counts.
pub fn run(session: &mut Session) -> Result<Flow> {
    session.update_files()?;
    session.list_files()?;
    Ok(Flow::Continue)
}
