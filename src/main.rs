mod chooser;
mod cmd;
mod colors;
mod command;
mod diff;
mod files;
mod git;
mod logging;
mod prefix;
mod render;
mod session;

use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::colors::Palette;
use crate::git::GitCli;
use crate::session::Session;

#[derive(Parser)]
#[command(
    name = "stagehand",
    version,
    about = "Interactive staging for git working trees"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Menu-driven staging session (the default)
    #[command(visible_alias = "i")]
    Interactive {
        /// Limit the session to paths matching these pathspecs
        pathspec: Vec<String>,
    },
    /// Walk the working-tree diff and stage the chosen hunks
    #[command(visible_alias = "p")]
    Patch {
        /// Limit the session to paths matching these pathspecs
        pathspec: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init();

    let git = GitCli::new()?;
    let colors = Palette::resolve(&git)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    let mut err = io::stderr();

    let (pathspec, patch_only) = match cli.command {
        Some(Mode::Patch { pathspec }) => (pathspec, true),
        Some(Mode::Interactive { pathspec }) => (pathspec, false),
        None => (Vec::new(), false),
    };

    let mut session = Session {
        git: &git,
        colors,
        pathspec,
        files: Vec::new(),
        input: &mut input,
        out: &mut out,
        err: &mut err,
    };

    if patch_only {
        command::patch::run(&mut session).map(|_| ())
    } else {
        session.main_loop()
    }
}
