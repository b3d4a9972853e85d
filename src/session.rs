//! Session state and the top-level menu loop.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use tracing::warn;

use crate::chooser::{self, Choice, ChoiceItem, ListOptions, write_prefixed_name};
use crate::colors::Palette;
use crate::command;
use crate::files::{self, FileItem, file_list_header};
use crate::git::Git;

/// Whether the menu loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Everything one interactive run owns: the VCS seam, the resolved
/// palette, the pathspec filter, the current file list, and the line I/O.
pub struct Session<'a> {
    pub git: &'a dyn Git,
    pub colors: Palette,
    pub pathspec: Vec<String>,
    pub files: Vec<FileItem>,
    pub input: &'a mut dyn BufRead,
    pub out: &'a mut dyn Write,
    pub err: &'a mut dyn Write,
}

struct MenuCommand {
    name: &'static str,
    describe: &'static str,
    run: fn(&mut Session) -> Result<Flow>,
}

impl ChoiceItem for MenuCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn write_item(
        &self,
        n: usize,
        prefix_len: usize,
        colors: &Palette,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        write_prefixed_name(n, self.name, prefix_len, colors, out)
    }
}

const COMMANDS: &[MenuCommand] = &[
    MenuCommand {
        name: "status",
        describe: "show paths with changes",
        run: command::status::run,
    },
    MenuCommand {
        name: "patch",
        describe: "pick hunks and stage them selectively",
        run: command::patch::run,
    },
    MenuCommand {
        name: "diff",
        describe: "view what has been staged so far",
        run: command::diff::run,
    },
    MenuCommand {
        name: "quit",
        describe: "leave the session",
        run: quit,
    },
    MenuCommand {
        name: "help",
        describe: "show this help",
        run: help,
    },
];

fn quit(_session: &mut Session) -> Result<Flow> {
    Ok(Flow::Quit)
}

fn help(session: &mut Session) -> Result<Flow> {
    for command in COMMANDS {
        writeln!(
            session.out,
            "{}{:<6} - {}{}",
            session.colors.help, command.name, command.describe, session.colors.reset
        )?;
    }
    Ok(Flow::Continue)
}

impl Session<'_> {
    /// Re-run the file-change collector over the session's pathspec.
    pub fn update_files(&mut self) -> Result<()> {
        self.files = files::collect_files(self.git, &self.pathspec)?;
        Ok(())
    }

    /// Print the modified-file listing with its column header.
    pub fn list_files(&mut self) -> Result<()> {
        let header = file_list_header();
        let items: Vec<&dyn ChoiceItem> = self
            .files
            .iter()
            .map(|file| file as &dyn ChoiceItem)
            .collect();
        chooser::list_only(&items, Some(&header), 0, &self.colors, &mut *self.out)
    }

    /// The interactive entry point: initial status pass, then the
    /// command menu until `quit` or end of input.
    pub fn main_loop(&mut self) -> Result<()> {
        if let Err(e) = self.git.refresh_index() {
            warn!(error = %e, "could not refresh the index");
        }
        self.update_files()?;
        self.list_files()?;

        loop {
            let items: Vec<&dyn ChoiceItem> = COMMANDS
                .iter()
                .map(|command| command as &dyn ChoiceItem)
                .collect();
            let opts = ListOptions {
                header: Some("*** Commands ***"),
                prompt: "What now",
                columns: 4,
            };
            let choice = chooser::list_and_choose(
                &items,
                &opts,
                &self.colors,
                &mut *self.input,
                &mut *self.out,
            )?;
            match choice {
                Choice::Item(i) => match (COMMANDS[i].run)(self) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => break,
                    Err(e) => {
                        writeln!(self.err, "{}{e:#}{}", self.colors.error, self.colors.reset)?;
                    }
                },
                Choice::None => {}
                Choice::Quit => break,
            }
        }
        writeln!(self.out, "Bye.")?;
        Ok(())
    }
}
