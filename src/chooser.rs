//! The "list and choose" engine behind every menu.
//!
//! Items are listed with 1-based numbers and shortest-unique-prefix
//! highlighting; a selection is read as either a number or an
//! unambiguous name prefix.

use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::colors::Palette;
use crate::prefix::find_unique_prefixes;

/// Bounds for the prefixes offered as selection shortcuts.
const MIN_PREFIX: usize = 1;
const MAX_PREFIX: usize = 4;

/// Outcome of one `list_and_choose` round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// The 0-based index of the chosen item.
    Item(usize),
    /// Empty input: the user chose nothing.
    None,
    /// End of input: leave the enclosing loop.
    Quit,
}

/// An entry the chooser can display and match input against.
pub trait ChoiceItem {
    fn name(&self) -> &str;

    /// Write the display line (or cell) for this item, without any
    /// trailing separator. `n` is the 1-based list number.
    fn write_item(
        &self,
        n: usize,
        prefix_len: usize,
        colors: &Palette,
        out: &mut dyn Write,
    ) -> io::Result<()>;
}

pub struct ListOptions<'a> {
    pub header: Option<&'a str>,
    pub prompt: &'a str,
    /// Items per row; 0 lists one per line.
    pub columns: usize,
}

/// Print an item as ` nn: name` with its unique prefix highlighted.
pub fn write_prefixed_name(
    n: usize,
    name: &str,
    prefix_len: usize,
    colors: &Palette,
    out: &mut dyn Write,
) -> io::Result<()> {
    if prefix_len > 0 && name.is_char_boundary(prefix_len) {
        let (prefix, rest) = name.split_at(prefix_len);
        write!(out, " {n:>2}: {}{prefix}{}{rest}", colors.prompt, colors.reset)
    } else {
        write!(out, " {n:>2}: {name}")
    }
}

/// Display the items, wrapped into `columns` tab-separated cells per row.
/// The block always ends with a newline.
pub fn list(
    items: &[&dyn ChoiceItem],
    prefix_lengths: &[usize],
    header: Option<&str>,
    columns: usize,
    colors: &Palette,
    out: &mut dyn Write,
) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    if let Some(header) = header {
        writeln!(out, "{}{header}{}", colors.header, colors.reset)?;
    }
    let mut last_lf = false;
    for (i, item) in items.iter().enumerate() {
        item.write_item(i + 1, prefix_lengths.get(i).copied().unwrap_or(0), colors, out)?;
        if columns > 0 && (i + 1) % columns != 0 {
            write!(out, "\t")?;
            last_lf = false;
        } else {
            writeln!(out)?;
            last_lf = true;
        }
    }
    if !last_lf {
        writeln!(out)?;
    }
    Ok(())
}

/// Display the items without selection shortcuts (status-style listing).
pub fn list_only(
    items: &[&dyn ChoiceItem],
    header: Option<&str>,
    columns: usize,
    colors: &Palette,
    out: &mut dyn Write,
) -> Result<()> {
    list(items, &vec![0; items.len()], header, columns, colors, out)
}

/// Repeatedly display the items and read input until a selection is made,
/// the user submits an empty line, or input ends.
pub fn list_and_choose(
    items: &[&dyn ChoiceItem],
    opts: &ListOptions<'_>,
    colors: &Palette,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<Choice> {
    loop {
        let names: Vec<&str> = items.iter().map(|item| item.name()).collect();
        let prefixes = find_unique_prefixes(&names, MIN_PREFIX, MAX_PREFIX);
        list(items, &prefixes, opts.header, opts.columns, colors, out)?;
        write!(out, "{}{}{}> ", colors.prompt, opts.prompt, colors.reset)?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(Choice::Quit);
        }
        let line = line.trim();
        if line.is_empty() {
            return Ok(Choice::None);
        }
        if line == "?" {
            print_prompt_help(colors, out)?;
            continue;
        }

        let mut selected = None;
        for token in line
            .split([' ', '\t', '\r', '\n', ','])
            .filter(|token| !token.is_empty())
        {
            let resolved = if token.bytes().all(|b| b.is_ascii_digit()) {
                parse_index(token, items.len())
            } else {
                find_unique(token, items)
            };
            match resolved {
                Some(i) => {
                    selected = Some(i);
                    break;
                }
                None => writeln!(out, "{}Huh ({token})?{}", colors.error, colors.reset)?,
            }
        }
        if let Some(i) = selected {
            return Ok(Choice::Item(i));
        }
    }
}

fn print_prompt_help(colors: &Palette, out: &mut dyn Write) -> Result<()> {
    for line in [
        "Prompt help:",
        "1          - select a numbered item",
        "foo        - select item based on unique prefix",
        "           - (empty) select nothing",
    ] {
        writeln!(out, "{}{line}{}", colors.help, colors.reset)?;
    }
    Ok(())
}

/// An all-digit token is a 1-based index into the list.
fn parse_index(token: &str, nr: usize) -> Option<usize> {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: usize = token.parse().ok()?;
    (1..=nr).contains(&n).then(|| n - 1)
}

/// Resolve a token to the single item it names. An exact name match wins;
/// otherwise the token must be a prefix of exactly one name.
fn find_unique(token: &str, items: &[&dyn ChoiceItem]) -> Option<usize> {
    if let Some(i) = items.iter().position(|item| item.name() == token) {
        return Some(i);
    }
    let mut matches = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.name().starts_with(token));
    match (matches.next(), matches.next()) {
        (Some((i, _)), None) => Some(i),
        _ => None,
    }
}
