//! Unified-diff parsing for the patch session.
//!
//! The captured diff is kept as one immutable byte buffer (plus an
//! optional colored twin with the same line structure) and parsed into
//! files and hunks that index into it. Nothing is copied out of the
//! buffers; the renderer re-emits ranges from whichever buffer it needs.

use thiserror::Error;

/// What the user decided about a hunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Decision {
    #[default]
    Undecided,
    Skip,
    Stage,
}

/// Parsed `@@ -<o>[,<c>] +<o>[,<c>] @@<trailer>` header fields, plus the
/// byte ranges of the trailer in both buffers. The head hunk of a file
/// keeps all of this zeroed, which the renderer treats as pass-through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_offset: u64,
    pub old_count: u64,
    pub new_offset: u64,
    pub new_count: u64,
    /// Trailer after the second `@@`, through the end of the header line
    /// (the newline included).
    pub extra_start: usize,
    pub extra_end: usize,
    pub colored_extra_start: usize,
    pub colored_extra_end: usize,
}

/// A hunk body as byte ranges into the plain and colored buffers. For
/// header hunks `start` points past the `@@` line, so the range covers
/// body lines only.
#[derive(Debug, Clone, Copy)]
pub struct Hunk {
    pub start: usize,
    pub end: usize,
    pub colored_start: usize,
    pub colored_end: usize,
    pub header: HunkHeader,
    pub decision: Decision,
}

impl Hunk {
    fn at(start: usize, end: usize, colored_start: usize, colored_end: usize) -> Self {
        Self {
            start,
            end,
            colored_start,
            colored_end,
            header: HunkHeader::default(),
            decision: Decision::Undecided,
        }
    }
}

/// One file block: the prelude from its `diff` line up to the first `@@`
/// (the head hunk), followed by the hunks.
#[derive(Debug)]
pub struct FileDiff {
    pub head: Hunk,
    pub hunks: Vec<Hunk>,
}

/// The immutable buffers every hunk range points into.
#[derive(Debug)]
pub struct DiffBuffers {
    pub plain: Vec<u8>,
    pub colored: Option<Vec<u8>>,
}

#[derive(Debug)]
pub struct ParsedDiff {
    pub buffers: DiffBuffers,
    pub files: Vec<FileDiff>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiffParseError {
    #[error("diff output does not start with a file header: '{0}'")]
    MissingFileHeader(String),
    #[error("could not parse hunk header '{0}'")]
    BadHunkHeader(String),
    #[error("could not parse colored hunk header '{0}'")]
    BadColoredHunkHeader(String),
    #[error("colored diff output does not line up with the plain output")]
    ColoredMismatch,
}

/// Split the captured diff into files and hunks.
///
/// `colored`, when present, must be the same diff rendered with color:
/// identical line structure, different bytes on colored lines. The walk
/// advances through both buffers line by line so every hunk carries
/// mirrored ranges into each.
pub fn parse_diff(
    plain: Vec<u8>,
    colored: Option<Vec<u8>>,
) -> Result<ParsedDiff, DiffParseError> {
    let mut plain = plain;
    ensure_trailing_newline(&mut plain);
    let mut colored = colored;
    if let Some(buf) = colored.as_mut() {
        ensure_trailing_newline(buf);
    }

    let mut files: Vec<FileDiff> = Vec::new();
    let mut pos = 0;
    let mut colored_pos = 0;

    while pos < plain.len() {
        let eol = line_end(&plain, pos);
        let colored_eol = match &colored {
            Some(buf) => {
                if colored_pos >= buf.len() {
                    return Err(DiffParseError::ColoredMismatch);
                }
                line_end(buf, colored_pos)
            }
            None => 0,
        };
        let line = &plain[pos..eol];

        if line.starts_with(b"diff ") {
            files.push(FileDiff {
                head: Hunk::at(pos, eol, colored_pos, colored_eol),
                hunks: Vec::new(),
            });
        } else {
            let Some(file) = files.last_mut() else {
                return Err(DiffParseError::MissingFileHeader(lossy_line(line)));
            };
            if line.starts_with(b"@@ ") {
                let mut hunk = Hunk::at(pos, eol, colored_pos, colored_eol);
                parse_hunk_header(&plain, colored.as_deref(), &mut hunk, eol, colored_eol)?;
                file.hunks.push(hunk);
            } else {
                let current = match file.hunks.last_mut() {
                    Some(hunk) => hunk,
                    None => &mut file.head,
                };
                current.end = eol;
                current.colored_end = colored_eol;
            }
        }

        pos = eol;
        colored_pos = colored_eol;
    }

    if let Some(buf) = &colored
        && colored_pos != buf.len()
    {
        return Err(DiffParseError::ColoredMismatch);
    }

    Ok(ParsedDiff {
        buffers: DiffBuffers { plain, colored },
        files,
    })
}

/// Parse the `@@` line the hunk currently starts on, record the header
/// fields and trailer ranges, and advance the hunk past the header line
/// in both buffers.
fn parse_hunk_header(
    plain: &[u8],
    colored: Option<&[u8]>,
    hunk: &mut Hunk,
    eol: usize,
    colored_eol: usize,
) -> Result<(), DiffParseError> {
    let line = &plain[hunk.start..eol];
    let (old_offset, old_count, new_offset, new_count, rest) =
        parse_header_line(line).ok_or_else(|| DiffParseError::BadHunkHeader(lossy_line(line)))?;

    hunk.header.old_offset = old_offset;
    hunk.header.old_count = old_count;
    hunk.header.new_offset = new_offset;
    hunk.header.new_count = new_count;
    hunk.header.extra_start = hunk.start + rest;
    hunk.header.extra_end = eol;
    hunk.start = eol;
    hunk.end = eol;

    if let Some(colored) = colored {
        let cline = &colored[hunk.colored_start..colored_eol];
        let open = find(cline, b"@@ -")
            .ok_or_else(|| DiffParseError::BadColoredHunkHeader(lossy_line(cline)))?;
        let close = find(&cline[open + 4..], b" @@")
            .ok_or_else(|| DiffParseError::BadColoredHunkHeader(lossy_line(cline)))?;
        hunk.header.colored_extra_start = hunk.colored_start + open + 4 + close + 3;
        hunk.header.colored_extra_end = colored_eol;
        hunk.colored_start = colored_eol;
        hunk.colored_end = colored_eol;
    }
    Ok(())
}

/// `@@ -<o>[,<c>] +<o>[,<c>] @@` with counts defaulting to 1. Returns the
/// numbers and the line-relative offset of the trailer.
fn parse_header_line(line: &[u8]) -> Option<(u64, u64, u64, u64, usize)> {
    if !line.starts_with(b"@@ -") {
        return None;
    }
    let (old_offset, old_count, i) = parse_range(line, 4)?;
    if !line[i..].starts_with(b" +") {
        return None;
    }
    let (new_offset, new_count, i) = parse_range(line, i + 2)?;
    if !line[i..].starts_with(b" @@") {
        return None;
    }
    Some((old_offset, old_count, new_offset, new_count, i + 3))
}

fn parse_range(line: &[u8], i: usize) -> Option<(u64, u64, usize)> {
    let (offset, i) = parse_number(line, i)?;
    if line.get(i) == Some(&b',') {
        let (count, i) = parse_number(line, i + 1)?;
        Some((offset, count, i))
    } else {
        Some((offset, 1, i))
    }
}

fn parse_number(line: &[u8], start: usize) -> Option<(u64, usize)> {
    let mut i = start;
    let mut value: u64 = 0;
    while let Some(b) = line.get(i).filter(|b| b.is_ascii_digit()) {
        value = value.checked_mul(10)?.checked_add(u64::from(b - b'0'))?;
        i += 1;
    }
    (i > start).then_some((value, i))
}

fn ensure_trailing_newline(buf: &mut Vec<u8>) {
    if buf.last().is_some_and(|&b| b != b'\n') {
        buf.push(b'\n');
    }
}

/// Index one past this line's newline, or the end of the buffer.
fn line_end(buf: &[u8], pos: usize) -> usize {
    buf[pos..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|i| pos + i + 1)
        .unwrap_or(buf.len())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn lossy_line(line: &[u8]) -> String {
    String::from_utf8_lossy(line)
        .trim_end_matches('\n')
        .to_string()
}
