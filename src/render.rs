//! Hunk rendering and patch reassembly.
//!
//! Hunks are re-emitted with a regenerated `@@` header because skipping
//! an earlier hunk shifts the new-file line positions of every later one;
//! the applier requires self-consistent `+<offset>` values.

use crate::colors::Palette;
use crate::diff::{Decision, DiffBuffers, FileDiff, Hunk};

impl DiffBuffers {
    /// Append the hunk to `out`, plain or colored.
    ///
    /// A hunk whose header has both offsets zero (the file's head hunk)
    /// is written verbatim. Anything else gets a regenerated header with
    /// `delta` added to the new-file offset, the recorded trailer bytes,
    /// and then the body from the selected buffer.
    pub fn render_hunk(
        &self,
        hunk: &Hunk,
        delta: i64,
        colored: bool,
        colors: &Palette,
        out: &mut Vec<u8>,
    ) {
        let colored_buf = if colored { self.colored.as_deref() } else { None };
        let header = &hunk.header;

        if header.old_offset != 0 || header.new_offset != 0 {
            let (buf, extra_start, extra_end) = match colored_buf {
                Some(buf) => {
                    out.extend_from_slice(colors.fraginfo.as_bytes());
                    (buf, header.colored_extra_start, header.colored_extra_end)
                }
                None => (
                    self.plain.as_slice(),
                    header.extra_start,
                    header.extra_end,
                ),
            };

            let new_offset = header.new_offset as i64 + delta;
            out.extend_from_slice(
                format!(
                    "@@ -{},{} +{},{} @@",
                    header.old_offset, header.old_count, new_offset, header.new_count
                )
                .as_bytes(),
            );
            if extra_end > extra_start {
                out.extend_from_slice(&buf[extra_start..extra_end]);
            } else if colored_buf.is_some() {
                out.extend_from_slice(colors.reset.as_bytes());
                out.push(b'\n');
            } else {
                out.push(b'\n');
            }
        }

        match colored_buf {
            Some(buf) => out.extend_from_slice(&buf[hunk.colored_start..hunk.colored_end]),
            None => out.extend_from_slice(&self.plain[hunk.start..hunk.end]),
        }
    }

    /// Assemble the patch for one file from its staged hunks.
    ///
    /// The head hunk is always emitted. Every non-staged hunk shifts the
    /// running delta by `old_count - new_count` instead of being written,
    /// so later staged hunks land at their corrected offsets.
    pub fn reassemble_patch(&self, file: &FileDiff, out: &mut Vec<u8>) {
        let colors = Palette::plain();
        self.render_hunk(&file.head, 0, false, &colors, out);
        let mut delta = 0i64;
        for hunk in &file.hunks {
            if hunk.decision == Decision::Stage {
                self.render_hunk(hunk, delta, false, &colors, out);
            } else {
                delta += hunk.header.old_count as i64 - hunk.header.new_count as i64;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::test_palette;
    use crate::diff::{HunkHeader, parse_diff};

    const TWO_HUNKS: &str = "\
diff --git a/f b/f
--- a/f
+++ b/f
@@ -10,5 +10,2 @@
 a
-b
-c
-d
 e
@@ -20,3 +17,3 @@
 u
-v
+w
";

    fn rendered(buffers: &DiffBuffers, hunk: &Hunk, delta: i64, colored: bool) -> String {
        let mut out = Vec::new();
        buffers.render_hunk(hunk, delta, colored, &test_palette(), &mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn head_hunk_renders_verbatim() {
        let diff = parse_diff(TWO_HUNKS.as_bytes().to_vec(), None).unwrap();
        assert_eq!(
            rendered(&diff.buffers, &diff.files[0].head, 0, false),
            "diff --git a/f b/f\n--- a/f\n+++ b/f\n"
        );
    }

    #[test]
    fn delta_shifts_only_the_new_offset() {
        let diff = parse_diff(TWO_HUNKS.as_bytes().to_vec(), None).unwrap();
        let second = &diff.files[0].hunks[1];
        assert_eq!(
            rendered(&diff.buffers, second, 3, false),
            "@@ -20,3 +20,3 @@\n u\n-v\n+w\n"
        );
    }

    #[test]
    fn skipping_the_first_hunk_corrects_the_second() {
        let mut diff = parse_diff(TWO_HUNKS.as_bytes().to_vec(), None).unwrap();
        diff.files[0].hunks[0].decision = Decision::Skip;
        diff.files[0].hunks[1].decision = Decision::Stage;
        let mut out = Vec::new();
        diff.buffers.reassemble_patch(&diff.files[0], &mut out);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "diff --git a/f b/f\n--- a/f\n+++ b/f\n@@ -20,3 +20,3 @@\n u\n-v\n+w\n"
        );
    }

    #[test]
    fn staging_everything_reproduces_the_file_block() {
        let mut diff = parse_diff(TWO_HUNKS.as_bytes().to_vec(), None).unwrap();
        for hunk in &mut diff.files[0].hunks {
            hunk.decision = Decision::Stage;
        }
        let mut out = Vec::new();
        diff.buffers.reassemble_patch(&diff.files[0], &mut out);
        assert_eq!(out, TWO_HUNKS.as_bytes());
    }

    #[test]
    fn staging_nothing_emits_the_prelude_only() {
        let diff = parse_diff(TWO_HUNKS.as_bytes().to_vec(), None).unwrap();
        let mut out = Vec::new();
        diff.buffers.reassemble_patch(&diff.files[0], &mut out);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "diff --git a/f b/f\n--- a/f\n+++ b/f\n"
        );
    }

    #[test]
    fn undecided_hunks_shift_the_delta_like_skipped_ones() {
        let mut diff = parse_diff(TWO_HUNKS.as_bytes().to_vec(), None).unwrap();
        diff.files[0].hunks[1].decision = Decision::Stage;
        let mut out = Vec::new();
        diff.buffers.reassemble_patch(&diff.files[0], &mut out);
        assert!(String::from_utf8(out).unwrap().contains("@@ -20,3 +20,3 @@"));
    }

    #[test]
    fn colored_render_uses_the_colored_buffer_and_fraginfo() {
        let plain = b"diff --git a/f b/f\n@@ -1,2 +1,2 @@ sig\n x\n-y\n+z\n".to_vec();
        let colored =
            b"diff --git a/f b/f\n\x1b[36m@@ -1,2 +1,2 @@ sig\x1b[m\n x\n-y\n+z\n".to_vec();
        let diff = parse_diff(plain, Some(colored)).unwrap();
        let hunk = &diff.files[0].hunks[0];
        assert_eq!(
            rendered(&diff.buffers, hunk, 0, true),
            "<F>@@ -1,2 +1,2 @@ sig\x1b[m\n x\n-y\n+z\n"
        );
    }

    #[test]
    fn empty_trailer_falls_back_to_a_bare_newline() {
        let buffers = DiffBuffers {
            plain: b"-x\n+y\n".to_vec(),
            colored: None,
        };
        let hunk = Hunk {
            start: 0,
            end: 6,
            colored_start: 0,
            colored_end: 0,
            header: HunkHeader {
                old_offset: 3,
                old_count: 1,
                new_offset: 3,
                new_count: 1,
                ..HunkHeader::default()
            },
            decision: Decision::Undecided,
        };
        assert_eq!(
            rendered(&buffers, &hunk, 0, false),
            "@@ -3,1 +3,1 @@\n-x\n+y\n"
        );
    }

    #[test]
    fn empty_colored_trailer_emits_reset_and_newline() {
        let buffers = DiffBuffers {
            plain: b"-x\n+y\n".to_vec(),
            colored: Some(b"-x\n+y\n".to_vec()),
        };
        let hunk = Hunk {
            start: 0,
            end: 6,
            colored_start: 0,
            colored_end: 6,
            header: HunkHeader {
                old_offset: 3,
                old_count: 1,
                new_offset: 3,
                new_count: 1,
                ..HunkHeader::default()
            },
            decision: Decision::Undecided,
        };
        assert_eq!(
            rendered(&buffers, &hunk, 0, true),
            "<F>@@ -3,1 +3,1 @@<R>\n-x\n+y\n"
        );
    }
}
