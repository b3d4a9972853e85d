use anyhow::Result;

use crate::git::Git;

/// ANSI escape strings for the interactive UI.
///
/// When color is disabled every slot is empty, so callers can always
/// interpolate `{slot}text{reset}` without branching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    pub header: String,
    pub help: String,
    pub prompt: String,
    pub error: String,
    pub fraginfo: String,
    pub reset: String,
}

impl Palette {
    /// A palette with every slot empty (color off).
    pub fn plain() -> Self {
        Self::default()
    }

    /// Resolve the palette from `color.interactive` and the per-slot config.
    ///
    /// The colorbool's `auto` case is decided by whether stdout is a
    /// terminal. Slot escapes come from `git config --get-color`, which
    /// resolves user overrides and falls back to the given default.
    pub fn resolve(git: &dyn Git) -> Result<Self> {
        if !git.config_colorbool("color.interactive", console::user_attended())? {
            return Ok(Self::plain());
        }

        Ok(Self {
            header: git.config_color("color.interactive.header", "bold")?,
            help: git.config_color("color.interactive.help", "bold red")?,
            prompt: git.config_color("color.interactive.prompt", "bold blue")?,
            error: git.config_color("color.interactive.error", "bold red")?,
            fraginfo: git.config_color("color.diff.frag", "cyan")?,
            reset: git.config_color("", "reset")?,
        })
    }

    pub fn enabled(&self) -> bool {
        !self.reset.is_empty()
    }
}

/// A palette with distinctive markers, handy for asserting on output.
#[cfg(test)]
pub(crate) fn test_palette() -> Palette {
    Palette {
        header: "<H>".to_string(),
        help: "<?>".to_string(),
        prompt: "<P>".to_string(),
        error: "<E>".to_string(),
        fraginfo: "<F>".to_string(),
        reset: "<R>".to_string(),
    }
}
