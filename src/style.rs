//! Style Table
//!
//! Movement styles players can pick. The engine only needs the style index
//! for leaderboards and the key blocks for the pre-move input; the physics
//! values are handed to the host unchanged.

use std::path::Path;

use serde::{Serialize, Deserialize};
use tracing::{error, warn};

use crate::timer::input::{Buttons, MoveInput, MoveType, TickSnapshot};
use crate::MAX_STYLE;

/// Style table errors.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    /// Reading the file failed.
    #[error("Style file IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not a valid style list.
    #[error("Style file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Physics parameters of one style.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSetting {
    /// Display name
    pub name: String,
    /// Chat commands selecting this style, `;` separated
    pub command: String,
    /// Jump automatically while holding jump
    pub autobhop: bool,
    /// Allow speed gain from bunnyhopping
    pub allow_bunnyhopping: bool,
    /// Use `airaccelerate` instead of the map default
    pub custom_airaccelerate: bool,
    /// Air acceleration
    pub airaccelerate: f32,
    /// Ground acceleration
    pub accelerate: f32,
    /// Ground friction
    pub friction: f32,
    /// Maximum air wish speed
    pub wishspeed: f32,
    /// Ground run speed
    pub runspeed: f32,
    /// Block forward input
    pub block_w: bool,
    /// Block back input
    pub block_s: bool,
    /// Block left strafe input
    pub block_a: bool,
    /// Block right strafe input
    pub block_d: bool,
}

impl Default for StyleSetting {
    fn default() -> Self {
        Self {
            name: "Normal".to_string(),
            command: "normal;n".to_string(),
            autobhop: true,
            allow_bunnyhopping: true,
            custom_airaccelerate: false,
            airaccelerate: 150.0,
            accelerate: 5.0,
            friction: 4.0,
            wishspeed: 30.0,
            runspeed: 260.0,
            block_w: false,
            block_s: false,
            block_a: false,
            block_d: false,
        }
    }
}

impl StyleSetting {
    /// Chat commands selecting this style.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.command.split(';').map(str::trim).filter(|c| !c.is_empty())
    }

    /// Zero the movement inputs this style blocks and release their keys.
    /// Positive side input is a left strafe.
    pub fn filter_input(&self, input: &mut MoveInput) {
        if input.move_type != MoveType::Walk {
            return;
        }
        self.block(&mut input.forward_move, &mut input.side_move, &mut input.buttons);
    }

    /// Same blocking applied to a post-command tick, so blocked keys never
    /// reach the sampler.
    pub fn filter_tick(&self, tick: &mut TickSnapshot) {
        if tick.move_type != MoveType::Walk {
            return;
        }
        self.block(&mut tick.forward_move, &mut tick.side_move, &mut tick.buttons);
    }

    fn block(&self, forward_move: &mut f32, side_move: &mut f32, buttons: &mut Buttons) {
        if (self.block_w && *forward_move > 0.0) || (self.block_s && *forward_move < 0.0) {
            *forward_move = 0.0;
        }
        if (self.block_a && *side_move > 0.0) || (self.block_d && *side_move < 0.0) {
            *side_move = 0.0;
        }

        let keys = [
            (self.block_w, Buttons::FORWARD),
            (self.block_s, Buttons::BACK),
            (self.block_a, Buttons::MOVE_LEFT),
            (self.block_d, Buttons::MOVE_RIGHT),
        ];
        for (blocked, key) in keys {
            if blocked {
                *buttons = buttons.without(key);
            }
        }
    }
}

/// Loaded styles, indexed by style id.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleTable {
    styles: Vec<StyleSetting>,
}

impl StyleTable {
    /// Table holding only the default style.
    pub fn new() -> Self {
        Self {
            styles: vec![StyleSetting::default()],
        }
    }

    /// Build from a list, falling back to the default style when empty and
    /// dropping anything past `MAX_STYLE`.
    pub fn from_styles(mut styles: Vec<StyleSetting>) -> Self {
        if styles.is_empty() {
            warn!("style list is empty, using the default style");
            return Self::new();
        }

        if styles.len() > MAX_STYLE {
            warn!(count = styles.len(), max = MAX_STYLE, "too many styles, removing excess");
            styles.truncate(MAX_STYLE);
        }

        Self { styles }
    }

    /// Parse a JSON style list.
    pub fn from_file(path: &Path) -> Result<Self, StyleError> {
        let text = std::fs::read_to_string(path)?;
        let styles: Vec<StyleSetting> = serde_json::from_str(&text)?;
        Ok(Self::from_styles(styles))
    }

    /// Load a style list, using the default style when there is no file or
    /// it cannot be read.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::new();
        };

        match Self::from_file(path) {
            Ok(table) => table,
            Err(StyleError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "style file not found, using the default style");
                Self::new()
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to load styles, using the default style");
                Self::new()
            }
        }
    }

    /// Style by id.
    pub fn get(&self, style: u32) -> Option<&StyleSetting> {
        self.styles.get(style as usize)
    }

    /// Number of styles.
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Always false; a table holds at least the default style.
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Style selected by a chat command.
    pub fn find_by_command(&self, command: &str) -> Option<u32> {
        let command = command.trim().to_ascii_lowercase();
        self.styles
            .iter()
            .position(|s| s.commands().any(|c| c.eq_ignore_ascii_case(&command)))
            .map(|i| i as u32)
    }
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::new()
    }
}
