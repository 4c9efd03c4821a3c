//! Color values and the closed set of inline color operations
//!
//! A [`ColorValue`] is a normalized 24-bit RGB color with an optional 8-bit
//! alpha, parsed from `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA` hex
//! strings. Construction always canonicalizes: shorthand expands to the
//! 6-digit form and the canonical text rendering is lowercase, so equality
//! is plain field equality.

use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

/// Immutable, normalized hex/alpha color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorValue {
    rgb: [u8; 3],
    alpha: Option<u8>,
}

impl ColorValue {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self {
            rgb: [r, g, b],
            alpha: None,
        }
    }

    pub const fn rgb(&self) -> [u8; 3] {
        self.rgb
    }

    pub const fn alpha(&self) -> Option<u8> {
        self.alpha
    }

    pub const fn with_alpha(&self, alpha: u8) -> Self {
        Self {
            rgb: self.rgb,
            alpha: Some(alpha),
        }
    }

    pub const fn without_alpha(&self) -> Self {
        Self {
            rgb: self.rgb,
            alpha: None,
        }
    }

    /// Euclidean distance in RGB space. Alpha does not contribute; callers
    /// that cluster colors must compare alpha separately.
    pub fn distance(&self, other: &Self) -> f64 {
        let dr = f64::from(self.rgb[0]) - f64::from(other.rgb[0]);
        let dg = f64::from(self.rgb[1]) - f64::from(other.rgb[1]);
        let db = f64::from(self.rgb[2]) - f64::from(other.rgb[2]);
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// Mix each channel toward white by `amount` (0.0..=1.0).
    pub fn lighten(&self, amount: f32) -> Self {
        let mix = |c: u8| -> u8 {
            (f32::from(c) + (255.0 - f32::from(c)) * amount).min(255.0) as u8
        };
        Self {
            rgb: [mix(self.rgb[0]), mix(self.rgb[1]), mix(self.rgb[2])],
            alpha: self.alpha,
        }
    }

    /// Scale each channel toward black by `amount` (0.0..=1.0).
    pub fn darken(&self, amount: f32) -> Self {
        let scale = |c: u8| -> u8 { (f32::from(c) * (1.0 - amount)).max(0.0) as u8 };
        Self {
            rgb: [
                scale(self.rgb[0]),
                scale(self.rgb[1]),
                scale(self.rgb[2]),
            ],
            alpha: self.alpha,
        }
    }

    /// Push each channel away from its luma gray point by `amount`.
    pub fn saturate(&self, amount: f32) -> Self {
        self.mix_from_gray(1.0 + amount)
    }

    /// Mix each channel toward its luma gray point by `amount`.
    pub fn desaturate(&self, amount: f32) -> Self {
        self.mix_from_gray(1.0 - amount)
    }

    fn mix_from_gray(&self, factor: f32) -> Self {
        let gray = 0.299 * f32::from(self.rgb[0])
            + 0.587 * f32::from(self.rgb[1])
            + 0.114 * f32::from(self.rgb[2]);
        let mix = |c: u8| -> u8 {
            (gray + (f32::from(c) - gray) * factor).clamp(0.0, 255.0) as u8
        };
        Self {
            rgb: [mix(self.rgb[0]), mix(self.rgb[1]), mix(self.rgb[2])],
            alpha: self.alpha,
        }
    }
}

impl FromStr for ColorValue {
    type Err = EngineError;

    /// Parse from `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA`, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| EngineError::Parse(format!("not a color: {s:?}")))?;

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(EngineError::Parse(format!("invalid hex digits: {s:?}")));
        }

        // Expand 3/4-digit shorthand to the canonical 6/8-digit form
        let expanded: String = match hex.len() {
            3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 | 8 => hex.to_string(),
            _ => return Err(EngineError::Parse(format!("invalid color length: {s:?}"))),
        };

        let byte = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&expanded[range], 16)
                .map_err(|_| EngineError::Parse(format!("invalid hex digits: {s:?}")))
        };

        Ok(Self {
            rgb: [byte(0..2)?, byte(2..4)?, byte(4..6)?],
            alpha: if expanded.len() == 8 {
                Some(byte(6..8)?)
            } else {
                None
            },
        })
    }
}

impl fmt::Display for ColorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}",
            self.rgb[0], self.rgb[1], self.rgb[2]
        )?;
        if let Some(alpha) = self.alpha {
            write!(f, "{:02x}", alpha)?;
        }
        Ok(())
    }
}

/// One inline color operation, parsed from a trailing `name(arg)` path
/// segment. The set is closed; anything op-shaped with an unrecognized
/// name is an `UnknownOperation` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorOp {
    /// Set the alpha channel to a 2-hex-digit byte: `alpha(cc)`
    Alpha(u8),
    /// Mix toward white by a percentage: `lighten(10)`
    Lighten(u8),
    /// Scale toward black by a percentage: `darken(10)`
    Darken(u8),
    /// Push away from gray by a percentage: `saturate(20)`
    Saturate(u8),
    /// Mix toward gray by a percentage: `desaturate(20)`
    Desaturate(u8),
}

impl ColorOp {
    /// Recognize an op-shaped segment. Returns `None` when `segment` is
    /// not shaped like `name(arg)` (it is then an ordinary path segment);
    /// returns an error for op-shaped segments with an unknown name or a
    /// malformed argument.
    pub fn parse(segment: &str) -> Option<EngineResult<Self>> {
        let open = segment.find('(')?;
        if !segment.ends_with(')') {
            return Some(Err(EngineError::UnknownOperation(segment.to_string())));
        }

        let name = &segment[..open];
        let arg = &segment[open + 1..segment.len() - 1];
        let percent = || {
            arg.parse::<u8>()
                .ok()
                .filter(|p| *p <= 100)
                .ok_or_else(|| EngineError::UnknownOperation(segment.to_string()))
        };

        let op = match name {
            "alpha" if arg.len() == 2 => u8::from_str_radix(arg, 16)
                .map(Self::Alpha)
                .map_err(|_| EngineError::UnknownOperation(segment.to_string())),
            "alpha" => Err(EngineError::UnknownOperation(segment.to_string())),
            "lighten" => percent().map(Self::Lighten),
            "darken" => percent().map(Self::Darken),
            "saturate" => percent().map(Self::Saturate),
            "desaturate" => percent().map(Self::Desaturate),
            _ => Err(EngineError::UnknownOperation(segment.to_string())),
        };

        Some(op)
    }

    /// Apply this operation as a pure function over a color.
    pub fn apply(&self, color: &ColorValue) -> ColorValue {
        match *self {
            Self::Alpha(a) => color.with_alpha(a),
            Self::Lighten(pct) => color.lighten(f32::from(pct) / 100.0),
            Self::Darken(pct) => color.darken(f32::from(pct) / 100.0),
            Self::Saturate(pct) => color.saturate(f32::from(pct) / 100.0),
            Self::Desaturate(pct) => color.desaturate(f32::from(pct) / 100.0),
        }
    }

    /// Whether the operation can be undone exactly given only its output.
    /// Only alpha assignment qualifies; the channel-mixing ops lose
    /// information. Reverse extraction skips placeholders whose op chain
    /// is not fully invertible.
    pub const fn is_invertible(&self) -> bool {
        matches!(self, Self::Alpha(_))
    }
}

/// Apply a sequence of operations left to right.
pub fn apply_ops(color: &ColorValue, ops: &[ColorOp]) -> ColorValue {
    ops.iter().fold(*color, |c, op| op.apply(&c))
}

/// Undo a fully-invertible op chain on an observed color, recovering the
/// value the underlying variable must hold. Returns `None` when any op in
/// the chain is lossy.
pub fn invert_ops(observed: &ColorValue, ops: &[ColorOp]) -> Option<ColorValue> {
    if !ops.iter().all(ColorOp::is_invertible) {
        return None;
    }
    if ops.iter().any(|op| matches!(op, ColorOp::Alpha(_))) {
        // Alpha ops overwrite whatever alpha the variable had; strip it.
        Some(observed.without_alpha())
    } else {
        // An empty chain is the identity; the observed alpha belongs to
        // the variable itself.
        Some(*observed)
    }
}
