//! Autoselection modes.

use std::fmt;
use std::str::FromStr;

use crate::ListError;

/// What happens to the selection when the current item finishes.
///
/// | Mode | Next selection |
/// |------|----------------|
/// | `Off` | Unchanged |
/// | `Drop` | Nothing |
/// | `Next` | The following item, or nothing at the end |
/// | `Shuffle` | A random not-yet-played item |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AutoMode {
    #[default]
    Off,
    Drop,
    Next,
    Shuffle,
}

impl fmt::Display for AutoMode {
    /// Formats the mode as its wire name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::Drop => "drop",
            Self::Next => "next",
            Self::Shuffle => "shuffle",
        };
        f.write_str(name)
    }
}

impl FromStr for AutoMode {
    type Err = ListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "drop" => Ok(Self::Drop),
            "next" => Ok(Self::Next),
            "shuffle" => Ok(Self::Shuffle),
            _ => Err(ListError::InvalidAutoMode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AutoMode; 4] = [
        AutoMode::Off,
        AutoMode::Drop,
        AutoMode::Next,
        AutoMode::Shuffle,
    ];

    #[test]
    fn name_round_trips() {
        for mode in ALL {
            assert_eq!(mode.to_string().parse::<AutoMode>(), Ok(mode));
        }
    }

    #[test]
    fn unknown_name_is_invalid() {
        assert_eq!(
            "random".parse::<AutoMode>(),
            Err(ListError::InvalidAutoMode)
        );
        assert_eq!("".parse::<AutoMode>(), Err(ListError::InvalidAutoMode));
        // Parsing is exact: no case folding, no whitespace trimming.
        assert_eq!("Off".parse::<AutoMode>(), Err(ListError::InvalidAutoMode));
    }
}
