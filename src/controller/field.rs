//! # Input Fields
//!
//! The fixed set of named inputs the Steam Deck exposes, and the values they carry.
//!
//! ## Field classes
//!
//! | Class | Fields | Value | Change rule |
//! |-------|--------|-------|-------------|
//! | Digital | buttons, d-pad, touches, power/volume | `Bool` | any transition |
//! | Stick axis | `LEFT/RIGHT_STICK_X/Y` | `Axis` (i16) | moved by more than the stick threshold |
//! | Pad axis | `LEFT/RIGHT_PAD_X/Y` | `Axis` (i16) | moved by more than the pad threshold |

use serde::Serialize;
use std::fmt;

/// One named input of the controller.
///
/// Names render in `SCREAMING_SNAKE_CASE` (`"A"`, `"LEFT_PAD_TOUCH"`, `"VOLUME_UP"`),
/// both through [`Field::as_str`] and when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Field {
    // Face and shoulder buttons (report byte 8)
    R2,
    L2,
    R1,
    L1,
    Y,
    B,
    X,
    A,

    // D-pad and menu buttons (report byte 9)
    Up,
    Right,
    Left,
    Down,
    Window,
    Steam,
    Menu,
    L5,

    // Pads and stick presses (report bytes 10-11)
    R5,
    LeftPadPress,
    RightPadPress,
    LeftPadTouch,
    RightPadTouch,
    LeftStickPress,
    RightStickPress,

    // Back grips and stick touches (report byte 13)
    L4,
    R4,
    LeftStickTouch,
    RightStickTouch,

    // Quick access button (report byte 14)
    More,

    // Trackpad axes
    LeftPadX,
    LeftPadY,
    RightPadX,
    RightPadY,

    // Thumbstick axes
    LeftStickX,
    LeftStickY,
    RightStickX,
    RightStickY,

    // Keyed-event device
    VolumeDown,
    VolumeUp,
    Power,
}

/// Change-detection class of a [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// Boolean pressed/touched state.
    Digital,
    /// Thumbstick axis, debounced by the stick threshold.
    StickAxis,
    /// Trackpad axis, debounced by the pad threshold.
    PadAxis,
}

impl FieldClass {
    /// Value a field of this class is assumed to hold before anything was announced.
    pub fn default_value(self) -> FieldValue {
        match self {
            FieldClass::Digital => FieldValue::Bool(false),
            FieldClass::StickAxis | FieldClass::PadAxis => FieldValue::Axis(0),
        }
    }
}

impl Field {
    /// Every field, in declaration order.
    pub const ALL: [Field; 39] = [
        Field::R2,
        Field::L2,
        Field::R1,
        Field::L1,
        Field::Y,
        Field::B,
        Field::X,
        Field::A,
        Field::Up,
        Field::Right,
        Field::Left,
        Field::Down,
        Field::Window,
        Field::Steam,
        Field::Menu,
        Field::L5,
        Field::R5,
        Field::LeftPadPress,
        Field::RightPadPress,
        Field::LeftPadTouch,
        Field::RightPadTouch,
        Field::LeftStickPress,
        Field::RightStickPress,
        Field::L4,
        Field::R4,
        Field::LeftStickTouch,
        Field::RightStickTouch,
        Field::More,
        Field::LeftPadX,
        Field::LeftPadY,
        Field::RightPadX,
        Field::RightPadY,
        Field::LeftStickX,
        Field::LeftStickY,
        Field::RightStickX,
        Field::RightStickY,
        Field::VolumeDown,
        Field::VolumeUp,
        Field::Power,
    ];

    /// Returns the field's change-detection class.
    pub fn class(self) -> FieldClass {
        match self {
            Field::LeftStickX | Field::LeftStickY | Field::RightStickX | Field::RightStickY => {
                FieldClass::StickAxis
            }
            Field::LeftPadX | Field::LeftPadY | Field::RightPadX | Field::RightPadY => {
                FieldClass::PadAxis
            }
            _ => FieldClass::Digital,
        }
    }

    /// Returns the canonical upper-case name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::R2 => "R2",
            Field::L2 => "L2",
            Field::R1 => "R1",
            Field::L1 => "L1",
            Field::Y => "Y",
            Field::B => "B",
            Field::X => "X",
            Field::A => "A",
            Field::Up => "UP",
            Field::Right => "RIGHT",
            Field::Left => "LEFT",
            Field::Down => "DOWN",
            Field::Window => "WINDOW",
            Field::Steam => "STEAM",
            Field::Menu => "MENU",
            Field::L5 => "L5",
            Field::R5 => "R5",
            Field::LeftPadPress => "LEFT_PAD_PRESS",
            Field::RightPadPress => "RIGHT_PAD_PRESS",
            Field::LeftPadTouch => "LEFT_PAD_TOUCH",
            Field::RightPadTouch => "RIGHT_PAD_TOUCH",
            Field::LeftStickPress => "LEFT_STICK_PRESS",
            Field::RightStickPress => "RIGHT_STICK_PRESS",
            Field::L4 => "L4",
            Field::R4 => "R4",
            Field::LeftStickTouch => "LEFT_STICK_TOUCH",
            Field::RightStickTouch => "RIGHT_STICK_TOUCH",
            Field::More => "MORE",
            Field::LeftPadX => "LEFT_PAD_X",
            Field::LeftPadY => "LEFT_PAD_Y",
            Field::RightPadX => "RIGHT_PAD_X",
            Field::RightPadY => "RIGHT_PAD_Y",
            Field::LeftStickX => "LEFT_STICK_X",
            Field::LeftStickY => "LEFT_STICK_Y",
            Field::RightStickX => "RIGHT_STICK_X",
            Field::RightStickY => "RIGHT_STICK_Y",
            Field::VolumeDown => "VOLUME_DOWN",
            Field::VolumeUp => "VOLUME_UP",
            Field::Power => "POWER",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest value of a [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Pressed (`true`) or released.
    Bool(bool),
    /// Raw signed 16-bit axis position, unscaled.
    Axis(i16),
}

impl FieldValue {
    /// Returns the boolean state, or `None` for axis values.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(b),
            FieldValue::Axis(_) => None,
        }
    }

    /// Returns the axis position, or `None` for boolean values.
    pub fn as_axis(self) -> Option<i16> {
        match self {
            FieldValue::Axis(v) => Some(v),
            FieldValue::Bool(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Axis(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_fields_are_unique() {
        let names: HashSet<&str> = Field::ALL.iter().map(|f| f.as_str()).collect();
        assert_eq!(names.len(), Field::ALL.len());
    }

    #[test]
    fn test_field_classes() {
        let sticks = Field::ALL
            .iter()
            .filter(|f| f.class() == FieldClass::StickAxis)
            .count();
        let pads = Field::ALL
            .iter()
            .filter(|f| f.class() == FieldClass::PadAxis)
            .count();
        assert_eq!(sticks, 4);
        assert_eq!(pads, 4);
        assert_eq!(Field::Power.class(), FieldClass::Digital);
        assert_eq!(Field::LeftStickPress.class(), FieldClass::Digital);
    }

    #[test]
    fn test_class_defaults() {
        assert_eq!(FieldClass::Digital.default_value(), FieldValue::Bool(false));
        assert_eq!(FieldClass::StickAxis.default_value(), FieldValue::Axis(0));
        assert_eq!(FieldClass::PadAxis.default_value(), FieldValue::Axis(0));
    }

    #[test]
    fn test_serialized_name_matches_as_str() {
        for field in Field::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
    }

    #[test]
    fn test_value_display_and_accessors() {
        assert_eq!(FieldValue::Bool(true).to_string(), "true");
        assert_eq!(FieldValue::Axis(-1200).to_string(), "-1200");
        assert_eq!(FieldValue::Axis(5).as_bool(), None);
        assert_eq!(FieldValue::Bool(false).as_bool(), Some(false));
        assert_eq!(FieldValue::Axis(7).as_axis(), Some(7));
        assert_eq!(serde_json::to_string(&FieldValue::Axis(-3)).unwrap(), "-3");
    }
}
