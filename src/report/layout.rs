//! # Steam Deck Report Layout
//!
//! Fixed byte layout of the controller's raw HID input report.
//!
//! Digital inputs are single bits; axes are signed 16-bit little-endian words.
//!
//! | Offset | Content |
//! |--------|---------|
//! | 8 | R2, L2, R1, L1, Y, B, X, A (bits 0-7) |
//! | 9 | UP, RIGHT, LEFT, DOWN, WINDOW, STEAM, MENU, L5 (bits 0-7) |
//! | 10 | R5, LEFT/RIGHT_PAD_PRESS, LEFT/RIGHT_PAD_TOUCH (bits 0-4), LEFT_STICK_PRESS (bit 6) |
//! | 11 | RIGHT_STICK_PRESS (bit 2) |
//! | 13 | L4 (bit 1), R4 (bit 2), LEFT_STICK_TOUCH (bit 6), RIGHT_STICK_TOUCH (bit 7) |
//! | 14 | MORE (bit 2) |
//! | 16-23 | LEFT_PAD_X, LEFT_PAD_Y, RIGHT_PAD_X, RIGHT_PAD_Y |
//! | 48-55 | LEFT_STICK_X, LEFT_STICK_Y, RIGHT_STICK_X, RIGHT_STICK_Y |

use crate::controller::field::Field;

/// Shortest report that is decoded at all.
pub const MIN_REPORT_LEN: usize = 12;

/// Report length needed to address every field in [`REPORT_LAYOUT`].
pub const FULL_REPORT_LEN: usize = 56;

/// Size of the buffer handed to the raw device on every read.
pub const REPORT_BUFFER_SIZE: usize = 64;

/// How a field is encoded in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    /// Single bit `bit` of byte `offset`; set means pressed/touched.
    Bit { offset: usize, bit: u8 },
    /// Signed 16-bit little-endian word starting at `offset`.
    AxisI16 { offset: usize },
}

impl FieldEncoding {
    /// Number of report bytes needed to decode this field.
    pub const fn required_len(self) -> usize {
        match self {
            FieldEncoding::Bit { offset, .. } => offset + 1,
            FieldEncoding::AxisI16 { offset } => offset + 2,
        }
    }
}

/// One row of the layout table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    pub encoding: FieldEncoding,
}

const fn bit(field: Field, offset: usize, bit: u8) -> FieldSpec {
    FieldSpec {
        field,
        encoding: FieldEncoding::Bit { offset, bit },
    }
}

const fn axis(field: Field, offset: usize) -> FieldSpec {
    FieldSpec {
        field,
        encoding: FieldEncoding::AxisI16 { offset },
    }
}

/// Every field carried by the raw report.
pub const REPORT_LAYOUT: &[FieldSpec] = &[
    bit(Field::R2, 8, 0),
    bit(Field::L2, 8, 1),
    bit(Field::R1, 8, 2),
    bit(Field::L1, 8, 3),
    bit(Field::Y, 8, 4),
    bit(Field::B, 8, 5),
    bit(Field::X, 8, 6),
    bit(Field::A, 8, 7),
    bit(Field::Up, 9, 0),
    bit(Field::Right, 9, 1),
    bit(Field::Left, 9, 2),
    bit(Field::Down, 9, 3),
    bit(Field::Window, 9, 4),
    bit(Field::Steam, 9, 5),
    bit(Field::Menu, 9, 6),
    bit(Field::L5, 9, 7),
    bit(Field::R5, 10, 0),
    bit(Field::LeftPadPress, 10, 1),
    bit(Field::RightPadPress, 10, 2),
    bit(Field::LeftPadTouch, 10, 3),
    bit(Field::RightPadTouch, 10, 4),
    bit(Field::LeftStickPress, 10, 6),
    bit(Field::RightStickPress, 11, 2),
    bit(Field::L4, 13, 1),
    bit(Field::R4, 13, 2),
    bit(Field::LeftStickTouch, 13, 6),
    bit(Field::RightStickTouch, 13, 7),
    bit(Field::More, 14, 2),
    axis(Field::LeftPadX, 16),
    axis(Field::LeftPadY, 18),
    axis(Field::RightPadX, 20),
    axis(Field::RightPadY, 22),
    axis(Field::LeftStickX, 48),
    axis(Field::LeftStickY, 50),
    axis(Field::RightStickX, 52),
    axis(Field::RightStickY, 54),
];

/// Looks up the layout row of a field, if the report carries it.
pub fn spec_for(field: Field) -> Option<&'static FieldSpec> {
    REPORT_LAYOUT.iter().find(|spec| spec.field == field)
}
