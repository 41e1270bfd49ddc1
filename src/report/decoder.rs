//! # Report Decoder
//!
//! Turns one raw HID report into field values by walking [`REPORT_LAYOUT`].

use super::layout::*;
use crate::controller::bucket::StateBucket;
use crate::controller::field::FieldValue;
use crate::error::{DeckInputError, Result};

/// Decode a raw Steam Deck report
///
/// # Arguments
///
/// * `data` - Report bytes as read from the hidraw device
///
/// # Returns
///
/// * `Result<StateBucket>` - Every field whose bytes fit inside `data`
///
/// Fields beyond the end of a short report are left out rather than
/// defaulted, so a 12-15 byte report yields digital fields only.
///
/// # Errors
///
/// Returns `MalformedReport` if `data` is shorter than [`MIN_REPORT_LEN`].
///
/// # Examples
///
/// ```
/// use deck_input::controller::field::{Field, FieldValue};
/// use deck_input::report::decoder::decode_report;
///
/// let mut report = [0u8; 64];
/// report[8] = 0x80; // A
/// let fields = decode_report(&report)?;
/// assert_eq!(fields[&Field::A], FieldValue::Bool(true));
/// # Ok::<(), deck_input::error::DeckInputError>(())
/// ```
pub fn decode_report(data: &[u8]) -> Result<StateBucket> {
    if data.len() < MIN_REPORT_LEN {
        return Err(DeckInputError::MalformedReport {
            len: data.len(),
            min: MIN_REPORT_LEN,
        });
    }

    let mut fields = StateBucket::new();
    for spec in REPORT_LAYOUT {
        if let Some(value) = decode_field(data, spec.encoding) {
            fields.insert(spec.field, value);
        }
    }

    Ok(fields)
}

/// Decode a single field, or `None` if the report is too short to hold it.
pub fn decode_field(data: &[u8], encoding: FieldEncoding) -> Option<FieldValue> {
    if data.len() < encoding.required_len() {
        return None;
    }

    match encoding {
        FieldEncoding::Bit { offset, bit } => {
            Some(FieldValue::Bool(data[offset] & (1 << bit) != 0))
        }
        FieldEncoding::AxisI16 { offset } => {
            Some(FieldValue::Axis(i16::from_le_bytes([data[offset], data[offset + 1]])))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::field::{Field, FieldClass};

    fn empty_report() -> [u8; REPORT_BUFFER_SIZE] {
        [0u8; REPORT_BUFFER_SIZE]
    }

    #[test]
    fn test_decode_too_short() {
        for len in 0..MIN_REPORT_LEN {
            let data = vec![0xFFu8; len];
            match decode_report(&data) {
                Err(DeckInputError::MalformedReport { len: got, min }) => {
                    assert_eq!(got, len);
                    assert_eq!(min, MIN_REPORT_LEN);
                }
                other => panic!("Expected MalformedReport, got: {:?}", other),
            }
        }
    }

    #[test]
    fn test_decode_zero_report() {
        let fields = decode_report(&empty_report()).unwrap();
        assert_eq!(fields.len(), REPORT_LAYOUT.len());
        for (field, value) in &fields {
            assert_eq!(*value, field.class().default_value(), "{}", field);
        }
    }

    #[test]
    fn test_short_report_has_no_axes() {
        for len in 12..16 {
            let data = vec![0xFFu8; len];
            let fields = decode_report(&data).unwrap();
            assert!(fields.values().all(|v| v.as_bool().is_some()), "len {}", len);
            assert_eq!(fields[&Field::A], FieldValue::Bool(true));
            assert_eq!(fields[&Field::RightStickPress], FieldValue::Bool(true));
            assert!(!fields.contains_key(&Field::LeftPadX));
            assert!(!fields.contains_key(&Field::LeftStickX));
        }

        // Byte 13 and 14 fields appear once the report reaches them
        assert!(!decode_report(&[0u8; 12]).unwrap().contains_key(&Field::L4));
        assert!(decode_report(&[0u8; 14]).unwrap().contains_key(&Field::L4));
        assert!(!decode_report(&[0u8; 14]).unwrap().contains_key(&Field::More));
        assert!(decode_report(&[0u8; 15]).unwrap().contains_key(&Field::More));
    }

    #[test]
    fn test_pad_axes_without_stick_axes() {
        let fields = decode_report(&[0u8; 30]).unwrap();
        assert!(fields.contains_key(&Field::RightPadY));
        assert!(!fields.contains_key(&Field::LeftStickX));
    }

    #[test]
    fn test_each_bit_toggles_exactly_one_field() {
        let baseline = decode_report(&empty_report()).unwrap();

        for spec in REPORT_LAYOUT {
            let FieldEncoding::Bit { offset, bit } = spec.encoding else {
                continue;
            };

            let mut data = empty_report();
            data[offset] ^= 1 << bit;
            let fields = decode_report(&data).unwrap();

            for (field, value) in &fields {
                if *field == spec.field {
                    assert_eq!(*value, FieldValue::Bool(true), "{}", field);
                } else {
                    assert_eq!(*value, baseline[field], "{} changed by {}", field, spec.field);
                }
            }
        }
    }

    #[test]
    fn test_unmapped_bits_are_ignored() {
        let mut data = empty_report();
        data[10] = 1 << 5;
        data[11] = !(1 << 2);
        data[12] = 0xFF;
        data[13] = 1 << 0 | 1 << 3;
        data[14] = !(1 << 2);
        let fields = decode_report(&data).unwrap();
        assert!(fields
            .iter()
            .filter(|(f, _)| f.class() == FieldClass::Digital)
            .all(|(_, v)| *v == FieldValue::Bool(false)));
    }

    #[test]
    fn test_decode_axes_little_endian() {
        let mut data = empty_report();
        data[16..18].copy_from_slice(&(-32768i16).to_le_bytes());
        data[18..20].copy_from_slice(&32767i16.to_le_bytes());
        data[20..22].copy_from_slice(&1i16.to_le_bytes());
        data[22..24].copy_from_slice(&(-1i16).to_le_bytes());
        data[48] = 0x34;
        data[49] = 0x12;
        data[50..52].copy_from_slice(&(-200i16).to_le_bytes());
        data[52..54].copy_from_slice(&201i16.to_le_bytes());
        data[54..56].copy_from_slice(&(-12345i16).to_le_bytes());

        let fields = decode_report(&data).unwrap();
        assert_eq!(fields[&Field::LeftPadX], FieldValue::Axis(i16::MIN));
        assert_eq!(fields[&Field::LeftPadY], FieldValue::Axis(i16::MAX));
        assert_eq!(fields[&Field::RightPadX], FieldValue::Axis(1));
        assert_eq!(fields[&Field::RightPadY], FieldValue::Axis(-1));
        assert_eq!(fields[&Field::LeftStickX], FieldValue::Axis(0x1234));
        assert_eq!(fields[&Field::LeftStickY], FieldValue::Axis(-200));
        assert_eq!(fields[&Field::RightStickX], FieldValue::Axis(201));
        assert_eq!(fields[&Field::RightStickY], FieldValue::Axis(-12345));
    }

    #[test]
    fn test_decode_is_deterministic() {
        let mut data = empty_report();
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = (i as u8).wrapping_mul(37);
        }
        assert_eq!(decode_report(&data).unwrap(), decode_report(&data).unwrap());
    }

    #[test]
    fn test_decode_field_out_of_range() {
        assert_eq!(decode_field(&[0u8; 48], FieldEncoding::AxisI16 { offset: 48 }), None);
        assert_eq!(decode_field(&[0u8; 49], FieldEncoding::AxisI16 { offset: 48 }), None);
        assert_eq!(
            decode_field(&[0u8; 50], FieldEncoding::AxisI16 { offset: 48 }),
            Some(FieldValue::Axis(0))
        );
    }
}
