// 5x7 bitmap glyphs for the characters a timestamp needs.
//
// Each row is the low five bits of a byte, most significant bit leftmost.

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
/// Blank columns between adjacent glyphs.
pub const GLYPH_SPACING: u32 = 1;

const DIGITS: [[u8; 7]; 10] = [
    [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E], // 0
    [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E], // 1
    [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F], // 2
    [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E], // 3
    [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02], // 4
    [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E], // 5
    [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E], // 6
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08], // 7
    [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E], // 8
    [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C], // 9
];

const COLON: [u8; 7] = [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00];
const PERIOD: [u8; 7] = [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C];
const BLANK: [u8; 7] = [0x00; 7];

pub fn glyph(c: char) -> &'static [u8; 7] {
    match c {
        '0'..='9' => &DIGITS[(c as u8 - b'0') as usize],
        ':' => &COLON,
        '.' => &PERIOD,
        _ => &BLANK,
    }
}

/// Whether the glyph pixel at (`col`, `row`) is set.
pub fn is_set(rows: &[u8; 7], col: u32, row: u32) -> bool {
    col < GLYPH_WIDTH && row < GLYPH_HEIGHT && rows[row as usize] & (0x10 >> col) != 0
}

/// Unscaled width in pixels of `text` rendered with these glyphs.
pub fn text_width(text: &str) -> u32 {
    let n = text.chars().count() as u32;
    if n == 0 {
        0
    } else {
        n * GLYPH_WIDTH + (n - 1) * GLYPH_SPACING
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_timestamp_character_has_ink() {
        for c in "0123456789:.".chars() {
            assert!(glyph(c).iter().any(|row| *row != 0), "glyph {c:?} is blank");
        }
    }

    #[test]
    fn test_glyph_rows_fit_in_five_columns() {
        for c in "0123456789:.".chars() {
            assert!(glyph(c).iter().all(|row| *row < 0x20));
        }
    }

    #[test]
    fn test_text_width() {
        assert_eq!(text_width(""), 0);
        assert_eq!(text_width("0"), 5);
        assert_eq!(text_width("00:06.00"), 8 * 5 + 7);
    }
}
