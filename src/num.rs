//! Cell types and the arithmetic that crosses cell boundaries

/// A byte address into dictionary memory. Addresses wrap mod 2^16.
pub type Addr = u16;
/// The machine word: what the stacks hold and what the dictionary stores.
pub type Cell = i16;
/// Two cells wide, used for overflow-free multiply and divide.
pub type DoubleCell = i32;
/// Unsigned counterpart of [`DoubleCell`], only used by `um/mod` and `_uma`.
pub type DoubleAddr = u32;

/// Size of a [`Cell`] in bytes.
pub const CELL: Addr = core::mem::size_of::<Cell>() as Addr;

const CELL_BITS: u32 = Cell::BITS;

/// Joins two cells into a double-cell. `low` is the cell pushed first.
pub fn compose(low: Cell, high: Cell) -> DoubleCell {
    ((high as DoubleCell) << CELL_BITS) | (low as Addr as DoubleCell)
}

/// Splits a double-cell into `(low, high)`, the order they are pushed in.
pub fn decompose(value: DoubleCell) -> (Cell, Cell) {
    (value as Cell, (value >> CELL_BITS) as Cell)
}

fn digit_value(byte: u8) -> Option<u32> {
    match byte {
        b'0'..=b'9' => Some((byte - b'0') as u32),
        b'a'..=b'z' => Some((byte - b'a') as u32 + 10),
        b'A'..=b'Z' => Some((byte - b'A') as u32 + 10),
        _ => None,
    }
}

/// Parses a signed integer written in `base`.
///
/// Accepts an optional leading `-` followed by at least one digit. Letters
/// stand for digits above 9 (case-insensitively) and only count when `base`
/// is greater than 10. Any other byte, or a digit not below `base`, fails the
/// whole parse. Overflow wraps the way cell arithmetic does.
pub fn parse_number(bytes: impl IntoIterator<Item = u8>, base: Cell) -> Option<Cell> {
    if !(2..=36).contains(&base) {
        return None;
    }
    let base = base as u32;

    let mut bytes = bytes.into_iter().peekable();
    let negative = bytes.next_if_eq(&b'-').is_some();

    let mut result: DoubleCell = 0;
    let mut digits = 0;
    for byte in bytes {
        let digit = digit_value(byte).filter(|d| *d < base)?;
        result = result
            .wrapping_mul(base as DoubleCell)
            .wrapping_add(digit as DoubleCell);
        digits += 1;
    }

    if digits == 0 {
        return None;
    }
    if negative {
        result = result.wrapping_neg();
    }
    Some(result as Cell)
}

/// Renders `value` in `base` (2 to 36), lower-case digits, leading `-` when
/// negative. Out-of-range bases fall back to decimal.
pub fn format_radix(value: DoubleCell, base: Cell) -> String {
    let radix = if (2..=36).contains(&base) {
        base as u32
    } else {
        10
    };

    let mut magnitude = value.unsigned_abs();
    let mut string_rev = Vec::new();
    loop {
        // digits below 36 always convert
        string_rev.push(char::from_digit(magnitude % radix, radix).unwrap_or('?'));
        magnitude /= radix;
        if magnitude == 0 {
            break;
        }
    }
    if value < 0 {
        string_rev.push('-');
    }
    string_rev.into_iter().rev().collect()
}
