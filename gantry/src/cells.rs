use crate::axis::{Axis, mm_to_steps};
use crate::config::CELL_COUNT;
use crate::error::GantryError;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CellPosition {
    pub x_mm: f32,
    pub y_mm: f32,
}

// centres measured on the rack, 3 columns (A..C) by 2 rows (1..2)
pub const CELL_MAP: [CellPosition; CELL_COUNT] = [
    CellPosition { x_mm: 37.84, y_mm: 18.25 },  // A1
    CellPosition { x_mm: 37.84, y_mm: 53.75 },  // A2
    CellPosition { x_mm: 100.51, y_mm: 18.25 }, // B1
    CellPosition { x_mm: 100.51, y_mm: 53.75 }, // B2
    CellPosition { x_mm: 163.18, y_mm: 18.25 }, // C1
    CellPosition { x_mm: 163.18, y_mm: 53.75 }, // C2
];

const LABELS: [&str; CELL_COUNT] = ["A1", "A2", "B1", "B2", "C1", "C2"];

pub fn cell_position(cell_index: i32) -> Result<CellPosition, GantryError> {
    checked_index(cell_index).map(|idx| CELL_MAP[idx])
}

pub fn cell_to_steps(cell_index: i32) -> Result<(i32, i32), GantryError> {
    let cell = cell_position(cell_index)?;
    Ok((mm_to_steps(Axis::X, cell.x_mm), mm_to_steps(Axis::Y, cell.y_mm)))
}

pub fn cell_label(cell_index: i32) -> Option<&'static str> {
    checked_index(cell_index).ok().map(|idx| LABELS[idx])
}

pub fn cell_from_label(label: &str) -> Result<i32, GantryError> {
    let trimmed = label.trim();
    let invalid = || GantryError::InvalidSlot(trimmed.to_string());
    if trimmed.len() != 2 {
        return Err(invalid());
    }
    let mut chars = trimmed.chars();
    let column = chars.next().ok_or_else(invalid)?.to_ascii_uppercase();
    let row = chars.next().ok_or_else(invalid)?;
    if !('A'..='C').contains(&column) || !('1'..='2').contains(&row) {
        return Err(invalid());
    }
    let column_idx = (column as u8 - b'A') as i32;
    let row_idx = (row as u8 - b'1') as i32;
    Ok(column_idx * 2 + row_idx)
}

fn checked_index(cell_index: i32) -> Result<usize, GantryError> {
    if (0..CELL_COUNT as i32).contains(&cell_index) {
        Ok(cell_index as usize)
    } else {
        Err(GantryError::InvalidCellIndex(cell_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_index() {
        for idx in 0..CELL_COUNT as i32 {
            let label = cell_label(idx).unwrap();
            assert_eq!(cell_from_label(label).unwrap(), idx);
        }
        assert_eq!(cell_from_label(" b2 ").unwrap(), 3);
    }

    #[test]
    fn rejects_unknown_labels() {
        for bad in ["", "D1", "A3", "A", "A12", "1A"] {
            assert!(matches!(cell_from_label(bad), Err(GantryError::InvalidSlot(_))), "{bad}");
        }
        assert_eq!(cell_label(6), None);
        assert_eq!(cell_label(-1), None);
    }
}
