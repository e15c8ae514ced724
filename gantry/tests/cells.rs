use gantry::axis::mm_to_steps;
use gantry::cells::{CELL_MAP, cell_position};
use gantry::config::{STEPS_PER_MM_X, STEPS_PER_MM_Y};
use gantry::{Axis, GantryError, cell_to_steps};

#[test]
fn every_cell_converts_with_the_axis_scale() {
    for (idx, cell) in CELL_MAP.iter().enumerate() {
        let (x, y) = cell_to_steps(idx as i32).expect("valid cell");
        assert_eq!(x, (cell.x_mm * STEPS_PER_MM_X).round() as i32, "cell {idx} x");
        assert_eq!(y, (cell.y_mm * STEPS_PER_MM_Y).round() as i32, "cell {idx} y");
    }
}

#[test]
fn known_cells_land_on_expected_steps() {
    assert_eq!(cell_to_steps(0).unwrap(), (1892, 1278));
    assert_eq!(cell_to_steps(2).unwrap(), (5026, 1278));
    assert_eq!(cell_to_steps(5).unwrap(), (8159, 3763));
}

#[test]
fn out_of_range_cells_are_invalid() {
    for bad in [-1, 6, 42, i32::MIN] {
        assert_eq!(cell_to_steps(bad), Err(GantryError::InvalidCellIndex(bad)));
        assert!(cell_position(bad).is_err());
    }
}

#[test]
fn cells_sit_inside_the_travel() {
    for idx in 0..6 {
        let (x, y) = cell_to_steps(idx).unwrap();
        assert!((0..=Axis::X.travel_max_steps()).contains(&x));
        assert!((0..=Axis::Y.travel_max_steps()).contains(&y));
    }
    assert_eq!(mm_to_steps(Axis::Z, 45.0), Axis::Z.travel_max_steps());
}
