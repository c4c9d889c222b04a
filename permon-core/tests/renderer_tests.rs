//! Grid renderer behaviour on whole frames

use permon_core::render::apportion_rows;
use permon_core::{Bounds, Contributor, GridRenderer, PermonError, Resolution};

fn renderer(rows: usize, width: usize) -> GridRenderer {
    GridRenderer::new(Resolution::new(rows, 10 + width + 20), 10, 20).unwrap()
}

fn gutter(frame: &permon_core::Frame, row: usize) -> String {
    frame.rows[row]
        .gutter
        .as_deref()
        .unwrap_or_default()
        .trim_end()
        .to_string()
}

#[test]
fn test_rendering_is_idempotent() {
    let r = renderer(12, 40);
    let values: Vec<f64> = (0..40).map(|i| ((i * 7) % 23) as f64).collect();
    let contributors = vec![Contributor::new("other", 3.0), Contributor::new("x", 9.0)];

    let first = r
        .render("CPU", &values, Bounds::from_minimum(0.0), &contributors)
        .unwrap();
    let second = r
        .render("CPU", &values, Bounds::from_minimum(0.0), &contributors)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn test_constant_buffer_gets_nonzero_interval() {
    let frame = renderer(12, 4)
        .render("flat", &[10.0, 10.0, 10.0, 10.0], Bounds::adaptive(), &[])
        .unwrap();
    assert_eq!(frame.minimum, 9.0);
    assert_eq!(frame.maximum, 11.0);
    // The flat line sits in the middle row.
    let middle = frame.rows.len() / 2;
    assert_eq!(frame.rows[middle].line, "─── ");
}

#[test]
fn test_cells_stay_within_rows() {
    let r = renderer(9, 8);
    let values = [-50.0, 0.0, 12.5, 50.0, 99.9, 100.0, 150.0, f64::NAN];
    let frame = r
        .render("bounded", &values, Bounds::fixed(0.0, 100.0), &[])
        .unwrap();
    let top = frame.rows.len() - 1;
    assert!(frame.cells.iter().all(|&c| c <= top));
    assert_eq!(frame.cells[0], 0);
    assert_eq!(frame.cells[6], top);
    assert_eq!(frame.height(), 9);
}

#[test]
fn test_every_line_has_full_width() {
    let frame = renderer(10, 30)
        .render(
            "w",
            &[1.0; 30],
            Bounds::fixed(0.0, 2.0),
            &[Contributor::new("a-very-long-process-name", 1.0)],
        )
        .unwrap();
    for row in &frame.rows {
        assert_eq!(row.label.chars().count(), 10);
        assert_eq!(row.line.chars().count(), 30);
        assert_eq!(row.gutter.as_ref().unwrap().chars().count(), 20);
    }
}

#[test]
fn test_gutter_fills_up_to_latest_value() {
    let values = [60.0; 6];
    let contributors = vec![Contributor::new("other", 12.0), Contributor::new("a", 48.0)];
    let frame = renderer(12, 6)
        .render("RAM", &values, Bounds::fixed(0.0, 100.0), &contributors)
        .unwrap();

    assert_eq!(frame.rows.len(), 11);
    for row in 0..4 {
        assert_eq!(gutter(&frame, row), "│");
    }
    assert_eq!(gutter(&frame, 4), "├");
    assert_eq!(gutter(&frame, 6), "│ a");
    assert_eq!(gutter(&frame, 9), "├");
    assert_eq!(gutter(&frame, 10), "│ other");
}

#[test]
fn test_long_contributor_names_are_truncated() {
    let frame = renderer(6, 4)
        .render(
            "t",
            &[4.0; 4],
            Bounds::fixed(0.0, 4.0),
            &[Contributor::new("an-extremely-long-name", 4.0)],
        )
        .unwrap();
    let labelled: Vec<String> = (0..frame.rows.len())
        .map(|i| gutter(&frame, i))
        .filter(|g| g.contains(' '))
        .collect();
    assert_eq!(labelled, vec!["│ an-extremely-lo..."]);
}

#[test]
fn test_apportioned_rows_sum_to_target() {
    let sets: [&[f64]; 5] = [
        &[20.0, 80.0],
        &[1.0, 1.0, 1.0],
        &[0.5, 33.3, 66.6, 0.01],
        &[99.0, 0.5, 0.5],
        &[7.0],
    ];
    for values in sets {
        let total: f64 = values.iter().sum();
        for rows in 1..20usize {
            let shares: Vec<f64> = values.iter().map(|v| v / total * rows as f64).collect();
            for target in 1..=rows + 1 {
                let awarded = apportion_rows(&shares, target);
                assert_eq!(awarded.iter().sum::<usize>(), target);
            }
        }
    }
}

#[test]
fn test_labels_wider_than_axis_refused() {
    let err = renderer(6, 4)
        .render("big", &[5e9; 4], Bounds::adaptive(), &[])
        .unwrap_err();
    assert!(matches!(err, PermonError::Configuration(_)));
}

#[test]
fn test_huge_adaptive_labels_are_rejected() {
    let err = renderer(12, 4)
        .render("big", &[0.0, 1e21, 2e21, 3e21], Bounds::adaptive(), &[])
        .unwrap_err();
    assert!(matches!(err, PermonError::Configuration(_)));
}

#[test]
fn test_clamped_rows_keep_values_next_to_their_labels() {
    let frame = renderer(12, 4)
        .render(
            "half",
            &[0.5, 10.5, 0.5, 10.5],
            Bounds::fixed(0.5, 10.5),
            &[],
        )
        .unwrap();
    assert_eq!(frame.cells, vec![0, 10, 0, 10]);
    assert_eq!(frame.rows[0].label.trim_start(), "10.50 ┤");
    assert_eq!(frame.rows[10].label.trim_start(), "0.50 ┤");
}
