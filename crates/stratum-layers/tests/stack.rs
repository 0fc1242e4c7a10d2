#![forbid(unsafe_code)]

//! Multi-layer stack integration tests.
//!
//! Exercises command descent and event ascent across a realistic stack:
//! data layer at the bottom, reorder above it, hide/show above that, and
//! in some tests a viewport on top.

use stratum_layers::{
    CellUpdateEvent, ColumnHideShowLayer, ColumnReorderCommand, ColumnReorderLayer,
    ColumnResizeCommand, DataLayer, Layer, LayerEvent, MultiColumnHideCommand,
    MultiColumnResizeCommand, ShowAllColumnsCommand, UpdateDataCommand, VecDataProvider,
    ViewportLayer,
};

type Stack = ColumnHideShowLayer<ColumnReorderLayer<DataLayer<VecDataProvider<String>>>>;

fn stack(columns: usize, rows: usize) -> Stack {
    let mut provider = VecDataProvider::new(columns, rows);
    for column in 0..columns {
        for row in 0..rows {
            provider.seed(column, row, format!("[{column},{row}]"));
        }
    }
    ColumnHideShowLayer::new(ColumnReorderLayer::new(DataLayer::new(provider)))
}

fn visible_indexes(layer: &dyn Layer) -> Vec<usize> {
    (0..layer.column_count())
        .map(|p| layer.column_index_by_position(p).unwrap())
        .collect()
}

#[test]
fn reorder_under_hide_composes() {
    let mut stack = stack(5, 2);

    // Move the last column to position 1 at the reorder level.
    let mut reorder = ColumnReorderCommand::new(stack.id(), 4, 1);
    assert!(stack.do_command(&mut reorder));
    assert_eq!(visible_indexes(&stack), [0, 4, 1, 2, 3]);

    // Hide two of the reordered positions.
    stack.hide_column_positions(&[1, 3]);
    assert_eq!(visible_indexes(&stack), [0, 1, 3]);

    // Index lookups skip hidden columns in both directions.
    assert_eq!(stack.column_position_by_index(4), None);
    assert_eq!(stack.column_position_by_index(3), Some(2));
    assert_eq!(stack.column_index_by_position(1), Some(1));
}

#[test]
fn resize_descends_to_the_data_layer_through_both_frames() {
    let mut stack = stack(5, 2);
    let mut reorder = ColumnReorderCommand::new(stack.id(), 4, 0);
    assert!(stack.do_command(&mut reorder));
    stack.hide_column_positions(&[1]); // hides index 0

    // Top frame position 0 is index 4, which sits at data position 4.
    let mut resize = ColumnResizeCommand::new(stack.id(), 0, 150);
    assert!(stack.do_command(&mut resize));

    let data = stack.underlying().underlying();
    assert_eq!(data.column_width_by_position(4), Some(150));
    assert_eq!(data.column_width_by_position(0), Some(100));
    assert_eq!(stack.column_width_by_position(0), Some(150));
}

#[test]
fn width_travels_with_the_moved_column() {
    let mut stack = stack(5, 2);
    let mut resize = ColumnResizeCommand::new(stack.id(), 2, 70);
    assert!(stack.do_command(&mut resize));

    let mut reorder = ColumnReorderCommand::new(stack.id(), 2, 0);
    assert!(stack.do_command(&mut reorder));

    // Sizes are keyed by data-layer position and width lookups convert
    // through the reorder mapping, so the 70px width surfaces wherever
    // index 2 is shown.
    assert_eq!(stack.column_index_by_position(0), Some(2));
    assert_eq!(stack.column_width_by_position(0), Some(70));
    assert_eq!(stack.column_width_by_position(2), Some(100));
}

#[test]
fn command_for_a_hidden_column_is_dropped_whole() {
    let mut stack = stack(5, 2);
    stack.hide_column_positions(&[2]);

    // A multi-resize naming one unmappable position fails entirely.
    let mut vp = ViewportLayer::with_client_area(stack, 250, 100);
    vp.set_origin_column_position(1);
    let mut resize = MultiColumnResizeCommand::with_common_width(vp.id(), &[0, 1, 9], 80);
    assert!(!vp.do_command(&mut resize));

    let data = vp.underlying().underlying().underlying();
    for position in 0..5 {
        assert_eq!(data.column_width_by_position(position), Some(100));
    }
}

#[test]
fn multi_resize_converts_every_coordinate() {
    let mut stack = stack(5, 2);
    let mut reorder = ColumnReorderCommand::new(stack.id(), 4, 0);
    assert!(stack.do_command(&mut reorder)); // order 4,0,1,2,3

    let mut resize = MultiColumnResizeCommand::new(stack.id(), &[0, 1], &[30, 40]);
    assert!(stack.do_command(&mut resize));

    let data = stack.underlying().underlying();
    assert_eq!(data.column_width_by_position(4), Some(30));
    assert_eq!(data.column_width_by_position(0), Some(40));
}

#[test]
fn cell_update_event_ascends_with_converted_positions() {
    let mut stack = stack(5, 2);
    let mut reorder = ColumnReorderCommand::new(stack.id(), 4, 0);
    assert!(stack.do_command(&mut reorder));
    stack.drain_events();

    // Update through the top frame: position 0 is index 4.
    let mut update = UpdateDataCommand::new(stack.id(), 0, 1, "updated".to_string());
    assert!(stack.do_command(&mut update));

    let data = stack.underlying().underlying();
    assert_eq!(
        data.value_by_position(4, 1),
        Some("updated".to_string())
    );

    let events = stack.drain_events();
    let updates: Vec<&CellUpdateEvent> = events
        .iter()
        .filter_map(|e| e.as_any().downcast_ref())
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].column_position(), 0);
    assert_eq!(updates[0].row_position(), 1);
    assert_eq!(updates[0].layer(), stack.id());
}

#[test]
fn event_about_a_hidden_column_never_surfaces() {
    let mut stack = stack(5, 2);
    stack.hide_column_positions(&[3]);
    stack.drain_events();

    // Reach under the hide/show layer and update the hidden column by
    // resizing it at the reorder frame, where it is still position 3.
    let reorder_id = stack.underlying().id();
    let mut resize = ColumnResizeCommand::new(reorder_id, 3, 45);
    // Issue at the top with the reorder frame id: conversion refuses the
    // foreign frame, so the command is dropped.
    assert!(!stack.do_command(&mut resize));
    assert!(stack.drain_events().is_empty());
}

#[test]
fn show_all_is_context_free_and_reaches_its_layer() {
    let mut stack = stack(5, 2);
    stack.hide_column_positions(&[0, 1, 2, 3, 4]);
    assert_eq!(stack.column_count(), 0);

    let mut vp = ViewportLayer::new(stack);
    let mut show_all = ShowAllColumnsCommand;
    assert!(vp.do_command(&mut show_all));
    assert_eq!(vp.underlying().column_count(), 5);
}

#[test]
fn hide_command_resolves_positions_at_the_issuing_frame() {
    let mut stack = stack(5, 2);
    let mut vp = ViewportLayer::with_client_area(stack, 300, 100);
    vp.set_origin_column_position(2);

    // Viewport positions 0..3 are underlying 2..5; hide viewport 0 and 1.
    let mut hide = MultiColumnHideCommand::new(vp.id(), &[0, 1]);
    assert!(vp.do_command(&mut hide));
    assert_eq!(visible_indexes(vp.underlying()), [0, 1, 4]);
}

#[test]
fn update_through_a_scrolled_viewport() {
    let stack = stack(6, 3);
    let mut vp = ViewportLayer::with_client_area(stack, 300, 100);
    vp.set_origin_column_position(3);
    vp.set_origin_row_position(1);
    vp.drain_events();

    let mut update = UpdateDataCommand::new(vp.id(), 1, 0, "scrolled".to_string());
    assert!(vp.do_command(&mut update));

    let data = vp.underlying().underlying().underlying();
    assert_eq!(data.value_by_position(4, 1), Some("scrolled".to_string()));

    // The ascending cell event lands back in viewport coordinates.
    let events = vp.drain_events();
    let update_events: Vec<&CellUpdateEvent> = events
        .iter()
        .filter_map(|e| e.as_any().downcast_ref())
        .collect();
    assert_eq!(update_events.len(), 1);
    assert_eq!(update_events[0].column_position(), 1);
    assert_eq!(update_events[0].row_position(), 0);
}

#[test]
fn read_only_provider_turns_update_into_a_no_op() {
    let provider = VecDataProvider::<String>::read_only(3, 3);
    let mut stack =
        ColumnHideShowLayer::new(ColumnReorderLayer::new(DataLayer::new(provider)));
    let mut update = UpdateDataCommand::new(stack.id(), 0, 0, "nope".to_string());
    assert!(!stack.do_command(&mut update));
    assert!(stack.drain_events().is_empty());
}
