#![forbid(unsafe_code)]

//! Grid assembly integration tests: four-region layout, band-aware command
//! routing, and event ascent across the composite boundary.

use stratum_grid::{GridLayer, GridRegion};
use stratum_layers::{
    CellUpdateEvent, ColumnHideShowLayer, ColumnResizeCommand, DataLayer, Layer, LayerEvent,
    MultiColumnHideCommand, ShowAllColumnsCommand, UpdateDataCommand, VecDataProvider,
};

type BodyStack = ColumnHideShowLayer<DataLayer<VecDataProvider<String>>>;

fn grid() -> GridLayer {
    let mut body_provider = VecDataProvider::new(5, 4);
    for column in 0..5 {
        for row in 0..4 {
            body_provider.seed(column, row, format!("[{column},{row}]"));
        }
    }
    let body: BodyStack = ColumnHideShowLayer::new(DataLayer::new(body_provider));
    GridLayer::new(
        Box::new(DataLayer::new(VecDataProvider::<String>::new(1, 1))),
        Box::new(DataLayer::new(VecDataProvider::<String>::new(5, 1))),
        Box::new(DataLayer::new(VecDataProvider::<String>::new(1, 4))),
        Box::new(body),
    )
}

fn body_of(grid: &GridLayer) -> &BodyStack {
    grid.body_layer()
        .and_then(|layer| layer.as_any().downcast_ref())
        .expect("body stack")
}

#[test]
fn grid_concatenates_the_four_regions() {
    let grid = grid();
    assert_eq!(grid.column_count(), 6);
    assert_eq!(grid.row_count(), 5);

    assert_eq!(grid.region_by_position(0, 0), Some(GridRegion::Corner));
    assert_eq!(grid.region_by_position(3, 0), Some(GridRegion::ColumnHeader));
    assert_eq!(grid.region_by_position(0, 2), Some(GridRegion::RowHeader));
    assert_eq!(grid.region_by_position(3, 2), Some(GridRegion::Body));
    assert_eq!(grid.region_by_position(6, 0), None);
}

#[test]
fn start_x_crosses_the_row_header_band() {
    let grid = grid();
    // Row-header band is one default-width column.
    assert_eq!(grid.start_x_of_column_position(0), Some(0));
    assert_eq!(grid.start_x_of_column_position(1), Some(100));
    assert_eq!(grid.start_x_of_column_position(2), Some(200));
    assert_eq!(grid.start_x_of_column_position(6), Some(600));
}

#[test]
fn cell_update_routes_to_the_body() {
    let mut grid = grid();
    grid.drain_events();

    // Grid (3, 2) is body (2, 1): one column of row header, one row of
    // column header before the body band.
    let mut update = UpdateDataCommand::new(grid.id(), 3, 2, "routed".to_string());
    assert!(grid.do_command(&mut update));

    let body = body_of(&grid);
    assert_eq!(
        body.underlying().value_by_position(2, 1),
        Some("routed".to_string())
    );

    // The body's cell event ascends back into grid coordinates.
    let events = grid.drain_events();
    let updates: Vec<&CellUpdateEvent> = events
        .iter()
        .filter_map(|e| e.as_any().downcast_ref())
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].column_position(), 3);
    assert_eq!(updates[0].row_position(), 2);
    assert_eq!(updates[0].layer(), grid.id());
}

#[test]
fn column_resize_is_consumed_by_the_first_band_that_can_represent_it() {
    let mut grid = grid();
    let mut resize = ColumnResizeCommand::new(grid.id(), 2, 80);
    assert!(grid.do_command(&mut resize));

    // Routing order puts the column header before the body, so the header
    // band consumes the resize for its local position 1.
    assert_eq!(
        grid.column_header_layer()
            .and_then(|l| l.column_width_by_position(1)),
        Some(80)
    );
    let body = body_of(&grid);
    assert_eq!(body.column_width_by_position(1), Some(100));
}

#[test]
fn resize_outside_every_band_is_dropped() {
    let mut grid = grid();
    let mut resize = ColumnResizeCommand::new(grid.id(), 9, 80);
    assert!(!grid.do_command(&mut resize));
}

#[test]
fn hide_command_reaches_the_body_stack() {
    let mut grid = grid();
    // Grid columns 2 and 4 are body positions 1 and 3. The column header
    // band can also represent them but has no hide handling, so routing
    // falls through to the body.
    let mut hide = MultiColumnHideCommand::new(grid.id(), &[2, 4]);
    assert!(grid.do_command(&mut hide));

    let body = body_of(&grid);
    assert_eq!(body.column_count(), 3);
    assert_eq!(body.column_position_by_index(1), None);
    assert_eq!(body.column_position_by_index(3), None);
}

#[test]
fn context_free_show_all_finds_the_hide_show_layer() {
    let mut grid = grid();
    let mut hide = MultiColumnHideCommand::new(grid.id(), &[1, 2, 3]);
    assert!(grid.do_command(&mut hide));
    assert_eq!(body_of(&grid).column_count(), 2);

    let mut show_all = ShowAllColumnsCommand::new();
    assert!(grid.do_command(&mut show_all));
    assert_eq!(body_of(&grid).column_count(), 5);
}
