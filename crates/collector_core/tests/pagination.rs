use collector_core::{FirstPageOutcome, PageWindow, PaginationPlanner};
use pretty_assertions::assert_eq;

fn windows(outcome: FirstPageOutcome) -> Vec<PageWindow> {
    match outcome {
        FirstPageOutcome::Windows(windows) => windows,
        FirstPageOutcome::NoNewData => panic!("expected windows, got NoNewData"),
    }
}

#[test]
fn first_request_covers_offset_zero_to_page_size() {
    let planner = PaginationPlanner::new(1000);
    assert_eq!(planner.plan_first_request(), PageWindow::new(0, 1000));
}

#[test]
fn final_window_is_clipped_to_total() {
    let planner = PaginationPlanner::new(10);
    assert_eq!(
        windows(planner.on_first_response(25, None)),
        vec![PageWindow::new(10, 20), PageWindow::new(20, 25)]
    );
}

#[test]
fn unchanged_total_signals_no_new_data() {
    let planner = PaginationPlanner::new(10);
    assert_eq!(
        planner.on_first_response(100, Some(100)),
        FirstPageOutcome::NoNewData
    );
}

#[test]
fn shrunken_total_is_treated_as_no_new_data() {
    let planner = PaginationPlanner::new(10);
    assert_eq!(
        planner.on_first_response(90, Some(100)),
        FirstPageOutcome::NoNewData
    );
}

#[test]
fn first_page_alone_covers_small_totals() {
    let planner = PaginationPlanner::new(10);
    assert_eq!(windows(planner.on_first_response(5, None)), vec![]);
}

#[test]
fn empty_source_emits_no_windows() {
    let planner = PaginationPlanner::new(10);
    assert_eq!(windows(planner.on_first_response(0, None)), vec![]);
}

#[test]
fn previous_count_shrinks_the_effective_range() {
    let planner = PaginationPlanner::new(10);
    // 40 total, 15 already seen: only 25 remain, of which the first page
    // covers 10.
    assert_eq!(
        windows(planner.on_first_response(40, Some(15))),
        vec![PageWindow::new(10, 20), PageWindow::new(20, 25)]
    );
}

#[test]
fn exact_multiple_of_page_size_has_no_trailing_sliver() {
    let planner = PaginationPlanner::new(10);
    assert_eq!(
        windows(planner.on_first_response(30, None)),
        vec![PageWindow::new(10, 20), PageWindow::new(20, 30)]
    );
}

#[test]
fn a_zero_page_size_degrades_to_single_item_windows() {
    // Misconfigured page size must not stall window generation.
    let planner = PaginationPlanner::new(0);
    assert_eq!(planner.plan_first_request(), PageWindow::new(0, 1));
    assert_eq!(
        windows(planner.on_first_response(3, None)),
        vec![PageWindow::new(1, 2), PageWindow::new(2, 3)]
    );
}

// Exhaustive check over small inputs: the emitted windows partition
// [page_size, effective_total) with no overlap and no gap.
#[test]
fn windows_partition_the_unseen_range_exactly() {
    for page_size in 1..=7u64 {
        let planner = PaginationPlanner::new(page_size);
        for total in 0..=50u64 {
            for previous in std::iter::once(None).chain((0..=total).map(Some)) {
                match planner.on_first_response(total, previous) {
                    FirstPageOutcome::NoNewData => {
                        assert_eq!(previous, Some(total));
                    }
                    FirstPageOutcome::Windows(windows) => {
                        let effective = total - previous.unwrap_or(0);
                        let mut cursor = page_size;
                        for window in &windows {
                            assert_eq!(window.offset_start, cursor, "gap or overlap");
                            assert!(window.offset_end <= effective, "window past total");
                            assert!(!window.is_empty(), "empty window emitted");
                            cursor = window.offset_end;
                        }
                        assert_eq!(cursor, effective.max(page_size), "range not covered");
                    }
                }
            }
        }
    }
}
