//! Sync group propagation tests.

use vgrid_model::{
    FrameOfReferenceUid, SyncGroup, SyncGroupId, SyncGroupOptions, ViewportId, ViewportType,
};
use vgrid_state::{
    OpenViewport, PositionPresentation, SyncChange, SyncGroupCoordinator, ViewportGridState,
};

fn viewport_id(name: &str) -> ViewportId {
    ViewportId::new(name).expect("valid id")
}

fn position_group(source: bool, target: bool, same_for: bool) -> SyncGroup {
    SyncGroup {
        kind: "position".to_string(),
        id: SyncGroupId::new("positionSync").expect("valid id"),
        source,
        target,
        options: SyncGroupOptions {
            matching_rules: if same_for {
                vec!["sameFOR".to_string()]
            } else {
                Vec::new()
            },
        },
    }
}

fn open_viewport(
    name: &str,
    slot: usize,
    frame_of_reference: Option<&str>,
    groups: Vec<SyncGroup>,
) -> OpenViewport {
    OpenViewport {
        id: viewport_id(name),
        slot,
        display_sets: Vec::new(),
        frame_of_reference: frame_of_reference
            .map(|uid| FrameOfReferenceUid::new(uid).expect("valid uid")),
        viewport_type: ViewportType::Stack,
        tool_group_id: None,
        sync_groups: groups,
    }
}

fn camera() -> SyncChange {
    SyncChange::Position(PositionPresentation {
        pan: (4.0, 2.0),
        zoom: 1.25,
        view_reference: None,
    })
}

#[test]
fn propagates_to_matching_targets_but_not_the_source() {
    let mut grid = ViewportGridState::new();
    grid.replace_all(vec![
        open_viewport("a", 0, Some("FOR-1"), vec![position_group(true, true, true)]),
        open_viewport("b", 1, Some("FOR-1"), vec![position_group(true, true, true)]),
        open_viewport("c", 2, Some("FOR-2"), vec![position_group(true, true, true)]),
    ]);
    let coordinator = SyncGroupCoordinator::new();

    let applications = coordinator.propagate(&grid, &viewport_id("a"), &camera());
    let targets: Vec<&str> = applications
        .iter()
        .map(|a| a.target.as_str())
        .collect();
    assert_eq!(targets, vec!["b"]);
}

#[test]
fn non_source_viewport_does_not_propagate() {
    let mut grid = ViewportGridState::new();
    grid.replace_all(vec![
        open_viewport("a", 0, Some("FOR-1"), vec![position_group(false, true, true)]),
        open_viewport("b", 1, Some("FOR-1"), vec![position_group(true, true, true)]),
    ]);
    let coordinator = SyncGroupCoordinator::new();
    assert!(coordinator
        .propagate(&grid, &viewport_id("a"), &camera())
        .is_empty());
}

#[test]
fn target_flag_gates_membership() {
    let mut grid = ViewportGridState::new();
    grid.replace_all(vec![
        open_viewport("a", 0, Some("FOR-1"), vec![position_group(true, true, true)]),
        open_viewport("b", 1, Some("FOR-1"), vec![position_group(true, false, true)]),
    ]);
    let coordinator = SyncGroupCoordinator::new();
    assert!(coordinator
        .propagate(&grid, &viewport_id("a"), &camera())
        .is_empty());
}

#[test]
fn membership_is_recomputed_from_the_current_grid() {
    let mut grid = ViewportGridState::new();
    grid.replace_all(vec![
        open_viewport("a", 0, Some("FOR-1"), vec![position_group(true, true, true)]),
        open_viewport("b", 1, Some("FOR-2"), vec![position_group(true, true, true)]),
    ]);
    let coordinator = SyncGroupCoordinator::new();
    assert!(coordinator
        .propagate(&grid, &viewport_id("a"), &camera())
        .is_empty());

    // The display set in slot b changes frame of reference; the next
    // propagation sees the new membership without any re-registration.
    grid.get_mut(&viewport_id("b"))
        .expect("viewport b")
        .frame_of_reference = Some(FrameOfReferenceUid::new("FOR-1").expect("valid uid"));
    let applications = coordinator.propagate(&grid, &viewport_id("a"), &camera());
    assert_eq!(applications.len(), 1);
}

#[test]
fn viewport_without_frame_of_reference_never_matches_same_for() {
    let mut grid = ViewportGridState::new();
    grid.replace_all(vec![
        open_viewport("a", 0, None, vec![position_group(true, true, true)]),
        open_viewport("b", 1, None, vec![position_group(true, true, true)]),
    ]);
    let coordinator = SyncGroupCoordinator::new();
    assert!(coordinator
        .propagate(&grid, &viewport_id("a"), &camera())
        .is_empty());
}

#[test]
fn group_without_predicates_reaches_all_declared_members() {
    let mut grid = ViewportGridState::new();
    grid.replace_all(vec![
        open_viewport("a", 0, Some("FOR-1"), vec![position_group(true, true, false)]),
        open_viewport("b", 1, Some("FOR-2"), vec![position_group(true, true, false)]),
        open_viewport("c", 2, None, Vec::new()),
    ]);
    let coordinator = SyncGroupCoordinator::new();
    let applications = coordinator.propagate(&grid, &viewport_id("a"), &camera());
    let targets: Vec<&str> = applications
        .iter()
        .map(|a| a.target.as_str())
        .collect();
    assert_eq!(targets, vec!["b"]);
}
