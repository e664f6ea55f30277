use super::*;
use crate::transforms::encode_png;
use shared::error::Failure;

fn png(width: u32, height: u32) -> ImageHandle {
    let raster = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 10, 255]));
    ImageHandle::new("photo.png", "image/png", encode_png(&raster).expect("png"))
}

fn slot(n: u8) -> SlotId {
    SlotId::new(n).expect("slot")
}

fn loaded_state() -> AppState {
    let mut state = AppState::new();
    state.load_source(png(4, 2));
    state
}

fn fill_all_slots(state: &mut AppState) {
    let requests = state.begin_fan_out().expect("fan out");
    for request in requests {
        state.apply_outcome(request.ticket, ActionOutcome::Image(png(1, 1)));
    }
}

fn start_job(state: &mut AppState, kind: TransformKind) -> TransformJob {
    match state.begin_transform(kind).expect("begin transform") {
        TransformStart::Job(job) => job,
        TransformStart::Restored => panic!("expected a transform job"),
    }
}

#[test]
fn upload_resets_everything_derived_from_previous_image() {
    let mut state = loaded_state();
    fill_all_slots(&mut state);
    let job = start_job(&mut state, TransformKind::Grayscale);
    let gray = job.kind.apply(&job.source).expect("gray");
    state.complete_transform(job.ticket, Ok(gray)).expect("complete");
    assert!(state.is_monochrome());
    fill_all_slots(&mut state);
    assert!(state.open_modal(slot(1)));

    let fresh = png(3, 3);
    state.load_source(fresh.clone());

    assert_eq!(state.current(), Some(&fresh));
    assert!(!state.is_monochrome());
    assert!(state.last_color().is_none());
    assert!(state.modal().is_none());
    assert!(state
        .slots()
        .iter()
        .all(|slot| slot.content() == &SlotContent::Empty));
}

#[test]
fn grayscale_toggle_restores_the_exact_color_handle() {
    let mut state = loaded_state();
    let original = state.current().cloned().expect("current");

    let job = start_job(&mut state, TransformKind::Grayscale);
    let gray = job.kind.apply(&job.source).expect("gray");
    assert_eq!(state.complete_transform(job.ticket, Ok(gray.clone())).ok(), Some(true));
    assert!(state.is_monochrome());
    assert_eq!(state.current(), Some(&gray));
    assert_eq!(state.last_color(), Some(&original));

    assert!(matches!(
        state.begin_transform(TransformKind::Grayscale),
        Ok(TransformStart::Restored)
    ));
    assert!(!state.is_monochrome());
    assert!(state.last_color().is_none());
    let restored = state.current().expect("current");
    assert_eq!(restored, &original);
    assert_eq!(restored.bytes(), original.bytes());
}

#[test]
fn rotate_preserves_monochrome_flag_and_snapshot() {
    let mut state = loaded_state();
    let original = state.current().cloned().expect("current");

    let job = start_job(&mut state, TransformKind::Grayscale);
    let gray = job.kind.apply(&job.source).expect("gray");
    state.complete_transform(job.ticket, Ok(gray)).expect("complete");

    for _ in 0..4 {
        let job = start_job(&mut state, TransformKind::Rotate);
        let rotated = job.kind.apply(&job.source).expect("rotate");
        state.complete_transform(job.ticket, Ok(rotated)).expect("complete");
        assert!(state.is_monochrome());
        assert_eq!(state.last_color(), Some(&original));
    }

    let current = state.current().expect("current");
    assert_eq!(crate::transforms::dimensions(current), Some((4, 2)));
}

#[test]
fn transforms_clear_slots_and_invalidate_grid_requests() {
    let mut state = loaded_state();
    let request = state
        .begin_action(Action::RemoveBriaAi, Origin::Grid)
        .expect("request");
    assert!(state.slot(slot(4)).is_pending());

    let job = start_job(&mut state, TransformKind::Rotate);
    let rotated = job.kind.apply(&job.source).expect("rotate");
    state.complete_transform(job.ticket, Ok(rotated)).expect("complete");
    assert_eq!(state.slot(slot(4)).content(), &SlotContent::Empty);

    let applied = state.apply_outcome(request.ticket, ActionOutcome::Image(png(1, 1)));
    assert_eq!(applied, Applied::Stale);
    assert_eq!(state.slot(slot(4)).content(), &SlotContent::Empty);
}

#[test]
fn second_transform_is_rejected_while_one_is_running() {
    let mut state = loaded_state();
    let _job = start_job(&mut state, TransformKind::Rotate);
    assert!(matches!(
        state.begin_transform(TransformKind::Grayscale),
        Err(TransformError::Busy)
    ));
    assert_eq!(state.transform_in_flight(), Some(TransformKind::Rotate));
}

#[test]
fn transform_result_after_upload_is_dropped() {
    let mut state = loaded_state();
    let job = start_job(&mut state, TransformKind::Grayscale);
    let fresh = png(2, 2);
    state.load_source(fresh.clone());

    let gray = job.kind.apply(&job.source).expect("gray");
    assert_eq!(state.complete_transform(job.ticket, Ok(gray)).ok(), Some(false));
    assert_eq!(state.current(), Some(&fresh));
    assert!(!state.is_monochrome());
}

#[test]
fn failed_transform_surfaces_notice_and_keeps_image() {
    let mut state = loaded_state();
    let original = state.current().cloned();
    let job = start_job(&mut state, TransformKind::Rotate);

    let result = state.complete_transform(job.ticket, Err(TransformError::Task("boom".into())));
    assert!(result.is_err());
    assert_eq!(state.current(), original.as_ref());
    assert!(state.notice().is_some_and(Notice::is_error));
    assert_eq!(state.transform_in_flight(), None);
}

#[test]
fn transforms_need_an_image() {
    let mut state = AppState::new();
    assert!(matches!(
        state.begin_transform(TransformKind::Rotate),
        Err(TransformError::NoImage)
    ));
    assert_eq!(
        state.begin_action(Action::RemoveDefault, Origin::Grid).err(),
        Some(DispatchError::NoImage(Action::RemoveDefault))
    );
}

#[test]
fn image_result_sets_image_and_clears_text() {
    let mut state = loaded_state();
    let request = state
        .begin_action(Action::RemoveCarvekit, Origin::Grid)
        .expect("request");
    assert_eq!(
        state.slot(slot(2)).content(),
        &SlotContent::Pending("Processing...".to_string())
    );

    let result = png(1, 1);
    let applied = state.apply_outcome(request.ticket, ActionOutcome::Image(result.clone()));
    assert_eq!(applied, Applied::Slot(slot(2)));
    assert_eq!(state.slot(slot(2)).image(), Some(&result));
    assert_eq!(state.slot(slot(2)).text(), None);
}

#[test]
fn failures_replace_images_with_error_text() {
    let mut state = loaded_state();
    fill_all_slots(&mut state);

    let request = state
        .begin_action(Action::RemoveBasnet, Origin::Grid)
        .expect("request");
    state.apply_outcome(
        request.ticket,
        ActionOutcome::Failed(Failure::transport("Error: no response from server")),
    );
    assert_eq!(state.slot(slot(6)).image(), None);
    assert_eq!(
        state.slot(slot(6)).text(),
        Some("Error: no response from server")
    );
}

#[test]
fn json_action_from_grid_has_no_slot_and_is_returned() {
    let mut state = loaded_state();
    let request = state
        .begin_action(Action::MeasureQuick, Origin::Grid)
        .expect("request");
    assert!(state.slots().all_settled());

    let applied = state.apply_outcome(request.ticket, ActionOutcome::Text("{}".into()));
    assert_eq!(applied, Applied::Unbound(ActionOutcome::Text("{}".into())));
}

#[test]
fn latest_request_for_a_slot_wins() {
    let mut state = loaded_state();
    let first = state
        .begin_action(Action::RemoveDefault, Origin::Grid)
        .expect("first");
    let second = state
        .begin_action(Action::RemoveDefault, Origin::Grid)
        .expect("second");

    let newer = png(2, 2);
    assert_eq!(
        state.apply_outcome(second.ticket, ActionOutcome::Image(newer.clone())),
        Applied::Slot(slot(1))
    );
    assert_eq!(
        state.apply_outcome(first.ticket, ActionOutcome::Image(png(1, 1))),
        Applied::Stale
    );
    assert_eq!(state.slot(slot(1)).image(), Some(&newer));
}

#[test]
fn fan_out_marks_all_slots_pending_with_distinct_tickets() {
    let mut state = loaded_state();
    let requests = state.begin_fan_out().expect("fan out");
    assert_eq!(requests.len(), 6);
    assert_eq!(state.requests_in_flight(), 6);
    for slot in state.slots().iter() {
        assert_eq!(
            slot.content(),
            &SlotContent::Pending("Starting process...".to_string())
        );
    }
    let mut tickets: Vec<_> = requests.iter().map(|request| request.ticket).collect();
    tickets.dedup();
    assert_eq!(tickets.len(), 6);
}

#[test]
fn modal_opens_only_on_populated_slots() {
    let mut state = loaded_state();
    assert!(!state.open_modal(slot(3)));

    fill_all_slots(&mut state);
    assert!(state.open_modal(slot(3)));
    let modal = state.modal().expect("modal");
    assert_eq!(modal.origin(), slot(3));
    assert_eq!(modal.image(), state.slot(slot(3)).image());
}

#[test]
fn modal_measurement_updates_modal_only() {
    let mut state = loaded_state();
    fill_all_slots(&mut state);
    let slot_image = state.slot(slot(5)).image().cloned();
    assert!(state.open_modal(slot(5)));

    let request = state
        .begin_action(Action::MeasureYolo, Origin::Modal)
        .expect("request");
    assert_eq!(request.image, slot_image.clone().expect("slot image"));
    assert!(state.modal().is_some_and(ModalSelection::is_busy));

    let overlay = png(4, 4);
    let applied = state.apply_outcome(request.ticket, ActionOutcome::Image(overlay.clone()));
    assert_eq!(applied, Applied::Modal);

    let modal = state.modal().expect("modal");
    assert_eq!(modal.image(), Some(&overlay));
    assert_eq!(modal.status(), Some(MEASUREMENT_DONE_TEXT));
    assert!(!modal.is_busy());
    assert_eq!(state.slot(slot(5)).image(), slot_image.as_ref());
    assert_eq!(state.slot(slot(5)).text(), None);
}

#[test]
fn modal_measurement_failure_leaves_origin_slot_untouched() {
    let mut state = loaded_state();
    fill_all_slots(&mut state);
    let slot_image = state.slot(slot(1)).image().cloned();
    assert!(state.open_modal(slot(1)));

    let request = state
        .begin_action(Action::MeasurePlane, Origin::Modal)
        .expect("request");
    state.apply_outcome(
        request.ticket,
        ActionOutcome::Failed(Failure::empty_payload()),
    );

    let modal = state.modal().expect("modal");
    assert_eq!(modal.image(), None);
    assert_eq!(modal.text(), Some("Empty or invalid result."));
    // shown once, as the modal text
    assert_eq!(modal.status(), None);
    assert_eq!(state.slot(slot(1)).image(), slot_image.as_ref());
}

#[test]
fn modal_non_measurement_image_also_updates_origin_slot() {
    let mut state = loaded_state();
    fill_all_slots(&mut state);
    assert!(state.open_modal(slot(2)));

    let request = state
        .begin_action(Action::RemoveU2Net, Origin::Modal)
        .expect("request");
    let result = png(2, 2);
    state.apply_outcome(request.ticket, ActionOutcome::Image(result.clone()));

    assert_eq!(state.slot(slot(2)).image(), Some(&result));
    assert_eq!(state.modal().and_then(ModalSelection::image), Some(&result));
}

#[test]
fn modal_image_result_leaves_a_newer_grid_request_pending() {
    let mut state = loaded_state();
    fill_all_slots(&mut state);
    assert!(state.open_modal(slot(2)));

    let from_modal = state
        .begin_action(Action::RemoveCarvekit, Origin::Modal)
        .expect("modal request");
    let from_grid = state
        .begin_action(Action::RemoveCarvekit, Origin::Grid)
        .expect("grid request");

    let modal_result = png(2, 2);
    assert_eq!(
        state.apply_outcome(from_modal.ticket, ActionOutcome::Image(modal_result.clone())),
        Applied::Modal
    );
    assert!(state.slot(slot(2)).is_pending());
    assert_eq!(state.slot(slot(2)).ticket(), Some(from_grid.ticket));

    let grid_result = png(3, 3);
    assert_eq!(
        state.apply_outcome(from_grid.ticket, ActionOutcome::Image(grid_result.clone())),
        Applied::Slot(slot(2))
    );
    assert_eq!(state.slot(slot(2)).image(), Some(&grid_result));
    assert_eq!(state.modal().and_then(ModalSelection::image), Some(&modal_result));
}

#[test]
fn measurement_overlays_are_rejected_from_the_grid() {
    let mut state = loaded_state();
    fill_all_slots(&mut state);

    for action in [Action::MeasureYolo, Action::MeasurePlane] {
        assert_eq!(
            state.begin_action(action, Origin::Grid).err(),
            Some(DispatchError::ModalOnly(action))
        );
    }
    assert_eq!(state.requests_in_flight(), 0);
    assert!(state.slots().iter().all(|slot| slot.image().is_some()));
}

#[test]
fn modal_json_result_goes_to_modal_text() {
    let mut state = loaded_state();
    fill_all_slots(&mut state);
    assert!(state.open_modal(slot(4)));
    let request = state
        .begin_action(Action::MeasureManual, Origin::Modal)
        .expect("request");
    state.apply_outcome(request.ticket, ActionOutcome::Text("{\n  \"cm\": 3\n}".into()));

    let modal = state.modal().expect("modal");
    assert_eq!(modal.image(), None);
    assert_eq!(modal.text(), Some("{\n  \"cm\": 3\n}"));
    assert!(state.slot(slot(4)).image().is_some());
}

#[test]
fn text_only_modal_cannot_measure() {
    let mut state = loaded_state();
    let request = state
        .begin_action(Action::RemoveDefault, Origin::Grid)
        .expect("request");
    state.apply_outcome(
        request.ticket,
        ActionOutcome::Failed(Failure::transport("Error: no response from server")),
    );
    assert!(state.open_modal(slot(1)));

    assert_eq!(
        state.begin_action(Action::MeasureYolo, Origin::Modal).err(),
        Some(DispatchError::NoModalImage)
    );
    assert_eq!(
        state.modal().and_then(ModalSelection::status),
        Some(NO_MODAL_IMAGE_TEXT)
    );
}

#[test]
fn result_for_closed_modal_is_dropped() {
    let mut state = loaded_state();
    fill_all_slots(&mut state);
    assert!(state.open_modal(slot(1)));
    let request = state
        .begin_action(Action::MeasureYolo, Origin::Modal)
        .expect("request");
    state.close_modal();

    assert_eq!(
        state.apply_outcome(request.ticket, ActionOutcome::Image(png(1, 1))),
        Applied::Stale
    );
    assert_eq!(
        state.begin_action(Action::MeasureYolo, Origin::Modal).err(),
        Some(DispatchError::ModalClosed)
    );
}

#[test]
fn live_handles_track_every_owner() {
    let mut state = loaded_state();
    let source = state.current().cloned().expect("current");
    fill_all_slots(&mut state);
    assert!(state.open_modal(slot(1)));

    let live = state.live_handles();
    assert!(live.contains(&source.id()));
    for slot in state.slots().iter() {
        assert!(live.contains(&slot.image().expect("image").id()));
    }
    // modal shares slot 1's handle
    assert_eq!(live.len(), 7);

    state.load_source(png(1, 1));
    assert_eq!(state.live_handles().len(), 1);
    assert!(!state.live_handles().contains(&source.id()));
}

#[test]
fn local_actions_never_become_backend_requests() {
    let mut state = loaded_state();
    assert_eq!(
        state.begin_action(Action::Rotate, Origin::Grid).err(),
        Some(DispatchError::LocalAction(Action::Rotate))
    );
}
