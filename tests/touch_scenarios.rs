use depth_touch::depth_source::{DepthFrame, ScriptedDepthSource};
use depth_touch::output::{EmptyListSendMode, MemorySink};
use depth_touch::pipeline::TouchPipeline;
use depth_touch::touch_config::{DepthBand, Roi, TouchConfig};
use depth_touch::tracking::{CursorEvent, CursorState};

fn table_config() -> TouchConfig {
    TouchConfig {
        frame_width: 100,
        frame_height: 100,
        region_of_interest: Roi::new(0, 0, 100, 100),
        depth_band: DepthBand::new(10, 20),
        min_area: 50,
        background_frames: 1,
        empty_send_mode: EmptyListSendMode::Always,
        ..TouchConfig::default()
    }
}

fn calibrated_pipeline() -> TouchPipeline {
    let mut pipeline = TouchPipeline::new(table_config()).unwrap();
    let mut source = ScriptedDepthSource::new([DepthFrame::uniform(100, 100, 2000)]);
    pipeline.calibrate(&mut source).unwrap();
    pipeline
}

fn touch_at(x: u32, y: u32) -> DepthFrame {
    DepthFrame::uniform(100, 100, 2000).with_block(x - 5, y - 5, 10, 10, 1990)
}

#[test]
fn single_touch_lifecycle() {
    let mut pipeline = calibrated_pipeline();

    // Frame 1: touch appears
    let batch = pipeline.process_frame(&touch_at(50, 50)).unwrap();
    assert_eq!(batch.frame, 1);
    assert_eq!(batch.events.len(), 1);
    let id = match batch.events[0] {
        CursorEvent::Add { session_id, x, y } => {
            assert!((x - 0.5).abs() < 1e-4);
            assert!((y - 0.5).abs() < 1e-4);
            session_id
        }
        ref other => panic!("expected ADD, got {:?}", other),
    };

    // Frame 2: same place, same id
    let batch = pipeline.process_frame(&touch_at(50, 50)).unwrap();
    assert_eq!(batch.events.len(), 1);
    match batch.events[0] {
        CursorEvent::Update { session_id, x, y } => {
            assert_eq!(session_id, id);
            assert!((x - 0.5).abs() < 1e-4);
            assert!((y - 0.5).abs() < 1e-4);
        }
        ref other => panic!("expected UPDATE, got {:?}", other),
    }

    // Frame 3: touch lifted; cursor stopped but still queryable, no event
    let batch = pipeline
        .process_frame(&DepthFrame::uniform(100, 100, 2000))
        .unwrap();
    assert!(batch.events.is_empty());
    assert_eq!(
        pipeline.tracker().get(id).map(|c| c.state),
        Some(CursorState::Stopped)
    );

    // Frame 4: still absent; cursor removed
    let batch = pipeline
        .process_frame(&DepthFrame::uniform(100, 100, 2000))
        .unwrap();
    assert_eq!(batch.events, vec![CursorEvent::Remove { session_id: id }]);
    assert!(pipeline.tracker().get(id).is_none());
}

#[test]
fn two_touches_keep_distinct_ids() {
    let mut pipeline = calibrated_pipeline();
    let frame = DepthFrame::uniform(100, 100, 2000)
        .with_block(10, 10, 10, 10, 1988)
        .with_block(75, 70, 10, 10, 1988);

    let first = pipeline.process_frame(&frame).unwrap();
    assert_eq!(first.events.len(), 2);
    let mut ids: Vec<u64> = first.events.iter().map(|e| e.session_id()).collect();
    ids.sort();
    assert_ne!(ids[0], ids[1]);

    for _ in 0..12 {
        let batch = pipeline.process_frame(&frame).unwrap();
        let mut seen: Vec<u64> = batch
            .events
            .iter()
            .map(|e| {
                assert!(matches!(e, CursorEvent::Update { .. }));
                e.session_id()
            })
            .collect();
        seen.sort();
        assert_eq!(seen, ids);
    }

    for cursor in pipeline.tracker().cursors() {
        assert!((0. ..=1.).contains(&cursor.x));
        assert!((0. ..=1.).contains(&cursor.y));
    }
}

#[test]
fn full_run_over_scripted_source() {
    let mut pipeline = TouchPipeline::new(table_config()).unwrap();
    let mut source = ScriptedDepthSource::new([
        DepthFrame::uniform(100, 100, 2000),
        touch_at(30, 60),
        touch_at(31, 60),
        DepthFrame::uniform(100, 100, 2000),
        DepthFrame::uniform(100, 100, 2000),
    ]);
    let mut sink = MemorySink::default();

    assert!(pipeline.run(&mut source, &mut sink, None, None).is_err());
    assert_eq!(sink.frames.len(), 4);
    let kinds: Vec<&str> = sink
        .frames
        .iter()
        .map(|b| match b.events.first() {
            Some(CursorEvent::Add { .. }) => "add",
            Some(CursorEvent::Update { .. }) => "update",
            Some(CursorEvent::Remove { .. }) => "remove",
            None => "none",
        })
        .collect();
    assert_eq!(kinds, vec!["add", "update", "none", "remove"]);
    let frames: Vec<u64> = sink.frames.iter().map(|b| b.frame).collect();
    assert_eq!(frames, vec![1, 2, 3, 4]);
}
