use sensorframe::core::{Frame, Unit};
use sensorframe::engine::{FrameParser, ParserState};
use sensorframe::schema::{Bound, ChannelSpec, Schema, SourceKind};
use sensorframe::source::{ScriptedSource, ScriptedWriter};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const WAIT_LIMIT: Duration = Duration::from_secs(2);

fn scripted_schema(channels: Vec<ChannelSpec>) -> Schema {
    Schema {
        name: "scripted".to_string(),
        // No pacing so tests run at full speed
        delta_time: 0.0,
        source_kind: SourceKind::File,
        source_location: "scripted".to_string(),
        delimiter: ";".to_string(),
        channels,
    }
}

fn named_channels(count: usize) -> Vec<ChannelSpec> {
    (0..count)
        .map(|i| ChannelSpec {
            name: format!("ch{i}"),
            ..ChannelSpec::unknown(i as u32)
        })
        .collect()
}

fn started_parser(channels: Vec<ChannelSpec>) -> (FrameParser, ScriptedWriter) {
    let (source, writer) = ScriptedSource::channel(scripted_schema(channels));
    let mut parser = FrameParser::new(Arc::new(source));
    parser.start().unwrap();
    (parser, writer)
}

/// Pull until a frame with at least the wanted sequence id arrives.
fn wait_for_sequence(parser: &mut FrameParser, sequence: u64) -> Arc<Frame> {
    let deadline = Instant::now() + WAIT_LIMIT;
    loop {
        let frame = parser.pull_latest();
        if frame.sequence_id >= sequence {
            return frame;
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting for frame {sequence}"
        );
        thread::sleep(Duration::from_millis(5));
    }
}

/// Wait until the worker has published a frame where the first channel's
/// running max reached `want`, without draining the handoff queue.
fn wait_for_published_max(parser: &FrameParser, want: f32) {
    let deadline = Instant::now() + WAIT_LIMIT;
    loop {
        let snapshot = parser.snapshot_definition().unwrap();
        if snapshot.channels[0].max.unwrap().value == want {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting for published max {want}"
        );
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_data_access_before_start_yields_empty_frame() {
    let (source, _writer) = ScriptedSource::channel(scripted_schema(named_channels(2)));
    let mut parser = FrameParser::new(Arc::new(source));

    assert_eq!(parser.state(), ParserState::Created);
    let frame = parser.pull_latest();
    assert!(frame.is_empty());
    assert_eq!(frame.timestamp_us, 0);
    assert!(parser.schema().is_none());
    assert!(parser.snapshot_definition().is_none());
}

#[test]
fn test_start_twice_is_an_error() {
    let (mut parser, _writer) = started_parser(named_channels(1));
    assert_eq!(parser.state(), ParserState::Started);
    assert!(parser.start().is_err());
}

#[test]
fn test_every_frame_matches_schema_width() {
    let (mut parser, writer) = started_parser(named_channels(3));

    writer.send("1.0;2.0;3.0;");
    writer.send("4.0"); // short row
    writer.send("5.0;6.0;7.0;8.0;9.0;"); // long row

    let frame = wait_for_sequence(&mut parser, 3);
    assert_eq!(frame.values.len(), 3);
    parser.stop();
}

#[test]
fn test_running_bounds_track_observed_extremes() {
    let (mut parser, writer) = started_parser(named_channels(1));

    writer.send("1.0;");
    let first = wait_for_sequence(&mut parser, 1);
    assert_eq!(first.values[0].min_value, 1.0);
    assert_eq!(first.values[0].max_value, 1.0);

    writer.send("3.0;");
    writer.send("2.0;");
    let third = wait_for_sequence(&mut parser, 3);
    assert_eq!(third.values[0].value, 2.0);
    assert_eq!(third.values[0].min_value, 1.0);
    assert_eq!(third.values[0].max_value, 3.0);
    parser.stop();
}

#[test]
fn test_fixed_bounds_never_move() {
    let channels = vec![ChannelSpec {
        name: "clamped".to_string(),
        min: Bound::new(-1.0, true),
        max: Bound::new(5.0, true),
        ..ChannelSpec::unknown(0)
    }];
    let (mut parser, writer) = started_parser(channels);

    writer.send("100.0;");
    writer.send("-100.0;");
    let frame = wait_for_sequence(&mut parser, 2);

    assert_eq!(frame.values[0].min_value, -1.0);
    assert_eq!(frame.values[0].max_value, 5.0);
    parser.stop();
}

#[test]
fn test_delta_last_frame() {
    let (mut parser, writer) = started_parser(named_channels(1));

    writer.send("1.0;");
    let first = wait_for_sequence(&mut parser, 1);
    assert_eq!(first.values[0].delta_last_frame, 0.0);

    writer.send("4.0;");
    let second = wait_for_sequence(&mut parser, 2);
    assert_eq!(second.values[0].delta_last_frame, 3.0);
    parser.stop();
}

#[test]
fn test_first_frame_becomes_zero_reference() {
    let (mut parser, writer) = started_parser(named_channels(1));

    writer.send("1.0;");
    let first = wait_for_sequence(&mut parser, 1);
    assert_eq!(first.values[0].delta_last_zero, 0.0);

    writer.send("5.0;");
    let second = wait_for_sequence(&mut parser, 2);
    assert_eq!(second.values[0].delta_last_zero, 4.0);
    parser.stop();
}

#[test]
fn test_rezero_moves_the_reference() {
    let (mut parser, writer) = started_parser(named_channels(1));

    writer.send("1.0;");
    wait_for_sequence(&mut parser, 1);
    writer.send("5.0;");
    wait_for_sequence(&mut parser, 2);

    // Latest published frame holds 5.0; subsequent deltas use it
    parser.zero();
    writer.send("7.0;");
    let third = wait_for_sequence(&mut parser, 3);
    assert_eq!(third.values[0].delta_last_zero, 2.0);

    // The already-published frame keeps its old delta
    assert_eq!(third.values[0].delta_last_frame, 2.0);
    parser.stop();
}

#[test]
fn test_rezero_before_first_frame_is_a_noop() {
    let (mut parser, writer) = started_parser(named_channels(1));

    parser.zero();
    writer.send("1.0;");
    wait_for_sequence(&mut parser, 1);
    writer.send("3.0;");
    let second = wait_for_sequence(&mut parser, 2);

    // The first frame was still adopted as the zero reference
    assert_eq!(second.values[0].delta_last_zero, 2.0);
    parser.stop();
}

#[test]
fn test_single_pull_yields_only_the_newest_frame() {
    let (mut parser, writer) = started_parser(named_channels(1));

    writer.send("1.0;");
    writer.send("2.0;");
    writer.send("3.0;");
    wait_for_published_max(&parser, 3.0);

    let frame = parser.pull_latest();
    assert_eq!(frame.sequence_id, 3);
    assert_eq!(frame.values[0].value, 3.0);

    // The intermediate frames are unrecoverable
    let again = parser.pull_latest();
    assert_eq!(again.sequence_id, 3);
    parser.stop();
}

#[test]
fn test_pull_is_idempotent_without_new_data() {
    let (mut parser, writer) = started_parser(named_channels(1));

    writer.send("1.0;");
    wait_for_sequence(&mut parser, 1);
    parser.stop();

    let first = parser.pull_latest();
    let second = parser.pull_latest();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_unparseable_field_freezes_only_that_channel() {
    let (mut parser, writer) = started_parser(named_channels(2));

    writer.send("1.0;2.0;");
    wait_for_sequence(&mut parser, 1);
    writer.send("ERR;5.0;");
    let frame = wait_for_sequence(&mut parser, 2);

    assert_eq!(frame.values.len(), 2);
    let bad = &frame.values[0];
    assert_eq!(bad.value, 1.0); // previous value carried forward
    assert_eq!(bad.delta_last_frame, 0.0);
    assert_eq!(bad.delta_last_zero, 0.0);
    assert_eq!(bad.min_value, 1.0);
    assert_eq!(bad.max_value, 1.0);

    let good = &frame.values[1];
    assert_eq!(good.value, 5.0);
    assert_eq!(good.delta_last_frame, 3.0);
    parser.stop();
}

#[test]
fn test_short_row_still_carries_every_channel() {
    let (mut parser, writer) = started_parser(named_channels(2));

    writer.send("1.0;2.0;");
    wait_for_sequence(&mut parser, 1);
    writer.send("7.5");
    let frame = wait_for_sequence(&mut parser, 2);

    assert_eq!(frame.values[0].value, 7.5);
    assert_eq!(frame.values[1].value, 2.0);
    assert_eq!(frame.values[1].delta_last_frame, 0.0);
    parser.stop();
}

#[test]
fn test_stop_is_idempotent_and_terminal() {
    let (mut parser, writer) = started_parser(named_channels(1));
    writer.send("1.0;");
    wait_for_sequence(&mut parser, 1);

    parser.stop();
    parser.stop();
    assert_eq!(parser.state(), ParserState::Stopped);
    assert!(parser.start().is_err());

    // Data already pulled stays readable
    assert_eq!(parser.current().sequence_id, 1);
}

#[test]
fn test_stop_without_start() {
    let (source, _writer) = ScriptedSource::channel(scripted_schema(named_channels(1)));
    let mut parser = FrameParser::new(Arc::new(source));
    parser.stop();
    assert_eq!(parser.state(), ParserState::Stopped);
    assert!(parser.start().is_err());
}

#[test]
fn test_worker_exits_when_the_source_is_exhausted() {
    let (mut parser, writer) = started_parser(named_channels(1));

    writer.send("1.0;");
    wait_for_sequence(&mut parser, 1);
    drop(writer);

    // Stop joins the worker; must not deadlock on the dead source
    parser.stop();
    assert_eq!(parser.pull_latest().sequence_id, 1);
}

#[test]
fn test_snapshot_definition_captures_learned_bounds() {
    let channels = vec![
        ChannelSpec {
            name: "force".to_string(),
            unit: Unit::Kip,
            position: [1.0, 2.0, 3.0],
            ..ChannelSpec::unknown(0)
        },
        ChannelSpec {
            name: "clamped".to_string(),
            min: Bound::new(-1.0, true),
            max: Bound::new(1.0, true),
            ..ChannelSpec::unknown(1)
        },
    ];
    let (mut parser, writer) = started_parser(channels);

    writer.send("2.0;0.5;");
    writer.send("-3.0;0.6;");
    wait_for_sequence(&mut parser, 2);
    parser.stop();

    let definition = parser.snapshot_definition().unwrap();
    assert_eq!(definition.name.as_deref(), Some("scripted"));
    assert_eq!(definition.delimiter.as_deref(), Some(";"));

    let force = &definition.channels[0];
    assert_eq!(force.name.as_deref(), Some("force"));
    assert_eq!(force.units, Some(Unit::Kip));
    assert_eq!(force.x, Some(1.0));
    assert_eq!(force.min, Some(Bound::new(-3.0, false)));
    assert_eq!(force.max, Some(Bound::new(2.0, false)));

    // Fixed bounds come back out fixed and unmoved
    let clamped = &definition.channels[1];
    assert_eq!(clamped.min, Some(Bound::new(-1.0, true)));
    assert_eq!(clamped.max, Some(Bound::new(1.0, true)));
}

#[test]
fn test_snapshot_before_any_frame_uses_schema_bounds() {
    let (parser, _writer) = started_parser(named_channels(1));

    let definition = parser.snapshot_definition().unwrap();
    assert_eq!(definition.channels[0].min.unwrap().value, f32::MAX);
    assert_eq!(definition.channels[0].max.unwrap().value, f32::MIN);
}
