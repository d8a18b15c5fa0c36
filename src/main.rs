use anyhow::{Context, Result};
use sensorframe::engine::FrameParser;
use sensorframe::source::ReplaySource;
use std::env;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Display poll cadence; independent of the stream's sample interval.
const POLL: Duration = Duration::from_millis(50);

/// Give up once the stream has been quiet this long.
const QUIET_LIMIT: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let path = args
        .next()
        .context("usage: sensorframe <capture.asc> [latency-ms]")?;
    let latency_ms: u64 = match args.next() {
        Some(raw) => raw.parse().context("latency must be in milliseconds")?,
        None => 200,
    };

    let source = ReplaySource::open(&path, Duration::from_millis(latency_ms))?;
    let mut parser = FrameParser::new(Arc::new(source));
    parser.start()?;

    let schema = parser.schema().expect("schema resolved by start").clone();
    println!("{} ({} channels, {}s interval)", schema.name, schema.channels.len(), schema.delta_time);

    let mut last_seen = 0u64;
    let mut quiet = Duration::ZERO;
    while quiet < QUIET_LIMIT {
        let frame = parser.pull_latest();
        if frame.sequence_id == last_seen {
            quiet += POLL;
            thread::sleep(POLL);
            continue;
        }
        last_seen = frame.sequence_id;
        quiet = Duration::ZERO;

        println!("frame #{} @ {}us", frame.sequence_id, frame.timestamp_us);
        for point in &frame.values {
            println!(
                "  {:<24} {:>10.4} {:<4} Δframe {:>+9.4}  Δzero {:>+9.4}  [{:.3}, {:.3}]",
                point.name(),
                point.value,
                point.unit().to_string(),
                point.delta_last_frame,
                point.delta_last_zero,
                point.min_value,
                point.max_value,
            );
        }
    }

    parser.stop();

    if let Some(definition) = parser.snapshot_definition() {
        println!("\nlearned calibration:");
        println!("{}", serde_json::to_string_pretty(&definition)?);
    }

    Ok(())
}
