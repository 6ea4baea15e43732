use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::tracking::{FrameEvents, TrackerSnapshot};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyListSendMode {
    Never,
    Once,
    Always,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON document per line
    Json,
    /// Concatenated MessagePack maps
    Msgpack,
}

/// The protocol adapter seam: receives each committed frame's events in
/// order, and (optionally) full-state snapshots for re-announcement.
pub trait EventSink {
    fn publish_frame(&mut self, batch: &FrameEvents) -> Result<()>;

    fn publish_snapshot(&mut self, snapshot: &TrackerSnapshot) -> Result<()>;
}

/// Applies an [`EmptyListSendMode`] to a stream of batches; returns whether
/// the given batch should be forwarded
pub struct EmptyBatchFilter {
    mode: EmptyListSendMode,
    empty_lists_sent: u128,
}

impl EmptyBatchFilter {
    pub fn new(mode: EmptyListSendMode) -> Self {
        EmptyBatchFilter {
            mode,
            empty_lists_sent: 0,
        }
    }

    pub fn should_send(&mut self, batch: &FrameEvents) -> bool {
        let send = match self.mode {
            EmptyListSendMode::Always => true,
            EmptyListSendMode::Once => !batch.is_empty() || self.empty_lists_sent < 1,
            EmptyListSendMode::Never => !batch.is_empty(),
        };

        if batch.is_empty() {
            self.empty_lists_sent += 1; // count
        } else {
            self.empty_lists_sent = 0; // reset
        }

        send
    }
}

/// Serialises batches onto any writer (stdout, a file, a socket...)
pub struct EncodingSink<W: Write> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write> EncodingSink<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        EncodingSink { writer, format }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn encode<T: Serialize>(&mut self, value: &T) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.writer, value)?;
                self.writer.write_all(b"\n")?;
            }
            OutputFormat::Msgpack => {
                let payload = rmp_serde::to_vec_named(value)?;
                self.writer.write_all(&payload)?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> EventSink for EncodingSink<W> {
    fn publish_frame(&mut self, batch: &FrameEvents) -> Result<()> {
        debug!(
            "Publish frame {} with {} events",
            batch.frame,
            batch.events.len()
        );
        self.encode(batch)
    }

    fn publish_snapshot(&mut self, snapshot: &TrackerSnapshot) -> Result<()> {
        debug!("Publish snapshot of {} cursors", snapshot.cursors.len());
        self.encode(snapshot)
    }
}

/// Keeps everything in memory; handy for tests and embedding
#[derive(Default)]
pub struct MemorySink {
    pub frames: Vec<FrameEvents>,
    pub snapshots: Vec<TrackerSnapshot>,
}

impl EventSink for MemorySink {
    fn publish_frame(&mut self, batch: &FrameEvents) -> Result<()> {
        self.frames.push(batch.clone());
        Ok(())
    }

    fn publish_snapshot(&mut self, snapshot: &TrackerSnapshot) -> Result<()> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::CursorEvent;

    fn empty(frame: u64) -> FrameEvents {
        FrameEvents {
            frame,
            events: Vec::new(),
        }
    }

    fn busy(frame: u64) -> FrameEvents {
        FrameEvents {
            frame,
            events: vec![CursorEvent::Remove { session_id: 1 }],
        }
    }

    #[test]
    fn empty_batches_sent_once() {
        let mut filter = EmptyBatchFilter::new(EmptyListSendMode::Once);
        assert!(filter.should_send(&busy(1)));
        assert!(filter.should_send(&empty(2)));
        assert!(!filter.should_send(&empty(3)));
        assert!(filter.should_send(&busy(4)));
        assert!(filter.should_send(&empty(5)));
    }

    #[test]
    fn empty_batches_never_and_always() {
        let mut never = EmptyBatchFilter::new(EmptyListSendMode::Never);
        assert!(!never.should_send(&empty(1)));
        assert!(never.should_send(&busy(2)));

        let mut always = EmptyBatchFilter::new(EmptyListSendMode::Always);
        assert!(always.should_send(&empty(1)));
        assert!(always.should_send(&empty(2)));
    }

    #[test]
    fn json_sink_writes_one_line_per_batch() {
        let mut sink = EncodingSink::new(Vec::new(), OutputFormat::Json);
        sink.publish_frame(&busy(7)).unwrap();
        sink.publish_frame(&empty(8)).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"frame":7,"events":[{"type":"remove","sessionId":1}]}"#
        );
    }

    #[test]
    fn msgpack_sink_round_trips() {
        let mut sink = EncodingSink::new(Vec::new(), OutputFormat::Msgpack);
        sink.publish_frame(&busy(3)).unwrap();
        let bytes = sink.into_inner();
        let decoded: FrameEvents = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded, busy(3));
    }
}
