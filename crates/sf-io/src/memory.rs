//! In-memory record stream
//!
//! Serves mini-SEED records straight out of a byte buffer. Useful for
//! tests and for replaying captured data without touching the filesystem.

use std::sync::Arc;

use sf_core::{Record, StreamId, TimeWindow};

use crate::{mseed, IoResult, RecordStream};

pub struct MemoryStream {
    buffer: Vec<u8>,
    offset: usize,
    subscriptions: Vec<(StreamId, Option<TimeWindow>)>,
    window: Option<TimeWindow>,
    closed: bool,
}

impl MemoryStream {
    pub fn new(buffer: Vec<u8>) -> Self {
        Self {
            buffer,
            offset: 0,
            subscriptions: Vec::new(),
            window: None,
            closed: false,
        }
    }

    fn wanted(&self, rec: &Record) -> bool {
        let window_ok = |w: &Option<TimeWindow>| match w {
            Some(w) => w.overlaps(&rec.time_window()),
            None => true,
        };
        if self.subscriptions.is_empty() {
            return window_ok(&self.window);
        }
        self.subscriptions.iter().any(|(id, w)| {
            id == rec.stream_id()
                && window_ok(if w.is_some() { w } else { &self.window })
        })
    }
}

impl RecordStream for MemoryStream {
    fn add_stream(&mut self, id: &StreamId, window: Option<TimeWindow>) -> IoResult<()> {
        self.subscriptions.push((id.clone(), window));
        Ok(())
    }

    fn set_time_window(&mut self, window: TimeWindow) -> IoResult<()> {
        self.window = Some(window);
        Ok(())
    }

    fn next_record(&mut self) -> IoResult<Option<Arc<Record>>> {
        while !self.closed && self.offset + 48 <= self.buffer.len() {
            let decoded = mseed::decode_record(&self.buffer[self.offset..])?;
            self.offset += decoded.length;
            if self.wanted(&decoded.record) {
                return Ok(Some(decoded.record.into_shared()));
            }
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mseed::{encode_record, EncodeOptions};
    use sf_core::Time;

    fn record(sta: &str, start_sec: i64) -> Record {
        let samples: Vec<i32> = (0..20).collect();
        Record::new(
            StreamId::new("XX", sta, "", "BHZ"),
            Time::from_epoch_micros(start_sec * 1_000_000),
            20.0,
            samples,
        )
        .unwrap()
    }

    fn buffer_with(records: &[Record]) -> Vec<u8> {
        let mut buf = Vec::new();
        for rec in records {
            buf.extend(encode_record(rec, &EncodeOptions::default()).unwrap());
        }
        buf
    }

    #[test]
    fn test_reads_all_records() {
        let buf = buffer_with(&[record("AAA", 0), record("AAA", 1)]);
        let mut stream = MemoryStream::new(buf);
        let mut count = 0;
        while let Some(rec) = stream.next_record().unwrap() {
            assert_eq!(rec.stream_id().station(), "AAA");
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_subscription_filters() {
        let buf = buffer_with(&[record("AAA", 0), record("BBB", 0), record("AAA", 1)]);
        let mut stream = MemoryStream::new(buf);
        stream
            .add_stream(&StreamId::new("XX", "BBB", "", "BHZ"), None)
            .unwrap();
        let rec = stream.next_record().unwrap().expect("one BBB record");
        assert_eq!(rec.stream_id().station(), "BBB");
        assert!(stream.next_record().unwrap().is_none());
    }

    #[test]
    fn test_close_stops_iteration() {
        let buf = buffer_with(&[record("AAA", 0)]);
        let mut stream = MemoryStream::new(buf);
        stream.close();
        assert!(stream.next_record().unwrap().is_none());
    }
}
