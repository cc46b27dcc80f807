//! SDS archive reader
//!
//! Serves records from a SeisComP Data Structure archive:
//! `{base}/{year}/{net}/{sta}/{cha}.D/{net}.{sta}.{loc}.{cha}.D.{year}.{doy}`
//! with the day-of-year zero-padded to three digits. Several base
//! directories may be given comma-separated; the first one holding a file
//! for a given day wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sf_core::{CancellationToken, Record, StreamId, Time, TimeSpan, TimeWindow};

use crate::{mseed, IoError, IoResult, RecordStream};

pub struct SdsArchive {
    bases: Vec<PathBuf>,
    subscriptions: Vec<(StreamId, Option<TimeWindow>)>,
    window: Option<TimeWindow>,
    token: Option<CancellationToken>,
    // Iteration state
    files: Option<Vec<(PathBuf, TimeWindow)>>,
    file_index: usize,
    buffer: Vec<u8>,
    offset: usize,
    current_window: TimeWindow,
    closed: bool,
}

impl SdsArchive {
    /// `sources` is one or more base directories, comma-separated.
    pub fn new(sources: &str) -> Self {
        Self {
            bases: sources
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect(),
            subscriptions: Vec::new(),
            window: None,
            token: None,
            files: None,
            file_index: 0,
            buffer: Vec::new(),
            offset: 0,
            current_window: TimeWindow::default(),
            closed: false,
        }
    }

    fn day_file(base: &Path, id: &StreamId, year: i32, doy: u32) -> PathBuf {
        base.join(year.to_string())
            .join(id.network())
            .join(id.station())
            .join(format!("{}.D", id.channel()))
            .join(format!(
                "{}.{}.{}.{}.D.{}.{:03}",
                id.network(),
                id.station(),
                id.location(),
                id.channel(),
                year,
                doy
            ))
    }

    fn build_file_list(&self) -> IoResult<Vec<(PathBuf, TimeWindow)>> {
        let mut files = Vec::new();
        for (id, sub_window) in &self.subscriptions {
            let window = (*sub_window)
                .or(self.window)
                .ok_or_else(|| IoError::SourceUnavailable("no time window requested".into()))?;

            // One file per archive day the window touches
            let mut day = window.start();
            loop {
                let (year, doy) = day.year_and_day_of_year();
                for base in &self.bases {
                    let path = Self::day_file(base, id, year, doy);
                    if path.is_file() {
                        files.push((path, window));
                        break;
                    }
                }
                let next = day + TimeSpan::from_seconds(86_400.0);
                // Snap to the following midnight to avoid drifting
                let next_midnight = Time::from_epoch_micros(
                    (next.epoch_micros() / 86_400_000_000) * 86_400_000_000,
                );
                if next_midnight >= window.end() {
                    break;
                }
                day = next_midnight;
            }
        }
        Ok(files)
    }

    fn check_cancelled(&self) -> IoResult<()> {
        if self.token.as_ref().is_some_and(|t| t.is_cancelled()) {
            return Err(IoError::Cancelled);
        }
        Ok(())
    }
}

impl RecordStream for SdsArchive {
    fn add_stream(&mut self, id: &StreamId, window: Option<TimeWindow>) -> IoResult<()> {
        self.subscriptions.push((id.clone(), window));
        self.files = None;
        Ok(())
    }

    fn set_time_window(&mut self, window: TimeWindow) -> IoResult<()> {
        self.window = Some(window);
        self.files = None;
        Ok(())
    }

    fn next_record(&mut self) -> IoResult<Option<Arc<Record>>> {
        if self.closed {
            return Ok(None);
        }
        if self.files.is_none() {
            let files = self.build_file_list()?;
            if files.is_empty() {
                log::warn!("sds: no archive files match the request");
            }
            self.files = Some(files);
            self.file_index = 0;
            self.buffer.clear();
            self.offset = 0;
        }

        loop {
            self.check_cancelled()?;

            // Serve from the open file first
            while self.offset + 48 <= self.buffer.len() {
                let decoded = mseed::decode_record(&self.buffer[self.offset..])?;
                self.offset += decoded.length;
                if self.current_window.overlaps(&decoded.record.time_window()) {
                    return Ok(Some(decoded.record.into_shared()));
                }
            }

            // Advance to the next file
            let files = self.files.as_ref().expect("file list built above");
            if self.file_index >= files.len() {
                return Ok(None);
            }
            let (path, window) = files[self.file_index].clone();
            self.file_index += 1;
            self.current_window = window;
            log::debug!("sds: reading {}", path.display());
            self.buffer = std::fs::read(&path)?;
            self.offset = 0;
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.buffer.clear();
    }

    fn set_cancellation(&mut self, token: CancellationToken) {
        self.token = Some(token);
    }
}
