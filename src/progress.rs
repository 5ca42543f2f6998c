// src/progress.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Per-bucket progress state and the multi-line live renderer.
//!
//! Each bucket owns one line of a fixed block. Every refresh moves the cursor
//! back over the previous block and reprints all lines, so the block always
//! holds exactly one line per target.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

pub const CURSOR_UP: &str = "\x1b[1A";
pub const ERASE_LINE: &str = "\x1b[2K";
pub const GREEN: &str = "\x1b[32m";
pub const RED: &str = "\x1b[31m";
pub const RESET: &str = "\x1b[0m";

/// Cumulative deletion counts flow from a wrapper to its display task.
pub type ProgressSender = mpsc::UnboundedSender<u64>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<u64>;

pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

// -----------------------------------------------------------------------------
// Live writer
// -----------------------------------------------------------------------------

/// Rewrites a block of lines in place using ANSI cursor-up / erase-line.
pub struct LiveWriter {
    out: Box<dyn Write + Send>,
    printed: usize,
}

impl LiveWriter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out, printed: 0 }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn flush_lines(&mut self, lines: &[String]) -> io::Result<()> {
        let mut frame = String::new();
        for _ in 0..self.printed {
            frame.push_str(CURSOR_UP);
            frame.push_str(ERASE_LINE);
        }
        frame.push_str(&lines.join("\n"));
        frame.push('\n');
        self.out.write_all(frame.as_bytes())?;
        self.out.flush()?;
        self.printed = lines.len();
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Clearing state
// -----------------------------------------------------------------------------

/// Counters for one bucket. The line index is fixed for the whole run.
#[derive(Debug)]
pub struct BucketRecord {
    pub name: String,
    pub line: usize,
    deleted: AtomicU64,
}

impl BucketRecord {
    pub fn deleted(&self) -> u64 {
        self.deleted.load(Ordering::Relaxed)
    }
}

struct Render {
    lines: Vec<String>,
    writer: Option<LiveWriter>,
}

/// Shared state of a run: one record and one display line per target.
pub struct ClearingState {
    records: Vec<BucketRecord>,
    render: Mutex<Render>,
}

impl ClearingState {
    /// `initial` holds the first line of every bucket, in target order. With
    /// no writer the lines are tracked but never printed.
    pub fn new(names: &[String], initial: Vec<String>, writer: Option<LiveWriter>) -> Self {
        let records = names
            .iter()
            .enumerate()
            .map(|(line, name)| BucketRecord {
                name: name.clone(),
                line,
                deleted: AtomicU64::new(0),
            })
            .collect();
        let state = Self {
            records,
            render: Mutex::new(Render { lines: initial, writer }),
        };
        state.flush();
        state
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, idx: usize) -> &BucketRecord {
        &self.records[idx]
    }

    /// Raise the deletion count of a bucket; counts never go down.
    pub fn set_deleted(&self, idx: usize, count: u64) {
        self.records[idx].deleted.fetch_max(count, Ordering::Relaxed);
    }

    pub fn update_line(&self, idx: usize, line: String) {
        let mut render = self.render.lock().unwrap_or_else(PoisonError::into_inner);
        let line_idx = self.records[idx].line;
        render.lines[line_idx] = line;
        Self::flush_locked(&mut render);
    }

    pub fn lines(&self) -> Vec<String> {
        self.render
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .lines
            .clone()
    }

    fn flush(&self) {
        let mut render = self.render.lock().unwrap_or_else(PoisonError::into_inner);
        Self::flush_locked(&mut render);
    }

    fn flush_locked(render: &mut Render) {
        let Render { lines, writer } = render;
        if let Some(writer) = writer {
            if let Err(e) = writer.flush_lines(lines) {
                debug!("live writer flush failed: {}", e);
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Deletion counter (consolidator)
// -----------------------------------------------------------------------------

/// Cloneable handle workers use to report deleted items.
#[derive(Clone, Debug)]
pub struct CountHandle {
    tx: mpsc::UnboundedSender<u64>,
}

impl CountHandle {
    pub fn add(&self, n: u64) {
        if n > 0 {
            let _ = self.tx.send(n);
        }
    }
}

/// Single consumer that sums worker increments and forwards the running
/// total to the bucket's progress channel. In quiet mode only the final total
/// is forwarded.
pub struct DeletionCounter {
    handle: CountHandle,
    task: JoinHandle<u64>,
}

impl DeletionCounter {
    pub fn start(progress: ProgressSender, quiet: bool) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
        let task = tokio::spawn(async move {
            let mut total = 0u64;
            while let Some(n) = rx.recv().await {
                total += n;
                if !quiet {
                    let _ = progress.send(total);
                }
            }
            if quiet {
                let _ = progress.send(total);
            }
            total
        });
        Self {
            handle: CountHandle { tx },
            task,
        }
    }

    pub fn handle(&self) -> CountHandle {
        self.handle.clone()
    }

    /// Close the counter and return the total. Every [`CountHandle`] clone
    /// must already be dropped.
    pub async fn finish(self) -> u64 {
        let Self { handle, task } = self;
        drop(handle);
        task.await.unwrap_or_default()
    }
}
