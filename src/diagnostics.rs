use core::{
    cell::RefCell,
    fmt::{self, Write as _},
    sync::atomic::{AtomicU32, Ordering},
};

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use heapless::Deque;

pub const DIAGNOSTIC_LOG_CAPACITY: usize = 256;
pub const DIAGNOSTIC_MESSAGE_CAPACITY: usize = 96;

pub type DiagnosticMessage = heapless::String<DIAGNOSTIC_MESSAGE_CAPACITY>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub t_ms: u64,
    pub message: DiagnosticMessage,
}

/// Platform identity printed ahead of the log in an issue report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceReport {
    pub product: String,
    pub model: String,
    pub device: String,
    pub os_version: u32,
    pub app_version_name: String,
    pub app_version_code: u32,
}

/// Bounded, shared session log. Appends never block on readers for longer
/// than one copy; the oldest entry is evicted when full.
pub struct DiagnosticSink {
    entries: Mutex<CriticalSectionRawMutex, RefCell<Deque<LogEntry, DIAGNOSTIC_LOG_CAPACITY>>>,
    revision: AtomicU32,
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticSink {
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(RefCell::new(Deque::new())),
            revision: AtomicU32::new(0),
        }
    }

    pub fn append(&self, t_ms: u64, message: &str) {
        let mut truncated = DiagnosticMessage::new();
        let _ = TruncatingWriter(&mut truncated).write_str(message);
        self.push(LogEntry {
            t_ms,
            message: truncated,
        });
    }

    pub fn append_fmt(&self, t_ms: u64, args: fmt::Arguments<'_>) {
        let mut message = DiagnosticMessage::new();
        let _ = TruncatingWriter(&mut message).write_fmt(args);
        self.push(LogEntry { t_ms, message });
    }

    fn push(&self, entry: LogEntry) {
        self.entries.lock(|cell| {
            let mut entries = cell.borrow_mut();
            if entries.is_full() {
                let _ = entries.pop_front();
            }
            let _ = entries.push_back(entry);
        });
        self.revision.fetch_add(1, Ordering::Release);
    }

    /// Newest first, for display.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        let mut entries = self.entries();
        entries.reverse();
        entries
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock(|cell| cell.borrow().iter().cloned().collect())
    }

    pub fn export(&self) -> String {
        self.entries
            .lock(|cell| {
                let entries = cell.borrow();
                let mut out = String::new();
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push('\n');
                    }
                    let _ = write!(out, "{} {}", entry.t_ms, entry.message);
                }
                out
            })
    }

    pub fn report(&self, device: &DeviceReport) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Product: {}", device.product);
        let _ = writeln!(out, "Model: {}", device.model);
        let _ = writeln!(out, "Device: {}", device.device);
        let _ = writeln!(out, "OS version: {}", device.os_version);
        let _ = writeln!(
            out,
            "App version: {} ({})",
            device.app_version_name, device.app_version_code
        );
        out.push_str("Debug log:\n");
        out.push_str(&self.export());
        out
    }

    pub fn clear(&self) {
        self.entries.lock(|cell| cell.borrow_mut().clear());
        self.revision.fetch_add(1, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.entries.lock(|cell| cell.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bumped on every mutation.
    pub fn revision(&self) -> u32 {
        self.revision.load(Ordering::Acquire)
    }
}

struct TruncatingWriter<'a>(&'a mut DiagnosticMessage);

impl fmt::Write for TruncatingWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.0.push(ch).is_err() {
                return Err(fmt::Error);
            }
        }
        Ok(())
    }
}
