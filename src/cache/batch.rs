use tracing::debug;

use crate::models::TemplateRecord;

/// One position in the batch cache, addressed by `serial_no - 1`.
///
/// `EndOfData` means the server confirmed no record exists at that
/// serial; `Unknown` means it has not been fetched yet. The distinction
/// is what lets navigation stop re-requesting exhausted windows.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheSlot {
    Unknown,
    EndOfData,
    Record(TemplateRecord),
}

impl CacheSlot {
    pub fn is_unknown(&self) -> bool {
        matches!(self, CacheSlot::Unknown)
    }

    pub fn is_end_of_data(&self) -> bool {
        matches!(self, CacheSlot::EndOfData)
    }

    pub fn record(&self) -> Option<&TemplateRecord> {
        match self {
            CacheSlot::Record(rec) => Some(rec),
            _ => None,
        }
    }
}

/// A contiguous fixed-size run of serial numbers fetched in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    pub start: u32,
    pub end: u32,
}

impl Window {
    /// The window containing `serial` for the given window size:
    /// `start = ((serial-1)/size)*size + 1`.
    pub fn containing(serial: u32, size: u32) -> Self {
        let serial = serial.max(1);
        let size = size.max(1);
        let start = ((serial - 1) / size) * size + 1;
        Self {
            start,
            end: start + size - 1,
        }
    }

    /// Dedup key for the in-flight set.
    pub fn key(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }

    /// The window immediately after this one.
    pub fn next(&self) -> Self {
        let size = self.size();
        Self {
            start: self.end + 1,
            end: self.end + size,
        }
    }

    pub fn size(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn serials(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Index-addressable store of fetched template records.
///
/// Slot `serial_no - 1` holds the record for that serial, an end-of-data
/// sentinel, or `Unknown`. Writes are index-addressed, never appended, so
/// windows may complete out of order safely. A slot is written at most
/// once; only `reset` (scope change) clears it.
#[derive(Debug, Default)]
pub struct BatchCache {
    slots: Vec<CacheSlot>,
}

/// What a `merge_window` call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub records_added: usize,
    pub end_marks_added: usize,
}

impl BatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    const UNKNOWN: CacheSlot = CacheSlot::Unknown;

    pub fn get(&self, serial: u32) -> &CacheSlot {
        if serial == 0 {
            return &Self::UNKNOWN;
        }
        self.slots
            .get((serial - 1) as usize)
            .unwrap_or(&Self::UNKNOWN)
    }

    pub fn record_at(&self, serial: u32) -> Option<&TemplateRecord> {
        self.get(serial).record()
    }

    fn slot_mut(&mut self, serial: u32) -> &mut CacheSlot {
        let idx = (serial.max(1) - 1) as usize;
        if idx >= self.slots.len() {
            self.slots.resize(idx + 1, CacheSlot::Unknown);
        }
        &mut self.slots[idx]
    }

    /// Merge one window's fetch result into the cache.
    ///
    /// Each record lands at its own `serial_no - 1` slot. When the
    /// response is shorter than the window, every window serial absent
    /// from the response is marked `EndOfData`, but only while the slot
    /// is still `Unknown`: a filled slot is never overwritten, so a slow
    /// stale response cannot clobber fresher data.
    pub fn merge_window(&mut self, window: Window, records: &[TemplateRecord]) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        for record in records {
            let slot = self.slot_mut(record.serial_no);
            if slot.is_unknown() {
                *slot = CacheSlot::Record(record.clone());
                outcome.records_added += 1;
            }
        }

        if (records.len() as u32) < window.size() {
            for serial in window.serials() {
                if records.iter().any(|r| r.serial_no == serial) {
                    continue;
                }
                let slot = self.slot_mut(serial);
                if slot.is_unknown() {
                    *slot = CacheSlot::EndOfData;
                    outcome.end_marks_added += 1;
                }
            }
        }

        debug!(
            window = %window.key(),
            received = records.len(),
            records_added = outcome.records_added,
            end_marks_added = outcome.end_marks_added,
            "window merged"
        );
        outcome
    }

    /// True iff every slot in the window is resolved (record or
    /// end-of-data sentinel).
    pub fn is_window_complete(&self, window: &Window) -> bool {
        window.serials().all(|serial| !self.get(serial).is_unknown())
    }

    /// Clear all slots. Used on category/religion scope change.
    pub fn reset(&mut self) {
        self.slots.clear();
    }

    /// All slots in ascending serial order.
    pub fn slots(&self) -> &[CacheSlot] {
        &self.slots
    }

    /// Number of slots currently holding a record.
    pub fn known_records(&self) -> usize {
        self.slots.iter().filter(|s| s.record().is_some()).count()
    }

    /// Serial of the first slot still `Unknown`; one past the last slot
    /// when every slot is resolved. This is where the visible prefix
    /// ends, so it is the serial look-ahead prefetch should target.
    pub fn first_unknown_serial(&self) -> u32 {
        match self.slots.iter().position(|s| s.is_unknown()) {
            Some(idx) => idx as u32 + 1,
            None => self.slots.len() as u32 + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
