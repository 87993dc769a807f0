use tracing::debug;

use super::index::CategorySerialIndex;

/// Holds the current serial and moves it over the serial index with
/// circular wraparound (swipe up = next, swipe down = previous).
#[derive(Debug, Clone)]
pub struct SerialNavigator {
    current: u32,
}

impl Default for SerialNavigator {
    fn default() -> Self {
        Self { current: 1 }
    }
}

impl SerialNavigator {
    pub fn current(&self) -> u32 {
        self.current
    }

    /// Set the current serial directly, without membership validation.
    /// An out-of-range serial is snapped back by the next index rebuild.
    pub fn jump_to(&mut self, serial: u32) {
        self.current = serial.max(1);
    }

    /// Advance to the next serial in the index, wrapping to the first
    /// after the last. No-op on an empty index. A current serial that is
    /// not in the index behaves as if it were at position 0.
    pub fn next(&mut self, index: &CategorySerialIndex) -> u32 {
        let serials = index.serials();
        if serials.is_empty() {
            return self.current;
        }
        let pos = index.position_of(self.current).unwrap_or(0);
        self.current = serials[(pos + 1) % serials.len()];
        debug!(serial = self.current, "navigated forward");
        self.current
    }

    /// Step back to the previous serial, wrapping to the last before the
    /// first. No-op on an empty index.
    pub fn previous(&mut self, index: &CategorySerialIndex) -> u32 {
        let serials = index.serials();
        if serials.is_empty() {
            return self.current;
        }
        let pos = index.position_of(self.current).unwrap_or(0);
        self.current = serials[(pos + serials.len() - 1) % serials.len()];
        debug!(serial = self.current, "navigated backward");
        self.current
    }

    /// Pull the current serial back into the index after a rebuild
    /// removed it. Snaps to the first entry.
    pub fn snap_to(&mut self, index: &CategorySerialIndex) {
        if !index.is_empty() && !index.contains(self.current) {
            if let Some(first) = index.first() {
                debug!(from = self.current, to = first, "snapped to first serial");
                self.current = first;
            }
        }
    }
}
