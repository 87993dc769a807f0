use chrono::{DateTime, Utc};

use crate::models::TemplateRecord;

/// Sorted, de-duplicated ascending serial numbers valid for the active
/// scope. Rebuilt whenever the (category, religion) scope changes.
#[derive(Debug, Clone)]
pub struct CategorySerialIndex {
    serials: Vec<u32>,
    refreshed_at: DateTime<Utc>,
}

impl Default for CategorySerialIndex {
    /// An index that has never been built. Unlike `rebuild`, this is
    /// genuinely empty so the navigator treats it as "nothing to do".
    fn default() -> Self {
        Self {
            serials: Vec::new(),
            refreshed_at: Utc::now(),
        }
    }
}

impl CategorySerialIndex {
    /// Build the index from a full category record list: extract every
    /// serial, dedupe, sort ascending. An empty fetch degrades to `[1]`
    /// so navigation keeps a defined position.
    pub fn rebuild(records: &[TemplateRecord]) -> Self {
        let mut serials: Vec<u32> = records.iter().map(|r| r.serial_no).collect();
        serials.sort_unstable();
        serials.dedup();
        if serials.is_empty() {
            serials.push(1);
        }
        Self {
            serials,
            refreshed_at: Utc::now(),
        }
    }

    pub fn serials(&self) -> &[u32] {
        &self.serials
    }

    pub fn len(&self) -> usize {
        self.serials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.serials.is_empty()
    }

    /// Serial count for progress display, never less than 1.
    pub fn total_serials(&self) -> usize {
        self.serials.len().max(1)
    }

    pub fn contains(&self, serial: u32) -> bool {
        self.serials.binary_search(&serial).is_ok()
    }

    pub fn first(&self) -> Option<u32> {
        self.serials.first().copied()
    }

    pub fn position_of(&self, serial: u32) -> Option<usize> {
        self.serials.binary_search(&serial).ok()
    }

    pub fn refreshed_at(&self) -> DateTime<Utc> {
        self.refreshed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TemplateMedia;

    fn rec(serial: u32) -> TemplateRecord {
        TemplateRecord {
            id: format!("t{serial}"),
            serial_no: serial,
            category: "congratulations".to_string(),
            subcategory: "congratulations".to_string(),
            religion: "hindu".to_string(),
            media: TemplateMedia::Image {
                url: format!("https://cdn.example.com/t/{serial}.jpg"),
            },
            photo_container_axis: None,
            text_container_axis: None,
            ratio: "9:16".to_string(),
        }
    }

    #[test]
    fn rebuild_sorts_and_dedupes() {
        let records: Vec<_> = [7, 3, 3, 9, 1].into_iter().map(rec).collect();
        let index = CategorySerialIndex::rebuild(&records);
        assert_eq!(index.serials(), &[1, 3, 7, 9]);
        assert_eq!(index.total_serials(), 4);
    }

    #[test]
    fn empty_fetch_degrades_to_single_serial() {
        let index = CategorySerialIndex::rebuild(&[]);
        assert_eq!(index.serials(), &[1]);
        assert_eq!(index.total_serials(), 1);
    }

    #[test]
    fn membership_and_position() {
        let records: Vec<_> = [1, 3, 7, 9].into_iter().map(rec).collect();
        let index = CategorySerialIndex::rebuild(&records);
        assert!(index.contains(7));
        assert!(!index.contains(5));
        assert_eq!(index.position_of(3), Some(1));
        assert_eq!(index.first(), Some(1));
    }

    #[test]
    fn default_index_is_truly_empty() {
        let index = CategorySerialIndex::default();
        assert!(index.is_empty());
        assert_eq!(index.total_serials(), 1);
    }
}
