use super::DetectedCode;
use indexmap::IndexMap;

/// Key of one ResultSet slot. Decoded codes are keyed by payload so no two
/// entries can share one; absent-payload entries get their own serial key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EntryKey {
    Payload(String),
    Unreadable(usize),
}

/// Insertion-ordered, payload-unique collection of detections
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    entries: IndexMap<EntryKey, DetectedCode>,
    next_unreadable: usize,
    unique: usize,
}

impl ResultSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries, readable or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was found
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct decoded payloads
    pub fn unique_payloads(&self) -> usize {
        self.unique
    }

    /// Whether `payload` has already been accepted
    pub fn contains_payload(&self, payload: &str) -> bool {
        self.entries.contains_key(&EntryKey::Payload(payload.to_owned()))
    }

    /// Entry for a decoded payload
    pub fn get(&self, payload: &str) -> Option<&DetectedCode> {
        self.entries.get(&EntryKey::Payload(payload.to_owned()))
    }

    /// True when at least one located code could not be decoded
    pub fn has_unreadable(&self) -> bool {
        self.entries.len() > self.unique
    }

    /// Entries in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &DetectedCode> {
        self.entries.values()
    }

    /// Decoded payloads in discovery order
    pub fn payloads(&self) -> Vec<&str> {
        self.iter().filter_map(|c| c.payload.as_deref()).collect()
    }

    /// Append a decoded code unless its payload was seen before (first wins).
    /// Codes without a payload are rejected here.
    pub(crate) fn insert_decoded(&mut self, code: DetectedCode) -> bool {
        let Some(payload) = code.payload.clone() else {
            return false;
        };
        let key = EntryKey::Payload(payload);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, code);
        self.unique += 1;
        true
    }

    /// Append an absent-payload entry
    pub(crate) fn insert_unreadable(&mut self, code: DetectedCode) {
        let key = EntryKey::Unreadable(self.next_unreadable);
        self.next_unreadable += 1;
        self.entries.insert(key, code);
    }

    /// Drop absent-payload entries matching `predicate`, keeping order
    pub(crate) fn remove_unreadable_where(&mut self, mut predicate: impl FnMut(&DetectedCode) -> bool) {
        self.entries
            .retain(|key, code| !(matches!(key, EntryKey::Unreadable(_)) && predicate(code)));
    }
}

impl IntoIterator for ResultSet {
    type Item = DetectedCode;
    type IntoIter = std::vec::IntoIter<DetectedCode>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values().collect::<Vec<_>>().into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a DetectedCode;
    type IntoIter = Box<dyn Iterator<Item = &'a DetectedCode> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.entries.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;
    use image::RgbImage;

    fn code(payload: Option<&str>, x: u32) -> DetectedCode {
        DetectedCode {
            payload: payload.map(str::to_owned),
            rect: BoundingBox::new(x, 0, 10, 10),
            crop: RgbImage::new(1, 1),
        }
    }

    #[test]
    fn test_first_payload_wins() {
        let mut set = ResultSet::new();
        assert!(set.insert_decoded(code(Some("A"), 0)));
        assert!(!set.insert_decoded(code(Some("A"), 50)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("A").unwrap().rect.x, 0);
    }

    #[test]
    fn test_unreadable_entries_are_not_unique_keyed() {
        let mut set = ResultSet::new();
        set.insert_unreadable(code(None, 0));
        set.insert_unreadable(code(None, 20));
        assert_eq!(set.len(), 2);
        assert_eq!(set.unique_payloads(), 0);
        assert!(set.has_unreadable());
        assert!(!set.insert_decoded(code(None, 40)));
    }

    #[test]
    fn test_order_is_preserved() {
        let mut set = ResultSet::new();
        set.insert_decoded(code(Some("C"), 0));
        set.insert_unreadable(code(None, 10));
        set.insert_decoded(code(Some("A"), 20));
        assert_eq!(set.payloads(), vec!["C", "A"]);

        set.remove_unreadable_where(|c| c.rect.x == 10);
        assert!(!set.has_unreadable());
        let xs: Vec<u32> = set.iter().map(|c| c.rect.x).collect();
        assert_eq!(xs, vec![0, 20]);
    }

    #[test]
    fn test_payload_lookup_between_absent_entries() {
        let mut set = ResultSet::new();
        set.insert_unreadable(code(None, 0));
        set.insert_decoded(code(Some("B"), 10));
        set.insert_unreadable(code(None, 20));
        set.insert_decoded(code(Some("A"), 30));

        assert!(set.contains_payload("A") && set.contains_payload("B"));
        assert!(!set.contains_payload("C"));
        assert_eq!(set.get("A").unwrap().rect.x, 30);
        assert_eq!(set.unique_payloads(), 2);
        let xs: Vec<u32> = set.into_iter().map(|c| c.rect.x).collect();
        assert_eq!(xs, vec![0, 10, 20, 30]);
    }
}
