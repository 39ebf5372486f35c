//! In-memory notification list

use crate::types::Notification;
use std::collections::{HashSet, VecDeque};

/// Ordered, deduplicated notifications plus the unread counter.
///
/// Pushed notifications are kept newest first. The bulk fetch replaces the
/// whole list and its order is taken as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFeed {
    items: VecDeque<Notification>,
    ids: HashSet<i64>,
    unread: u64,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<Notification> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub const fn unread_count(&self) -> u64 {
        self.unread
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn get(&self, id: i64) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    /// Replace everything with a server snapshot. Repeated ids keep their first occurrence.
    pub fn reset(&mut self, items: Vec<Notification>, unread: u64) {
        self.items.clear();
        self.ids.clear();
        for item in items {
            if self.ids.insert(item.id) {
                self.items.push_back(item);
            }
        }
        self.unread = unread;
    }

    /// Drop all state. Returns whether anything changed.
    pub fn clear(&mut self) -> bool {
        let changed = !self.items.is_empty() || self.unread > 0;
        self.items.clear();
        self.ids.clear();
        self.unread = 0;
        changed
    }

    /// Record a pushed notification. Redeliveries of a known id are ignored.
    pub fn push(&mut self, notification: Notification) -> bool {
        if !self.ids.insert(notification.id) {
            return false;
        }
        self.items.push_front(notification);
        self.unread += 1;
        true
    }

    /// Apply a confirmed read of one notification, in place.
    ///
    /// The backend only confirms reads of unread notifications, so the counter
    /// always drops by one. The local entry is replaced by the server copy when
    /// one is given, and is marked read either way.
    pub fn mark_read(&mut self, id: i64, confirmed: Option<Notification>) -> bool {
        let before = self.unread;
        self.unread = self.unread.saturating_sub(1);

        let Some(slot) = self.items.iter_mut().find(|n| n.id == id) else {
            return before != self.unread;
        };
        let mut updated = match confirmed {
            Some(server) if server.id == id => server,
            _ => slot.clone(),
        };
        updated.read = true;

        let changed = *slot != updated;
        *slot = updated;
        changed || before != self.unread
    }

    /// Apply a confirmed read of everything
    pub fn mark_all_read(&mut self) -> bool {
        let changed = self.unread > 0 || self.items.iter().any(|n| !n.read);
        for item in &mut self.items {
            item.read = true;
        }
        self.unread = 0;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn notification(id: i64, read: bool) -> Notification {
        Notification {
            id,
            user_id: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            title: format!("title {id}"),
            body: format!("body {id}"),
            read,
        }
    }

    #[test]
    fn test_push_is_idempotent() {
        let mut feed = NotificationFeed::new();
        assert!(feed.push(notification(5, false)));
        assert!(!feed.push(notification(5, false)));

        assert_eq!(feed.iter().filter(|n| n.id == 5).count(), 1);
        assert_eq!(feed.unread_count(), 1);
    }

    #[test]
    fn test_push_prepends_newest_first() {
        let mut feed = NotificationFeed::new();
        feed.reset(vec![notification(1, true)], 0);
        feed.push(notification(2, false));
        feed.push(notification(3, false));

        let ids: Vec<i64> = feed.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(feed.unread_count(), 2);
    }

    #[test]
    fn test_reset_tracks_ids_for_later_pushes() {
        let mut feed = NotificationFeed::new();
        feed.reset(vec![notification(1, false), notification(2, false), notification(1, true)], 2);
        assert_eq!(feed.len(), 2);

        assert!(!feed.push(notification(2, false)));
        assert_eq!(feed.unread_count(), 2);
    }

    #[test]
    fn test_mark_read_in_place() {
        let mut feed = NotificationFeed::new();
        feed.reset(vec![notification(1, false), notification(2, false), notification(3, false)], 3);

        assert!(feed.mark_read(2, None));
        let ids: Vec<(i64, bool)> = feed.iter().map(|n| (n.id, n.read)).collect();
        assert_eq!(ids, vec![(1, false), (2, true), (3, false)]);
        assert_eq!(feed.unread_count(), 2);
    }

    #[test]
    fn test_mark_read_decrements_for_locally_read_entry() {
        let mut feed = NotificationFeed::new();
        feed.reset(vec![notification(1, true)], 3);

        assert!(feed.mark_read(1, None));
        assert_eq!(feed.unread_count(), 2);
        assert!(feed.get(1).unwrap().read);
    }

    #[test]
    fn test_mark_read_takes_server_copy() {
        let mut feed = NotificationFeed::new();
        feed.reset(vec![notification(1, false), notification(2, false)], 2);

        let mut server = notification(2, true);
        server.title = "updated".to_string();
        server.user_id = Some(9);
        assert!(feed.mark_read(2, Some(server)));

        let entry = feed.get(2).unwrap();
        assert_eq!(entry.title, "updated");
        assert_eq!(entry.user_id, Some(9));
        assert!(entry.read);
        assert_eq!(feed.unread_count(), 1);
        let ids: Vec<i64> = feed.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_mark_read_forces_read_on_server_copy() {
        let mut feed = NotificationFeed::new();
        feed.reset(vec![notification(4, false)], 1);

        assert!(feed.mark_read(4, Some(notification(4, false))));
        assert!(feed.get(4).unwrap().read);
        assert_eq!(feed.unread_count(), 0);
    }

    #[test]
    fn test_unread_count_never_goes_negative() {
        let mut feed = NotificationFeed::new();
        feed.reset(vec![notification(1, false)], 0);
        feed.mark_read(1, None);
        assert!(!feed.mark_read(42, None));
        assert_eq!(feed.unread_count(), 0);
    }

    #[test]
    fn test_mark_all_read() {
        let mut feed = NotificationFeed::new();
        feed.reset(vec![notification(1, false), notification(2, true)], 7);
        feed.push(notification(3, false));

        feed.mark_all_read();
        assert_eq!(feed.unread_count(), 0);
        assert!(feed.iter().all(|n| n.read));
    }

    #[test]
    fn test_clear_reports_change() {
        let mut feed = NotificationFeed::new();
        assert!(!feed.clear());
        feed.push(notification(1, false));
        assert!(feed.clear());
        assert!(feed.is_empty());
        assert!(!feed.contains(1));
    }
}
