//! FIFO queue of pending encode jobs.
//!
//! Items stay here until the supervisor pops them. Every mutation takes the
//! same lock as [`JobQueue::pop_front`], so positional operations never race
//! with the supervisor advancing to the next job.

use std::collections::VecDeque;

use ffb_core::{Error, QueueItem, QueueItemId, QueueItemStatus, Result};
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct JobQueue {
    items: Mutex<VecDeque<QueueItem>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item and return its position.
    ///
    /// Only fresh items are accepted; an item that already ran (for example
    /// a clone taken from history) is refused with [`Error::Validation`].
    pub fn add(&self, item: QueueItem) -> Result<usize> {
        if item.status() != QueueItemStatus::Queued {
            return Err(Error::Validation(format!(
                "item {} is {:?}, only queued items can be added",
                item.id,
                item.status()
            )));
        }
        let mut items = self.items.lock();
        tracing::debug!(item_id = %item.id, position = items.len(), "Item queued");
        items.push_back(item);
        Ok(items.len() - 1)
    }

    /// Drop the item at `index`.
    pub fn remove(&self, index: usize) -> Result<()> {
        self.take(index).map(|item| {
            tracing::debug!(item_id = %item.id, "Item removed from queue");
        })
    }

    /// Remove and return the item at `index`.
    pub fn take(&self, index: usize) -> Result<QueueItem> {
        let mut items = self.items.lock();
        let len = items.len();
        items
            .remove(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    /// Position of the item with `id`, if it is still queued.
    pub fn position(&self, id: QueueItemId) -> Option<usize> {
        self.items.lock().iter().position(|item| item.id == id)
    }

    pub fn clear(&self) {
        let mut items = self.items.lock();
        if !items.is_empty() {
            tracing::debug!(count = items.len(), "Queue cleared");
        }
        items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Snapshot of the queued items, head first.
    pub fn items(&self) -> Vec<QueueItem> {
        self.items.lock().iter().cloned().collect()
    }

    /// Pop the head of the queue.
    pub fn pop_front(&self) -> Option<QueueItem> {
        self.items.lock().pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ffb_core::MediaDescriptor;

    fn item(name: &str) -> QueueItem {
        QueueItem::single(
            MediaDescriptor::new(format!("{name}.mov")),
            MediaDescriptor::new(format!("{name}.mp4")),
        )
    }

    #[test]
    fn fifo_order() {
        let queue = JobQueue::new();
        let a = item("a");
        let b = item("b");
        let (a_id, b_id) = (a.id, b.id);

        assert_eq!(queue.add(a).unwrap(), 0);
        assert_eq!(queue.add(b).unwrap(), 1);
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop_front().unwrap().id, a_id);
        assert_eq!(queue.pop_front().unwrap().id, b_id);
        assert!(queue.pop_front().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn take_by_index() {
        let queue = JobQueue::new();
        queue.add(item("a")).unwrap();
        let b = item("b");
        let b_id = b.id;
        queue.add(b).unwrap();
        queue.add(item("c")).unwrap();

        assert_eq!(queue.position(b_id), Some(1));
        let taken = queue.take(1).unwrap();
        assert_eq!(taken.id, b_id);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.position(b_id), None);
    }

    #[test]
    fn out_of_range_is_an_error() {
        let queue = JobQueue::new();
        queue.add(item("a")).unwrap();

        assert_matches!(
            queue.remove(3),
            Err(Error::IndexOutOfRange { index: 3, len: 1 })
        );
        assert_matches!(queue.take(1), Err(Error::IndexOutOfRange { .. }));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn items_that_already_ran_are_refused() {
        let queue = JobQueue::new();
        let mut started = item("a");
        started.advance(QueueItemStatus::InProgress);
        assert_matches!(queue.add(started.clone()), Err(Error::Validation(_)));

        started.advance(QueueItemStatus::Finished);
        assert_matches!(queue.add(started), Err(Error::Validation(_)));
        assert!(queue.is_empty());
    }

    #[test]
    fn clear_empties_queue() {
        let queue = JobQueue::new();
        queue.add(item("a")).unwrap();
        queue.add(item("b")).unwrap();
        queue.clear();
        assert!(queue.items().is_empty());
    }
}
