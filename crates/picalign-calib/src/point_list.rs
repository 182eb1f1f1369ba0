use std::ops::Index;

use glam::DVec2;

/// The length of an [`ObservableList`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeChange {
    /// Length before the mutation.
    pub old_len: usize,
    /// Length after the mutation.
    pub new_len: usize,
}

/// Handle returned by [`ObservableList::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(SizeChange) + Send>;

/// An ordered sequence that reports length changes to registered listeners.
///
/// Listeners run synchronously inside the mutating call, in registration order.
pub struct ObservableList<T> {
    items: Vec<T>,
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

/// Ordered list of up to three calibration points.
pub type PointList = ObservableList<DVec2>;

impl<T> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableList")
            .field("items", &self.items)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<T> ObservableList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty list with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Registers a listener called after every length change.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(SizeChange) + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    /// Removes all listeners.
    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Number of registered listeners.
    pub fn num_listeners(&self) -> usize {
        self.listeners.len()
    }

    /// Appends an item.
    pub fn push(&mut self, item: T) {
        let old_len = self.items.len();
        self.items.push(item);
        self.notify(old_len);
    }

    /// Inserts an item at `index`.
    ///
    /// PRECONDITION: `index <= len()`.
    pub fn insert(&mut self, index: usize, item: T) {
        let old_len = self.items.len();
        self.items.insert(index, item);
        self.notify(old_len);
    }

    /// Appends all items of an iterator, notifying once if any were added.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        let old_len = self.items.len();
        self.items.extend(items);
        self.notify(old_len);
    }

    /// Removes and returns the item at `index`, or `None` if out of bounds.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        let old_len = self.items.len();
        let item = self.items.remove(index);
        self.notify(old_len);
        Some(item)
    }

    /// Removes all items.
    pub fn clear(&mut self) {
        let old_len = self.items.len();
        self.items.clear();
        self.notify(old_len);
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// The items as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterates over the items.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    fn notify(&mut self, old_len: usize) {
        let new_len = self.items.len();
        if new_len == old_len {
            return;
        }
        let change = SizeChange { old_len, new_len };
        for (_, listener) in self.listeners.iter_mut() {
            listener(change);
        }
    }
}

impl<T: PartialEq> ObservableList<T> {
    /// Removes the first item equal to `item`. Returns `false` if there is none.
    pub fn remove_item(&mut self, item: &T) -> bool {
        match self.items.iter().position(|i| i == item) {
            Some(index) => self.remove(index).is_some(),
            None => false,
        }
    }

    /// Replaces the first item equal to `old`. The length does not change.
    pub fn replace_item(&mut self, old: &T, new: T) -> bool {
        match self.items.iter_mut().find(|i| **i == *old) {
            Some(slot) => {
                *slot = new;
                true
            }
            None => false,
        }
    }
}

impl<T> Index<usize> for ObservableList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a ObservableList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording(list: &mut PointList) -> (ListenerId, Arc<Mutex<Vec<SizeChange>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let id = list.subscribe(move |change| sink.lock().unwrap().push(change));
        (id, events)
    }

    #[test]
    fn test_push_and_remove_notify() {
        let mut list = PointList::with_capacity(3);
        let (_, events) = recording(&mut list);

        list.push(DVec2::new(1.0, 2.0));
        list.push(DVec2::new(3.0, 4.0));
        assert!(list.remove_item(&DVec2::new(1.0, 2.0)));
        assert!(!list.remove_item(&DVec2::new(9.0, 9.0)));

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                SizeChange { old_len: 0, new_len: 1 },
                SizeChange { old_len: 1, new_len: 2 },
                SizeChange { old_len: 2, new_len: 1 },
            ]
        );
        assert_eq!(list.as_slice(), &[DVec2::new(3.0, 4.0)]);
    }

    #[test]
    fn test_clear_and_extend_notify_once() {
        let mut list = PointList::new();
        let (_, events) = recording(&mut list);

        list.extend([DVec2::ZERO, DVec2::ONE, DVec2::X]);
        list.clear();
        // clearing an empty list is not a size change
        list.clear();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                SizeChange { old_len: 0, new_len: 3 },
                SizeChange { old_len: 3, new_len: 0 },
            ]
        );
    }

    #[test]
    fn test_replace_does_not_notify() {
        let mut list = PointList::new();
        list.push(DVec2::ZERO);
        let (_, events) = recording(&mut list);

        assert!(list.replace_item(&DVec2::ZERO, DVec2::ONE));
        assert_eq!(list[0], DVec2::ONE);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unsubscribe() {
        let mut list = PointList::new();
        let (id, events) = recording(&mut list);
        let (_, other) = recording(&mut list);
        assert_eq!(list.num_listeners(), 2);

        assert!(list.unsubscribe(id));
        assert!(!list.unsubscribe(id));
        list.insert(0, DVec2::ZERO);

        assert!(events.lock().unwrap().is_empty());
        assert_eq!(other.lock().unwrap().len(), 1);

        list.clear_listeners();
        list.push(DVec2::ONE);
        assert_eq!(other.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_out_of_bounds() {
        let mut list = PointList::new();
        assert!(list.remove(0).is_none());
        assert!(list.is_empty());
    }
}
