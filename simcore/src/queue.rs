use std::collections::VecDeque;

use crate::{Error, Result};

/// Binary min-heap of pending events.
///
/// Events are ordered by their [`Ord`] implementation: the one comparing least is returned
/// first. The ordering must be total, otherwise events scheduled at the same time would be
/// processed in an unspecified order.
///
/// By default, the queue grows as needed. A bounded queue can be created with
/// [`EventQueue::bounded`], in which case inserting into a full queue fails.
///
/// # Examples
///
/// ```
/// # use simcore::{Error, EventQueue};
/// let mut queue = EventQueue::bounded(2);
/// assert!(queue.insert(3).is_ok());
/// assert!(queue.insert(1).is_ok());
/// assert_eq!(queue.insert(2), Err(Error::CapacityExceeded { capacity: 2 }));
/// assert_eq!(queue.extract_min(), Ok(1));
/// assert_eq!(queue.extract_min(), Ok(3));
/// assert_eq!(queue.extract_min(), Err(Error::EmptyQueue));
/// ```
#[derive(Debug, Clone)]
pub struct EventQueue<E> {
    heap: Vec<E>,
    capacity: Option<usize>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self {
            heap: Vec::new(),
            capacity: None,
        }
    }
}

impl<E: Ord> EventQueue<E> {
    /// Creates a queue that can hold at most `capacity` events at a time.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    /// Inserts a new event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if the queue is bounded and full.
    pub fn insert(&mut self, event: E) -> Result<()> {
        if let Some(capacity) = self.capacity {
            if self.heap.len() >= capacity {
                return Err(Error::CapacityExceeded { capacity });
            }
        }
        self.heap.push(event);
        self.sift_up(self.heap.len() - 1);
        Ok(())
    }

    /// Removes and returns the least event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyQueue`] if there are no events.
    pub fn extract_min(&mut self) -> Result<E> {
        if self.heap.is_empty() {
            return Err(Error::EmptyQueue);
        }
        let min = self.heap.swap_remove(0);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Ok(min)
    }

    /// Returns a reference to the least event without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyQueue`] if there are no events.
    pub fn peek_min(&self) -> Result<&E> {
        self.heap.first().ok_or(Error::EmptyQueue)
    }

    /// Checks if there are no pending events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns the bound of the queue, or `None` if it is unbounded.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[index] < self.heap[parent] {
                self.heap.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;
            if left < len && self.heap[left] < self.heap[smallest] {
                smallest = left;
            }
            if right < len && self.heap[right] < self.heap[smallest] {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.heap.swap(index, smallest);
            index = smallest;
        }
    }
}

/// Abstraction over [`VecDeque`] that allows to limit the capacity of the queue.
/// This means that push operations can fail.
/// By default, the capacity is equal to [`usize::MAX`], which makes unlimited in practice.
///
/// # Examples
///
/// ```
/// # use simcore::Fifo;
/// let mut queue: Fifo<i32> = Fifo::default();
/// assert!(queue.push_back(1).is_ok()); // Always succeeds
///
/// let mut queue: Fifo<i32> = Fifo::bounded(2);
/// assert!(queue.push_back(1).is_ok());
/// assert!(queue.push_back(2).is_ok());
/// assert_eq!(queue.push_back(3), Err(3));
/// ```
#[derive(Debug, Clone)]
pub struct Fifo<T> {
    inner: VecDeque<T>,
    capacity: usize,
}

impl<T> Default for Fifo<T> {
    fn default() -> Self {
        Self {
            inner: VecDeque::default(),
            capacity: usize::MAX,
        }
    }
}

impl<T> Fifo<T> {
    /// Creates a queue with the given capacity.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            inner: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an element to the back of the `Fifo`.
    ///
    /// # Errors
    ///
    /// Gives the element back if the queue is full.
    pub fn push_back(&mut self, value: T) -> std::result::Result<(), T> {
        if self.inner.len() < self.capacity {
            self.inner.push_back(value);
            Ok(())
        } else {
            Err(value)
        }
    }

    /// Removes the first element and returns it, or `None` if the `Fifo` is empty.
    pub fn pop_front(&mut self) -> Option<T> {
        self.inner.pop_front()
    }

    /// Returns a reference to the first element, or `None` if the `Fifo` is empty.
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.inner.front()
    }

    /// Returns the number of elements in the `Fifo`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Checks if the `Fifo` is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates from the front to the back of the queue.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.inner.iter()
    }
}

/// Last-in, first-out stack.
///
/// # Examples
///
/// ```
/// # use simcore::Stack;
/// let mut stack = Stack::default();
/// stack.push("A");
/// stack.push("B");
/// assert_eq!(stack.peek(), Some(&"B"));
/// assert_eq!(stack.pop(), Some("B"));
/// assert_eq!(stack.pop(), Some("A"));
/// assert_eq!(stack.pop(), None);
/// ```
#[derive(Debug, Clone)]
pub struct Stack<T> {
    inner: Vec<T>,
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self { inner: Vec::new() }
    }
}

impl<T> Stack<T> {
    /// Puts `value` on top of the stack.
    pub fn push(&mut self, value: T) {
        self.inner.push(value);
    }

    /// Removes the top element and returns it, or `None` if the stack is empty.
    pub fn pop(&mut self) -> Option<T> {
        self.inner.pop()
    }

    /// Returns a reference to the top element.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.inner.last()
    }

    /// Returns the number of elements on the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Checks if the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates from the top to the bottom of the stack.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.inner.iter().rev()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use quickcheck_macros::quickcheck;
    use rstest::rstest;

    #[test]
    fn test_empty_queue() {
        let mut queue = EventQueue::<u32>::default();
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), None);
        assert_eq!(queue.peek_min(), Err(Error::EmptyQueue));
        assert_eq!(queue.extract_min(), Err(Error::EmptyQueue));
    }

    #[test]
    fn test_bounded_queue() {
        let mut queue = EventQueue::bounded(2);
        assert_eq!(queue.capacity(), Some(2));
        queue.insert(5).unwrap();
        queue.insert(4).unwrap();
        assert_eq!(
            queue.insert(3),
            Err(Error::CapacityExceeded { capacity: 2 })
        );
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.extract_min(), Ok(4));
        queue.insert(3).unwrap();
        assert_eq!(queue.peek_min(), Ok(&3));
        assert_eq!(queue.len(), 2);
    }

    #[rstest(
        input,
        case(vec![]),
        case(vec![1]),
        case(vec![2, 1]),
        case(vec![5, 3, 8, 1, 9, 2, 7]),
        case(vec![4, 4, 1, 4, 0, 0])
    )]
    fn test_extract_in_order(input: Vec<u32>) {
        let mut queue = EventQueue::default();
        for &value in &input {
            queue.insert(value).unwrap();
        }
        let mut expected = input;
        expected.sort_unstable();
        let extracted: Vec<_> = std::iter::from_fn(|| queue.extract_min().ok()).collect();
        assert_eq!(extracted, expected);
    }

    #[quickcheck]
    fn extracts_sorted(input: Vec<(u8, u16)>) -> bool {
        let mut queue = EventQueue::default();
        for &value in &input {
            queue.insert(value).unwrap();
        }
        let mut expected = input;
        expected.sort_unstable();
        let extracted: Vec<_> = std::iter::from_fn(|| queue.extract_min().ok()).collect();
        extracted == expected
    }

    #[quickcheck]
    fn peek_is_min(input: Vec<i32>) -> bool {
        let mut queue = EventQueue::default();
        for &value in &input {
            queue.insert(value).unwrap();
        }
        queue.peek_min().ok() == input.iter().min()
    }

    #[quickcheck]
    fn stack_reverses(input: Vec<u32>) -> bool {
        let mut stack = Stack::default();
        for &value in &input {
            stack.push(value);
        }
        let popped: Vec<_> = std::iter::from_fn(|| stack.pop()).collect();
        popped.into_iter().eq(input.into_iter().rev())
    }

    #[quickcheck]
    fn fifo_preserves_order(input: Vec<u32>) -> bool {
        let mut queue = Fifo::default();
        for &value in &input {
            queue.push_back(value).unwrap();
        }
        let popped: Vec<_> = std::iter::from_fn(|| queue.pop_front()).collect();
        popped == input
    }

    #[test]
    fn test_stack_iter_top_to_bottom() {
        let mut stack = Stack::default();
        stack.push(1);
        stack.push(2);
        stack.push(3);
        assert_eq!(stack.iter().copied().collect::<Vec<_>>(), vec![3, 2, 1]);
        assert_eq!(stack.len(), 3);
    }

    #[test]
    fn test_bounded_fifo() {
        let mut queue = Fifo::bounded(2);
        assert!(queue.push_back("A").is_ok());
        assert!(queue.push_back("B").is_ok());
        assert_eq!(queue.push_back("C"), Err("C"));
        assert_eq!(queue.front(), Some(&"A"));
        assert_eq!(queue.pop_front(), Some("A"));
        assert_eq!(queue.pop_front(), Some("B"));
        assert_eq!(queue.pop_front(), None);
        assert!(queue.is_empty());
    }
}
