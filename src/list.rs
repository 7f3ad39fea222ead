use std::{marker::PhantomData, ptr::NonNull};


/// Non-null pointer to `T`.
pub(crate) type Link<T> = Option<NonNull<T>>;

pub(crate) struct Node<T> {
    /// Pointer to the next node of the list
    pub next: Link<Self>,
    /// Element of the node
    pub data: T,
}

/// Append-only singly linked list whose nodes live in memory the list does not
/// own (region descriptors acquired from a backend). Nodes are ordered by
/// insertion time, the list is never cyclic and it never frees anything:
/// whoever wrote a node is responsible for releasing it (see [`List::pop_front`]).
pub(crate) struct List<T> {
    head: Link<Node<T>>,
    tail: Link<Node<T>>,
    len: usize,
    marker: PhantomData<T>,
}

pub(crate) struct Iter<'a, T> {
    current: Link<Node<T>>,
    remaining: usize,
    marker: PhantomData<&'a T>,
}

impl<T> List<T> {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
            marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn first(&self) -> Link<Node<T>> {
        self.head
    }

    #[inline]
    pub fn last(&self) -> Link<Node<T>> {
        self.tail
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends a node to the Linked List.
    ///
    /// The list never allocates by itself: the node was already written by
    /// whoever acquired its memory from a [`crate::Backend`], so it is placed
    /// exactly where the allocator wants it.
    ///
    /// **SAFETY**: `node` must point to an initialized, suitably aligned
    /// `Node<T>` that is not a member of any list and stays valid until it is
    /// taken back out with [`List::pop_front`].
    pub unsafe fn append(&mut self, mut node: NonNull<Node<T>>) {
        unsafe {
            node.as_mut().next = None;

            if let Some(mut tail) = self.tail {
                tail.as_mut().next = Some(node);
            } else {
                self.head = Some(node);
            }
        }

        self.tail = Some(node);
        self.len += 1;
    }

    /// Unlinks and returns the first node. Its memory is handed back to the
    /// caller, who now owns it again.
    pub fn pop_front(&mut self) -> Link<Node<T>> {
        let node = self.head?;

        unsafe {
            self.head = node.as_ref().next;
        }

        if self.head.is_none() {
            self.tail = None;
        }

        self.len -= 1;

        Some(node)
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            current: self.head,
            remaining: self.len,
            marker: PhantomData,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;

        unsafe {
            self.current = node.as_ref().next;
            self.remaining -= 1;

            Some(&node.as_ref().data)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::MaybeUninit;

    #[test]
    fn new_list_is_empty() {
        let list: List<u8> = List::new();

        assert_eq!(list.len, 0);
        assert!(list.is_empty());
        assert!(list.first().is_none());
        assert!(list.last().is_none());
        assert!(list.iter().next().is_none());
    }

    #[test]
    fn append_keeps_insertion_order() {
        let mut storage: [MaybeUninit<Node<u32>>; 3] = [const { MaybeUninit::uninit() }; 3];
        let mut list = List::new();

        for (value, slot) in storage.iter_mut().enumerate() {
            let node = NonNull::from(slot.write(Node { next: None, data: value as u32 * 10 }));
            unsafe { list.append(node) };
        }

        assert_eq!(list.len(), 3);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![0, 10, 20]);
        assert_eq!(list.iter().size_hint(), (3, Some(3)));

        unsafe {
            assert_eq!(list.first().map(|node| node.as_ref().data), Some(0));
            assert_eq!(list.last().map(|node| node.as_ref().data), Some(20));
        }
    }

    #[test]
    fn pop_front_drains_the_list() {
        let mut storage: [MaybeUninit<Node<u32>>; 2] = [const { MaybeUninit::uninit() }; 2];
        let mut list = List::new();

        for (value, slot) in storage.iter_mut().enumerate() {
            let node = NonNull::from(slot.write(Node { next: None, data: value as u32 }));
            unsafe { list.append(node) };
        }

        let first = list.pop_front().map(|node| unsafe { node.as_ref().data });
        assert_eq!(first, Some(0));
        assert_eq!(list.len(), 1);

        let second = list.pop_front().map(|node| unsafe { node.as_ref().data });
        assert_eq!(second, Some(1));
        assert!(list.is_empty());
        assert!(list.last().is_none());
        assert!(list.pop_front().is_none());
    }
}
