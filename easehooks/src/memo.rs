use crate::compare::{deep_equal, DeepEqual};
use std::fmt;

type Comparator<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Holds the last value accepted by a comparator.
///
/// [`update`](MemoCell::update) only replaces the stored value when the
/// comparator reports that the incoming value differs, so the stored value
/// stays stable across updates that are merely equal. `revision` counts the
/// replacements and lets owners detect a change without comparing again.
pub struct MemoCell<T> {
    current: T,
    revision: u64,
    compare: Comparator<T>,
}

impl<T: DeepEqual + 'static> MemoCell<T> {
    /// Creates a cell compared with [`deep_equal`].
    pub fn new(initial: T) -> Self {
        Self::with_compare(initial, deep_equal::<T>)
    }
}

impl<T> MemoCell<T> {
    pub fn with_compare<C>(initial: T, compare: C) -> Self
    where
        C: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        MemoCell {
            current: initial,
            revision: 0,
            compare: Box::new(compare),
        }
    }

    pub fn update(&mut self, next: T) -> &T {
        if !(self.compare)(&self.current, &next) {
            self.current = next;
            self.revision += 1;
        }
        &self.current
    }

    pub fn get(&self) -> &T {
        &self.current
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn into_inner(self) -> T {
        self.current
    }
}

impl<T: fmt::Debug> fmt::Debug for MemoCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoCell")
            .field("current", &self.current)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}
