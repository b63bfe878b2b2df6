//! Lazily evaluated entity sequences.

use std::fmt;

/// A composable, lazily evaluated sequence of `T`.
///
/// Nothing is pulled from the source until the queryable is iterated or
/// materialized with [`Queryable::to_list`]. Composition (`filter`, `map`,
/// `skip`, `take`) only wraps the underlying iterator.
pub struct Queryable<T> {
    items: Box<dyn Iterator<Item = T> + Send>,
}

impl<T: Send + 'static> Queryable<T> {
    /// Wraps any sendable iterator source.
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self {
            items: Box::new(items.into_iter()),
        }
    }

    /// A queryable that yields nothing.
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// Keeps the items matching `predicate`.
    pub fn filter<F>(self, mut predicate: F) -> Self
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        Self {
            items: Box::new(self.items.filter(move |item| predicate(item))),
        }
    }

    pub fn map<U, F>(self, f: F) -> Queryable<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        Queryable {
            items: Box::new(self.items.map(f)),
        }
    }

    pub fn filter_map<U, F>(self, f: F) -> Queryable<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> Option<U> + Send + 'static,
    {
        Queryable {
            items: Box::new(self.items.filter_map(f)),
        }
    }

    pub fn skip(self, n: usize) -> Self {
        Self {
            items: Box::new(self.items.skip(n)),
        }
    }

    pub fn take(self, n: usize) -> Self {
        Self {
            items: Box::new(self.items.take(n)),
        }
    }

    /// Evaluates the query and collects the results.
    pub fn to_list(self) -> Vec<T> {
        self.items.collect()
    }
}

impl<T> IntoIterator for Queryable<T> {
    type Item = T;
    type IntoIter = Box<dyn Iterator<Item = T> + Send>;

    fn into_iter(self) -> Self::IntoIter {
        self.items
    }
}

impl<T: Send + 'static> From<Vec<T>> for Queryable<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> fmt::Debug for Queryable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queryable").finish_non_exhaustive()
    }
}
