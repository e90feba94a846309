//! Query types
//!
//! A query is skip/limit pagination plus one of three shapes, in increasing
//! cost order: plain (slice the visible records directly), filtered (decode
//! metadata for every visible record, then predicate-filter), and ordered
//! (filter, then stable-sort by a comparator). One execution function on the
//! table dispatches over the shape.

use std::cmp::Ordering;

use crate::data::DataPlaceholder;

/// Metadata predicate for filtered queries
pub type Predicate<M> = Box<dyn Fn(&M) -> bool + Send>;

/// Metadata comparator for ordered queries
pub type Comparator<M> = Box<dyn Fn(&M, &M) -> Ordering + Send>;

/// The three query shapes
pub(crate) enum QueryKind<M> {
    Plain,
    Filtered(Predicate<M>),
    FilteredOrdered {
        filter: Option<Predicate<M>>,
        order: Comparator<M>,
    },
}

/// A select query over a table's visible (non-deleted) records
///
/// Built incrementally:
/// ```ignore
/// let q = Query::new().skip(10).limit(5).filter(|m: &u32| *m > 3).order();
/// ```
pub struct Query<M> {
    pub(crate) skip: Option<usize>,
    pub(crate) limit: Option<usize>,
    pub(crate) kind: QueryKind<M>,
}

impl<M> Default for Query<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Query<M> {
    /// A plain query returning every visible record
    pub fn new() -> Self {
        Self {
            skip: None,
            limit: None,
            kind: QueryKind::Plain,
        }
    }

    /// Skip the first `n` items of the (filtered, ordered) sequence
    ///
    /// Skipping past the end yields an empty result, not an error.
    pub fn skip(mut self, n: usize) -> Self {
        self.skip = Some(n);
        self
    }

    /// Cap the result at `n` items; absent means "to the end"
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Keep only records whose metadata satisfies the predicate
    ///
    /// A later call replaces an earlier predicate.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&M) -> bool + Send + 'static,
    {
        let predicate: Predicate<M> = Box::new(predicate);
        self.kind = match self.kind {
            QueryKind::Plain | QueryKind::Filtered(_) => QueryKind::Filtered(predicate),
            QueryKind::FilteredOrdered { order, .. } => QueryKind::FilteredOrdered {
                filter: Some(predicate),
                order,
            },
        };
        self
    }

    /// Stably sort the result by a comparator over metadata
    pub fn order_by<F>(mut self, comparator: F) -> Self
    where
        F: Fn(&M, &M) -> Ordering + Send + 'static,
    {
        let filter = match self.kind {
            QueryKind::Plain => None,
            QueryKind::Filtered(predicate) => Some(predicate),
            QueryKind::FilteredOrdered { filter, .. } => filter,
        };
        self.kind = QueryKind::FilteredOrdered {
            filter,
            order: Box::new(comparator),
        };
        self
    }

    /// Stably sort the result by the metadata's natural order
    pub fn order(self) -> Self
    where
        M: Ord + 'static,
    {
        self.order_by(M::cmp)
    }
}

/// One query result item: decoded metadata paired with a lazy payload
/// reference; payload bytes are never read during query execution.
pub struct QueryRow<M, R> {
    pub meta: M,
    pub data: DataPlaceholder<R>,
}

/// Slice a sequence by skip/limit
pub(crate) fn paginate<T>(mut items: Vec<T>, skip: usize, limit: Option<usize>) -> Vec<T> {
    if skip >= items.len() {
        return Vec::new();
    }

    let mut tail = items.split_off(skip);
    if let Some(limit) = limit {
        tail.truncate(limit);
    }
    tail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_skip_past_end_is_empty() {
        assert!(paginate(vec![1, 2, 3], 3, None).is_empty());
        assert!(paginate(Vec::<i32>::new(), 0, Some(5)).is_empty());
    }

    #[test]
    fn paginate_without_limit_runs_to_end() {
        assert_eq!(paginate(vec![1, 2, 3, 4], 1, None), vec![2, 3, 4]);
    }

    #[test]
    fn paginate_applies_limit_after_skip() {
        assert_eq!(paginate(vec![1, 2, 3, 4, 5], 1, Some(2)), vec![2, 3]);
        assert_eq!(paginate(vec![1, 2], 1, Some(10)), vec![2]);
    }

    #[test]
    fn order_after_filter_keeps_predicate() {
        let q = Query::<u32>::new().filter(|m| *m > 1).order();
        match q.kind {
            QueryKind::FilteredOrdered { filter, .. } => assert!(filter.is_some()),
            _ => panic!("expected ordered shape"),
        }
    }

    #[test]
    fn builder_defaults_to_plain() {
        let q = Query::<u32>::new().skip(2).limit(7);
        assert!(matches!(q.kind, QueryKind::Plain));
        assert_eq!(q.skip, Some(2));
        assert_eq!(q.limit, Some(7));
    }
}
