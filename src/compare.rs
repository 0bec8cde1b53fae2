//! Key ordering and key equality
//!
//! Both capabilities are small traits with blanket impls for closures, so
//! callers can pass `|a, b| a.cmp(b)` directly or supply their own types.

use std::cmp::Ordering;
use std::fmt;

/// Total order over keys used for sorting runs and merging them.
pub trait KeyComparator: Send + Sync {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;
}

impl<F> KeyComparator for F
where
    F: Fn(&[u8], &[u8]) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        self(a, b)
    }
}

/// Equality predicate over keys. When configured, equal keys are collapsed
/// to the one inserted last.
pub trait KeyEquality: Send + Sync {
    fn equal(&self, a: &[u8], b: &[u8]) -> bool;
}

impl<F> KeyEquality for F
where
    F: Fn(&[u8], &[u8]) -> bool + Send + Sync,
{
    fn equal(&self, a: &[u8], b: &[u8]) -> bool {
        self(a, b)
    }
}

/// Lexicographic byte order (the default comparator)
#[derive(Debug, Clone, Copy, Default)]
pub struct Bytewise;

impl KeyComparator for Bytewise {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }
}

impl KeyEquality for Bytewise {
    fn equal(&self, a: &[u8], b: &[u8]) -> bool {
        a == b
    }
}

/// Reverses another comparator
#[derive(Debug, Clone, Copy, Default)]
pub struct Reversed<C>(pub C);

impl<C: KeyComparator> KeyComparator for Reversed<C> {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.0.compare(b, a)
    }
}

/// How a run buffer is ordered before it is spilled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortAlgorithm {
    /// Equal keys keep insertion order, so the last insert wins on dedup
    #[default]
    Stable,

    /// Faster, but the survivor among equal keys in one buffer is arbitrary
    Unstable,
}

impl fmt::Display for SortAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortAlgorithm::Stable => write!(f, "stable"),
            SortAlgorithm::Unstable => write!(f, "unstable"),
        }
    }
}
