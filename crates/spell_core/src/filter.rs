//! Dictionary bloom filter: fixed sizing, double-hashed cell positions, optional counting cells.
use crate::bits::{BitStore, Layout};
use crate::errors::{BloomError, Result};
use crate::hash;
use crate::sizing::size_for;
use std::borrow::Cow;

/// The membership capability set. [`BloomFilter`] is the implementation.
pub trait Membership {
    /// Fails fast with [`BloomError::InvalidItem`] for an item that cannot be hashed.
    fn add(&mut self, item: &str) -> Result<()>;

    fn contains(&self, item: &str) -> bool;

    /// Only meaningful for items previously added to this instance.
    fn remove(&mut self, item: &str) -> Result<()>;

    /// Skip-and-report: a rejected item does not stop the batch.
    fn bulk_add<I, S>(&mut self, items: I) -> BulkReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        Self: Sized,
    {
        let mut report = BulkReport::default();
        for (idx, item) in items.into_iter().enumerate() {
            match self.add(item.as_ref()) {
                Ok(()) => report.inserted += 1,
                Err(e) => report.rejected.push((idx, e)),
            }
        }
        report
    }

    /// Fail-fast variant of [`Membership::bulk_add`]; returns how many items went in.
    fn try_bulk_add<I, S>(&mut self, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        Self: Sized,
    {
        let mut n = 0usize;
        for item in items {
            self.add(item.as_ref())?;
            n += 1;
        }
        Ok(n)
    }
}

#[derive(Debug, Default)]
pub struct BulkReport {
    pub inserted: usize,
    /// (index in the input sequence, reason)
    pub rejected: Vec<(usize, BloomError)>,
}

impl BulkReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Construction parameters, already parsed by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub capacity: u64,
    pub false_positive_target: f64,
    pub case_sensitive: bool,
    pub layout: Layout,
}

impl FilterParams {
    pub fn new(capacity: u64, false_positive_target: f64) -> Self {
        Self {
            capacity,
            false_positive_target,
            case_sensitive: false,
            layout: Layout::Bits,
        }
    }

    #[must_use]
    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    #[must_use]
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Read-only snapshot for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterStats {
    pub capacity: u64,
    pub false_positive_target: f64,
    pub case_sensitive: bool,
    pub layout: Layout,
    pub bit_length: usize,
    pub hash_count: u32,
    pub inserted_count: u64,
    pub pending_delete: bool,
    pub size_in_bytes: usize,
    pub fill_ratio: f64,
    pub estimated_false_positive_rate: f64,
}

impl FilterStats {
    pub fn size_in_mb(&self) -> f64 {
        self.size_in_bytes as f64 / 1e6
    }
}

#[derive(Clone, Debug)]
pub struct BloomFilter {
    params: FilterParams,
    bit_length: usize,
    hash_count: u32,
    storage: BitStore,
    inserted_count: u64,
    pending_delete: bool,
}

impl BloomFilter {
    pub fn new(params: FilterParams) -> Result<Self> {
        let sizing = size_for(params.capacity, params.false_positive_target)?;
        Ok(Self {
            params,
            bit_length: sizing.bit_length,
            hash_count: sizing.hash_count,
            storage: BitStore::new(params.layout, sizing.bit_length)?,
            inserted_count: 0,
            pending_delete: false,
        })
    }

    pub fn params(&self) -> FilterParams {
        self.params
    }
    pub fn capacity(&self) -> u64 {
        self.params.capacity
    }
    pub fn false_positive_target(&self) -> f64 {
        self.params.false_positive_target
    }
    pub fn case_sensitive(&self) -> bool {
        self.params.case_sensitive
    }
    pub fn layout(&self) -> Layout {
        self.params.layout
    }
    pub fn bit_length(&self) -> usize {
        self.bit_length
    }
    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }
    pub fn inserted_count(&self) -> u64 {
        self.inserted_count
    }
    pub fn pending_delete(&self) -> bool {
        self.pending_delete
    }
    pub fn storage(&self) -> &BitStore {
        &self.storage
    }

    /// Logical deletion: nothing in storage changes until the filter is rebuilt.
    pub fn mark_pending_delete(&mut self) {
        self.pending_delete = true;
    }

    /// Past this point the false-positive target no longer holds.
    pub fn over_threshold(&self, fraction: f64) -> bool {
        self.inserted_count as f64 > fraction * self.params.capacity as f64
    }

    pub fn fill_ratio(&self) -> f64 {
        if self.bit_length == 0 {
            return 0.0;
        }
        self.storage.occupied() as f64 / self.bit_length as f64
    }

    pub fn stats(&self) -> FilterStats {
        let fill_ratio = self.fill_ratio();
        FilterStats {
            capacity: self.params.capacity,
            false_positive_target: self.params.false_positive_target,
            case_sensitive: self.params.case_sensitive,
            layout: self.params.layout,
            bit_length: self.bit_length,
            hash_count: self.hash_count,
            inserted_count: self.inserted_count,
            pending_delete: self.pending_delete,
            size_in_bytes: self.storage.size_in_bytes(),
            fill_ratio,
            estimated_false_positive_rate: fill_ratio.powi(self.hash_count as i32),
        }
    }

    fn normalize<'a>(&self, item: &'a str) -> Result<Cow<'a, str>> {
        if item.trim().is_empty() {
            return Err(BloomError::InvalidItem(format!("{item:?} has no content to hash")));
        }
        if self.params.case_sensitive {
            Ok(Cow::Borrowed(item))
        } else {
            Ok(Cow::Owned(item.to_lowercase()))
        }
    }

    #[inline]
    fn cells_for(&self, key: &str) -> hash::Positions {
        hash::positions(key.as_bytes(), self.hash_count, self.bit_length)
    }
}

impl Membership for BloomFilter {
    fn add(&mut self, item: &str) -> Result<()> {
        let key = self.normalize(item)?;
        for pos in hash::positions(key.as_bytes(), self.hash_count, self.bit_length) {
            self.storage.set_or_increment(pos)?;
        }
        self.inserted_count += 1;
        Ok(())
    }

    fn contains(&self, item: &str) -> bool {
        let Ok(key) = self.normalize(item) else {
            return false;
        };
        // positions come from `% bit_length`, storage has exactly `bit_length` cells
        self.cells_for(&key).all(|pos| self.storage.test(pos))
    }

    fn remove(&mut self, item: &str) -> Result<()> {
        if self.params.layout == Layout::Bits {
            return Err(BloomError::Unsupported("remove on a non-counting filter"));
        }
        let key = self.normalize(item)?;
        for pos in hash::positions(key.as_bytes(), self.hash_count, self.bit_length) {
            self.storage.clear_or_decrement(pos)?;
        }
        self.pending_delete = true;
        Ok(())
    }
}
