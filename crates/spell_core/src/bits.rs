//! Packed backing storage: one bit per cell, or 4-bit saturating counters.
use crate::errors::{BloomError, Result};

pub const COUNTER_MAX: u8 = 0x0F;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Plain bloom filter, deletion only through a rebuild.
    #[default]
    Bits,
    /// Counting bloom filter, two nibbles per byte.
    Counters,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitStore {
    layout: Layout,
    cells: usize,
    bytes: Vec<u8>,
}

impl BitStore {
    /// Fails with `InvalidParameter` when the allocator cannot provide the storage.
    pub fn new(layout: Layout, cells: usize) -> Result<Self> {
        let len = match layout {
            Layout::Bits => cells.div_ceil(8),
            Layout::Counters => cells.div_ceil(2),
        };
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(len).map_err(|e| {
            BloomError::InvalidParameter(format!("cannot allocate {len} bytes of storage: {e}"))
        })?;
        bytes.resize(len, 0u8);
        Ok(Self { layout, cells, bytes })
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells == 0
    }

    pub fn size_in_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Raw cells, for equality checks and diagnostics.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    fn check(&self, pos: usize) -> Result<()> {
        if pos >= self.cells {
            return Err(BloomError::Internal(format!(
                "position {pos} outside storage of {} cells",
                self.cells
            )));
        }
        Ok(())
    }

    #[inline]
    fn counter(&self, pos: usize) -> u8 {
        let b = self.bytes[pos / 2];
        if pos & 1 == 0 { b & 0x0F } else { b >> 4 }
    }

    #[inline]
    fn put_counter(&mut self, pos: usize, v: u8) {
        let b = &mut self.bytes[pos / 2];
        if pos & 1 == 0 {
            *b = (*b & 0xF0) | v;
        } else {
            *b = (*b & 0x0F) | (v << 4);
        }
    }

    pub fn set_or_increment(&mut self, pos: usize) -> Result<()> {
        self.check(pos)?;
        match self.layout {
            Layout::Bits => self.bytes[pos / 8] |= 1u8 << (pos & 7),
            Layout::Counters => {
                let c = self.counter(pos);
                if c < COUNTER_MAX {
                    self.put_counter(pos, c + 1);
                }
            }
        }
        Ok(())
    }

    pub fn is_set(&self, pos: usize) -> Result<bool> {
        self.check(pos)?;
        Ok(self.test(pos))
    }

    /// Lookup for positions already reduced `% len()`; out of range is a bug, not a miss.
    #[inline]
    pub fn test(&self, pos: usize) -> bool {
        debug_assert!(pos < self.cells, "position {pos} outside {} cells", self.cells);
        match self.layout {
            Layout::Bits => self.bytes[pos / 8] & (1u8 << (pos & 7)) != 0,
            Layout::Counters => self.counter(pos) > 0,
        }
    }

    /// Saturated counters stay saturated: their true count is unknown.
    pub fn clear_or_decrement(&mut self, pos: usize) -> Result<()> {
        if self.layout == Layout::Bits {
            return Err(BloomError::Unsupported("clearing cells of a plain bit array"));
        }
        self.check(pos)?;
        let c = self.counter(pos);
        if c > 0 && c < COUNTER_MAX {
            self.put_counter(pos, c - 1);
        }
        Ok(())
    }

    pub fn counter_at(&self, pos: usize) -> Result<u8> {
        self.check(pos)?;
        Ok(match self.layout {
            Layout::Bits => u8::from(self.test(pos)),
            Layout::Counters => self.counter(pos),
        })
    }

    /// Number of non-zero cells.
    pub fn occupied(&self) -> usize {
        match self.layout {
            Layout::Bits => self.bytes.iter().map(|b| b.count_ones() as usize).sum(),
            Layout::Counters => (0..self.cells).filter(|&p| self.counter(p) > 0).count(),
        }
    }

    pub fn saturated(&self) -> usize {
        match self.layout {
            Layout::Bits => 0,
            Layout::Counters => (0..self.cells).filter(|&p| self.counter(p) == COUNTER_MAX).count(),
        }
    }
}
