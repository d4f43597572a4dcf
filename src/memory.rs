/*!
Physical memory: a fixed-size array of machine words.

Each cell holds an `i64` word or nothing (uninitialized / wiped). All access
is bounds-checked; an out-of-range address is a fatal error because it means
an allocation or a generated command produced a bad address.
*/

use crate::error::SimError;

pub struct Memory {
    cells: Vec<Option<i64>>,
}

impl Memory {
    /// Create `size` uninitialized cells.
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![None; size],
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Read the word at `addr`. Uninitialized cells read as `None`.
    pub fn read(&self, addr: usize) -> Result<Option<i64>, SimError> {
        self.cells
            .get(addr)
            .copied()
            .ok_or(SimError::OutOfRange {
                addr,
                size: self.cells.len(),
            })
    }

    /// Write a word at `addr`.
    pub fn write(&mut self, addr: usize, value: i64) -> Result<(), SimError> {
        let size = self.cells.len();
        let cell = self
            .cells
            .get_mut(addr)
            .ok_or(SimError::OutOfRange { addr, size })?;
        *cell = Some(value);
        Ok(())
    }

    /// Wipe `len` cells starting at `start` back to the uninitialized state.
    pub fn clear_range(&mut self, start: usize, len: usize) -> Result<(), SimError> {
        let size = self.cells.len();
        let end = start.checked_add(len).filter(|&e| e <= size).ok_or(
            SimError::OutOfRange {
                addr: start.saturating_add(len),
                size,
            },
        )?;
        self.cells[start..end].fill(None);
        Ok(())
    }

    /// Wipe every cell.
    pub fn clear_all(&mut self) {
        self.cells.fill(None);
    }

    /// Raw view of the cells, for external readers taking a snapshot.
    pub fn cells(&self) -> &[Option<i64>] {
        &self.cells
    }
}
