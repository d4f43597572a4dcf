/*!
Memory manager: first-fit contiguous allocator over a segment map, plus the
deferred free list applied at the end of each tick.

The segment map partitions `[0, total)` into contiguous segments keyed by
start address. Invariants maintained by every operation:
- segment starts tile the whole range with no gaps and no overlap;
- no two adjacent free segments (freeing coalesces with both neighbours);
- every live PID owns exactly one segment;
- the free-segment lengths sum to `available_memory`.

Frees requested while interrupts are being handled are queued and drained
after dispatch, so mid-tick lookups into the process table stay valid.
*/

use std::collections::BTreeMap;

use crate::error::SimError;
use crate::memory::Memory;
use crate::process::{Pid, ProcessTable};

/// One entry of the segment map: the owning process (or none for a free
/// segment) and the segment length in words.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub owner: Option<Pid>,
    pub len: usize,
}

#[derive(Debug)]
pub struct MemoryManager {
    map: BTreeMap<usize, Segment>,
    total: usize,
    available: usize,
    pending_frees: Vec<Pid>,
}

impl MemoryManager {
    /// Start with a single free segment covering the whole memory.
    pub fn new(total: usize) -> Self {
        let mut map = BTreeMap::new();
        map.insert(0, Segment { owner: None, len: total });
        Self {
            map,
            total,
            available: total,
            pending_frees: Vec::new(),
        }
    }

    #[inline]
    pub fn total_memory(&self) -> usize {
        self.total
    }

    #[inline]
    pub fn available_memory(&self) -> usize {
        self.available
    }

    #[inline]
    pub fn used_memory(&self) -> usize {
        self.total - self.available
    }

    /// The segment map, keyed by start address, for external readers.
    pub fn segments(&self) -> &BTreeMap<usize, Segment> {
        &self.map
    }

    // -------------- Allocation --------------

    /// First-fit scan in start-address order: the first free segment with
    /// `len >= size`, as `(start, len)`.
    pub fn find_free_block(&self, size: usize) -> Option<(usize, usize)> {
        self.map
            .iter()
            .find(|(_, segment)| segment.owner.is_none() && segment.len >= size)
            .map(|(&start, segment)| (start, segment.len))
    }

    /// Allocate `size` words for `pid`. Splits the chosen free segment and
    /// returns the block start, or `None` when no free segment fits.
    pub fn allocate(&mut self, pid: Pid, size: usize) -> Option<usize> {
        let (start, free_len) = self.find_free_block(size)?;
        self.map.insert(start, Segment { owner: Some(pid), len: size });
        if free_len > size {
            self.map.insert(
                start + size,
                Segment { owner: None, len: free_len - size },
            );
        }
        self.available -= size;
        Some(start)
    }

    // -------------- Freeing --------------

    /// Queue a free to be applied by `drain_frees` at the end of the tick.
    pub fn schedule_free(&mut self, pid: Pid) {
        self.pending_frees.push(pid);
    }

    pub fn has_pending_frees(&self) -> bool {
        !self.pending_frees.is_empty()
    }

    /// Apply every queued free: reclaim the memory and drop the PCB from the
    /// process table.
    pub fn drain_frees(
        &mut self,
        table: &mut ProcessTable,
        memory: &mut Memory,
    ) -> Result<(), SimError> {
        for pid in std::mem::take(&mut self.pending_frees) {
            self.free(pid, table, memory)?;
            table.remove(&pid);
            log::debug!("reclaimed memory of process {pid}");
        }
        Ok(())
    }

    /// Release the block owned by `pid`: wipe its cells, return the segment
    /// to the free pool, and coalesce with free neighbours on either side.
    pub fn free(
        &mut self,
        pid: Pid,
        table: &ProcessTable,
        memory: &mut Memory,
    ) -> Result<(), SimError> {
        let process = table.get(&pid).ok_or(SimError::ProcessMissing(pid))?;
        let start = process
            .memory_config
            .block_start
            .ok_or(SimError::NotPlaced(pid))?;

        match self.map.get(&start) {
            Some(segment) if segment.owner == Some(pid) => {}
            _ => return Err(SimError::CorruptSegmentMap { addr: start }),
        }
        let len = self.map.remove(&start).map(|s| s.len).unwrap_or(0);

        memory.clear_range(start, len)?;

        let mut merged_start = start;
        let mut merged_len = len;

        // Left neighbour: under the tiling invariant it ends exactly at
        // `start`, so only its ownership needs checking.
        if let Some((&left_start, &left)) = self.map.range(..start).next_back() {
            if left.owner.is_none() {
                if left_start + left.len != start {
                    return Err(SimError::CorruptSegmentMap { addr: left_start });
                }
                self.map.remove(&left_start);
                merged_start = left_start;
                merged_len += left.len;
            }
        }

        // Right neighbour starts at the end of the freed block.
        if let Some(&right) = self.map.get(&(start + len)) {
            if right.owner.is_none() {
                self.map.remove(&(start + len));
                merged_len += right.len;
            }
        }

        self.map.insert(
            merged_start,
            Segment { owner: None, len: merged_len },
        );
        self.available += len;
        Ok(())
    }

    /// Back to a single free segment. Pending frees are discarded.
    pub fn reset(&mut self) {
        self.map.clear();
        self.map.insert(0, Segment { owner: None, len: self.total });
        self.available = self.total;
        self.pending_frees.clear();
    }
}
