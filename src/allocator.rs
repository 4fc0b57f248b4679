//! The sector allocator: a small set of monotonic cursors into the output
//! buffer, advanced once per sector and never rewound.

use crate::common::{OleError, OleResult, SECTOR_SIZE};

/// Tracks where the next sector, FAT entry, and MiniFAT entry go.
///
/// The buffer itself is owned by [`crate::writer::CfbWriter`]; this struct
/// only hands out offsets and sector numbers and checks them against the
/// size the planner already committed to.
#[derive(Debug)]
pub struct Allocator {
    total_sectors: u32,
    next_free_number: u32,
    next_fat: u32,
    next_minifat: u32,
}

impl Allocator {
    pub fn new(total_sectors: u32) -> Allocator {
        Allocator {
            total_sectors,
            next_free_number: 0,
            next_fat: 0,
            next_minifat: 0,
        }
    }

    /// Reserves the next `count` sectors and returns the first one's sector
    /// number. Sector `n` lives at byte offset `(n + 1) * 512` in the
    /// output buffer (the `+ 1` accounts for the header).
    pub fn take_sectors(&mut self, count: u32) -> OleResult<u32> {
        let start = self.next_free_number;
        let end = start
            .checked_add(count)
            .ok_or(OleError::Overflow)?;
        if end > self.total_sectors {
            return Err(OleError::Overflow);
        }
        self.next_free_number = end;
        Ok(start)
    }

    pub fn sector_offset(sector: u32) -> usize {
        (sector as usize + 1) * SECTOR_SIZE
    }

    /// Reserves the next `count` FAT entry slots and returns the first
    /// entry's global index.
    pub fn take_fat_entries(&mut self, count: u32) -> u32 {
        let start = self.next_fat;
        self.next_fat += count;
        start
    }

    /// Reserves the next `count` MiniFAT entry slots and returns the first
    /// entry's global index.
    pub fn take_minifat_entries(&mut self, count: u32) -> u32 {
        let start = self.next_minifat;
        self.next_minifat += count;
        start
    }

    pub fn sectors_used(&self) -> u32 {
        self.next_free_number
    }
}
