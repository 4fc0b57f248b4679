//! Mini-stream writer: payloads below the mini-stream cutoff are packed
//! into a side buffer addressed in 64-byte minisectors, chained through the
//! MiniFAT rather than the primary FAT.

use crate::allocator::Allocator;
use crate::common::{OleResult, SectorType, MINI_SECTOR_SIZE};
use crate::mini_fat::MiniFatManager;

/// Side buffer backing every small stream's minisectors. Its length is
/// fixed by the size planner before any payload is written into it.
#[derive(Debug, Default)]
pub struct MiniStreamBuffer {
    data: Vec<u8>,
}

impl MiniStreamBuffer {
    pub fn new(mini_sectors: u32) -> MiniStreamBuffer {
        MiniStreamBuffer {
            data: vec![0u8; mini_sectors as usize * MINI_SECTOR_SIZE],
        }
    }

    /// Writes `data` as a chain of 64-byte minisectors (the last
    /// zero-padded) into this side buffer, linking each one into the
    /// MiniFAT (whose entries live in `buf`, the main output buffer), and
    /// returns the starting minisector number. The minisector cursor itself
    /// lives on `alloc` (the same allocator the rest of the writer uses),
    /// not here.
    ///
    /// A zero-length payload allocates nothing; the caller is responsible
    /// for recording `sector_start = 0, size_bytes = 0` and must not
    /// dereference minisector 0 in that case.
    pub fn write(
        &mut self,
        buf: &mut [u8],
        alloc: &mut Allocator,
        minifat: &mut MiniFatManager,
        data: &[u8],
    ) -> OleResult<u32> {
        if data.is_empty() {
            return Ok(0);
        }
        let sector_count = data.len().div_ceil(MINI_SECTOR_SIZE) as u32;
        let first = alloc.take_minifat_entries(sector_count);

        for i in 0..sector_count {
            let minisector = first + i;
            let start = i as usize * MINI_SECTOR_SIZE;
            let end = (start + MINI_SECTOR_SIZE).min(data.len());
            let chunk = &data[start..end];

            let offset = minisector as usize * MINI_SECTOR_SIZE;
            self.data[offset..offset + chunk.len()].copy_from_slice(chunk);

            minifat.update(buf, minisector, SectorType::EndOfChain)?;
            if i > 0 {
                minifat.update(buf, minisector - 1, SectorType::RegularSect(minisector))?;
            }
        }

        Ok(first)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}
