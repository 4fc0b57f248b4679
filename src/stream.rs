//! Large stream writer: payloads at or above the mini-stream cutoff are laid
//! down directly as chained regular sectors in the main buffer.

use crate::allocator::Allocator;
use crate::common::{OleResult, SectorType, SECTOR_SIZE};
use crate::fat::FatManager;

/// Writes `data` as a chain of 512-byte sectors (the last zero-padded),
/// allocating and linking each one into the primary FAT, and returns the
/// starting sector number.
pub fn write(
    buf: &mut [u8],
    alloc: &mut Allocator,
    fat: &mut FatManager,
    data: &[u8],
) -> OleResult<u32> {
    let sector_count = data.len().div_ceil(SECTOR_SIZE) as u32;
    let first_sector = alloc.take_sectors(sector_count)?;
    let first_entry = alloc.take_fat_entries(sector_count);

    for i in 0..sector_count {
        let sector = first_sector + i;
        let entry = first_entry + i;
        let start = i as usize * SECTOR_SIZE;
        let end = (start + SECTOR_SIZE).min(data.len());
        let chunk = &data[start..end];

        let offset = Allocator::sector_offset(sector);
        buf[offset..offset + chunk.len()].copy_from_slice(chunk);
        // The tail of the final sector is already zeroed by the buffer's
        // initial allocation, so only the occupied prefix needs copying.

        fat.update(buf, entry, SectorType::EndOfChain)?;
        if i > 0 {
            fat.update(buf, entry - 1, SectorType::RegularSect(sector))?;
        }
    }

    Ok(first_sector)
}
