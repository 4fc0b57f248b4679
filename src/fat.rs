//! Primary FAT: the chain-linkage table every non-mini sector in the file
//! participates in, including the FAT's and DIFAT's own sectors.

use crate::allocator::Allocator;
use crate::common::{OleResult, SectorType, ENTRIES_PER_SECTOR};
use binrw::BinWrite;
use std::io::Cursor;

fn write_entry(buf: &mut [u8], offset: usize, value: SectorType) -> OleResult<()> {
    let mut cursor = Cursor::new(&mut buf[offset..offset + 4]);
    value.write_le(&mut cursor)?;
    Ok(())
}

/// Owns the mapping from global FAT entry index to physical sector, and
/// writes entries directly into the output buffer as they're decided.
#[derive(Debug, Default)]
pub struct FatManager {
    /// Physical sector number of each allocated FAT sector, in order.
    sector_numbers: Vec<u32>,
}

impl FatManager {
    pub fn new() -> FatManager {
        FatManager::default()
    }

    /// Reserves `count` FAT sectors, initializes every entry to `FREESECT`,
    /// and marks each reserved sector's own FAT entry as `FATSECT`.
    pub fn allocate(&mut self, buf: &mut [u8], alloc: &mut Allocator, count: u32) -> OleResult<()> {
        if count == 0 {
            return Ok(());
        }
        let first_sector = alloc.take_sectors(count)?;
        let first_entry = alloc.take_fat_entries(count);
        for i in 0..count {
            let sector = first_sector + i;
            self.sector_numbers.push(sector);
            let base = Allocator::sector_offset(sector);
            for slot in 0..ENTRIES_PER_SECTOR {
                write_entry(buf, base + slot as usize * 4, SectorType::FreeSect)?;
            }
        }
        for i in 0..count {
            self.update(buf, first_entry + i, SectorType::FatSect)?;
        }
        Ok(())
    }

    /// Writes entry `index` of the FAT (sector = `index / 128`, slot =
    /// `index % 128`).
    pub fn update(&mut self, buf: &mut [u8], index: u32, value: SectorType) -> OleResult<()> {
        let sector_idx = (index / ENTRIES_PER_SECTOR) as usize;
        let slot = (index % ENTRIES_PER_SECTOR) as usize;
        let sector = self.sector_numbers[sector_idx];
        let offset = Allocator::sector_offset(sector) + slot * 4;
        write_entry(buf, offset, value)
    }

    pub fn sector_count(&self) -> u32 {
        self.sector_numbers.len() as u32
    }

    pub fn sector_numbers(&self) -> &[u32] {
        &self.sector_numbers
    }
}
