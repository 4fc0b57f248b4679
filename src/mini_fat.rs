//! MiniFAT: identical layout to the primary FAT, but it describes the
//! minisectors of the mini-stream rather than regular sectors of the file.
//! The MiniFAT's own sectors are themselves ordinary sectors, so every one
//! of them also gets an entry in the primary FAT.

use crate::allocator::Allocator;
use crate::common::{OleResult, SectorType, ENTRIES_PER_SECTOR};
use crate::fat::FatManager;
use binrw::BinWrite;
use std::io::Cursor;

fn write_entry(buf: &mut [u8], offset: usize, value: SectorType) -> OleResult<()> {
    let mut cursor = Cursor::new(&mut buf[offset..offset + 4]);
    value.write_le(&mut cursor)?;
    Ok(())
}

#[derive(Debug, Default)]
pub struct MiniFatManager {
    sector_numbers: Vec<u32>,
}

impl MiniFatManager {
    pub fn new() -> MiniFatManager {
        MiniFatManager::default()
    }

    /// Reserves `count` MiniFAT sectors. Each one is entered into the
    /// primary FAT as `ENDOFCHAIN` and then, from the second sector on,
    /// the previous primary-FAT entry is patched to point at it — the
    /// MiniFAT chain is itself just a chain of regular sectors.
    pub fn allocate(
        &mut self,
        buf: &mut [u8],
        alloc: &mut Allocator,
        fat: &mut FatManager,
        count: u32,
    ) -> OleResult<()> {
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
            let entry = first_entry + i;
            fat.update(buf, entry, SectorType::EndOfChain)?;
            if i > 0 {
                fat.update(buf, entry - 1, SectorType::RegularSect(sector))?;
            }
        }
        Ok(())
    }

    /// Writes MiniFAT entry `index` (sector = `index / 128`, slot =
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

    pub fn start_sector(&self) -> Option<u32> {
        self.sector_numbers.first().copied()
    }
}
