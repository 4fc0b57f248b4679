//! DIFAT: the (usually empty) overflow chain that locates FAT sectors once
//! there are more than 109 of them — the header's embedded DIFAT array runs
//! out at that point.

use crate::allocator::Allocator;
use crate::common::{OleResult, SectorType, DIFAT_ENTRIES_PER_SECTOR, HEADER_DIFAT_COUNT};
use crate::fat::FatManager;
use crate::header::Header;
use binrw::BinWrite;
use std::io::Cursor;

fn write_u32_entry(buf: &mut [u8], offset: usize, value: SectorType) -> OleResult<()> {
    let mut cursor = Cursor::new(&mut buf[offset..offset + 4]);
    value.write_le(&mut cursor)?;
    Ok(())
}

fn next_pointer_offset(sector: u32) -> usize {
    Allocator::sector_offset(sector) + DIFAT_ENTRIES_PER_SECTOR as usize * 4
}

#[derive(Debug, Default)]
pub struct DifatManager {
    sector_numbers: Vec<u32>,
}

impl DifatManager {
    pub fn new() -> DifatManager {
        DifatManager::default()
    }

    /// Reserves `count` DIFAT overflow sectors. Each one's 127 entries start
    /// `FREESECT`, its trailing `next` pointer starts `ENDOFCHAIN`, the
    /// previous sector's `next` pointer is patched to it, and the primary
    /// FAT is told this sector is a `DIFSECT`.
    pub fn allocate(
        &mut self,
        buf: &mut [u8],
        alloc: &mut Allocator,
        fat: &mut FatManager,
        count: u32,
    ) -> OleResult<()> {
        for i in 0..count {
            let sector = alloc.take_sectors(1)?;
            let entry = alloc.take_fat_entries(1);
            let base = Allocator::sector_offset(sector);
            for slot in 0..DIFAT_ENTRIES_PER_SECTOR {
                write_u32_entry(buf, base + slot as usize * 4, SectorType::FreeSect)?;
            }
            write_u32_entry(buf, next_pointer_offset(sector), SectorType::EndOfChain)?;
            if i > 0 {
                let previous = *self.sector_numbers.last().unwrap();
                write_u32_entry(
                    buf,
                    next_pointer_offset(previous),
                    SectorType::RegularSect(sector),
                )?;
            }
            fat.update(buf, entry, SectorType::DifSect)?;
            self.sector_numbers.push(sector);
        }
        Ok(())
    }

    /// Writes DIFAT entry `index`: the first 109 live in the header, the
    /// rest overflow into allocated DIFAT sectors at 127 entries each.
    pub fn update(
        &mut self,
        buf: &mut [u8],
        header: &mut Header,
        index: u32,
        value: SectorType,
    ) -> OleResult<()> {
        if (index as usize) < HEADER_DIFAT_COUNT {
            header.header_difat[index as usize] = value;
            return Ok(());
        }
        let remainder = index - HEADER_DIFAT_COUNT as u32;
        let sector_idx = (remainder / DIFAT_ENTRIES_PER_SECTOR) as usize;
        let slot = remainder % DIFAT_ENTRIES_PER_SECTOR;
        let sector = self.sector_numbers[sector_idx];
        write_u32_entry(buf, Allocator::sector_offset(sector) + slot as usize * 4, value)
    }

    /// Records every FAT sector's physical sector number at the matching
    /// DIFAT index, in FAT order, leaving any remaining header slots
    /// `FREESECT`.
    pub fn record_fat_sectors(
        &mut self,
        buf: &mut [u8],
        header: &mut Header,
        fat: &FatManager,
    ) -> OleResult<()> {
        for (i, &sector) in fat.sector_numbers().iter().enumerate() {
            self.update(buf, header, i as u32, SectorType::RegularSect(sector))?;
        }
        Ok(())
    }

    pub fn sector_count(&self) -> u32 {
        self.sector_numbers.len() as u32
    }

    pub fn start_sector(&self) -> Option<u32> {
        self.sector_numbers.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fat_sectors_within_the_header_capacity_need_no_overflow_sectors() {
        let mut buf = vec![0u8; Allocator::sector_offset(1)];
        let mut alloc = Allocator::new(1);
        let mut fat = FatManager::new();
        fat.allocate(&mut buf, &mut alloc, 1).unwrap();
        let mut header = Header::empty();
        let mut difat = DifatManager::new();
        difat.allocate(&mut buf, &mut alloc, &mut fat, 0).unwrap();
        difat.record_fat_sectors(&mut buf, &mut header, &fat).unwrap();

        assert_eq!(header.header_difat[0], SectorType::RegularSect(0));
        assert_eq!(header.header_difat[1], SectorType::FreeSect);
        assert_eq!(difat.sector_count(), 0);
    }

    #[test]
    fn overflow_sectors_chain_through_their_next_pointers() {
        let mut buf = vec![0u8; Allocator::sector_offset(3)];
        let mut alloc = Allocator::new(3);
        let mut fat = FatManager::new();
        fat.allocate(&mut buf, &mut alloc, 1).unwrap();
        let mut difat = DifatManager::new();
        difat.allocate(&mut buf, &mut alloc, &mut fat, 2).unwrap();

        let first = difat.sector_numbers[0];
        let second = difat.sector_numbers[1];
        let next_bytes_offset = next_pointer_offset(first);
        let next_value = u32::from_le_bytes(
            buf[next_bytes_offset..next_bytes_offset + 4].try_into().unwrap(),
        );
        assert_eq!(next_value, second);

        let last_next_offset = next_pointer_offset(second);
        let last_next = u32::from_le_bytes(
            buf[last_next_offset..last_next_offset + 4].try_into().unwrap(),
        );
        assert_eq!(last_next, 0xFFFFFFFE);
    }
}
