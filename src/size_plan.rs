//! Computes every sector count the writer needs before a single byte is
//! placed in the output buffer.

use crate::common::{
    DIFAT_ENTRIES_PER_SECTOR, ENTRIES_PER_SECTOR, MINI_SECTOR_SIZE, MINI_STREAM_CUTOFF,
    SECTOR_SIZE,
};

fn div_ceil(num: u32, den: u32) -> u32 {
    num.div_ceil(den)
}

/// One payload's contribution to the plan: which of the FAT chain or the
/// mini-stream it lands in, and how many sectors/minisectors that costs.
#[derive(Debug, Clone, Copy, Default)]
struct StreamFootprint {
    fat_sectors: u32,
    mini_sectors: u32,
}

fn footprint(len: usize) -> StreamFootprint {
    if len as u64 >= MINI_STREAM_CUTOFF as u64 {
        StreamFootprint {
            fat_sectors: div_ceil(len as u32, SECTOR_SIZE as u32),
            mini_sectors: 0,
        }
    } else {
        StreamFootprint {
            fat_sectors: 0,
            mini_sectors: div_ceil(len as u32, MINI_SECTOR_SIZE as u32),
        }
    }
}

/// Every sector count the rest of the writer needs, resolved up front so the
/// output buffer can be allocated exactly once.
#[derive(Debug, Clone, Copy)]
pub struct SizePlan {
    pub dir_entries: u32,
    pub dir_sectors: u32,
    pub mini_sectors: u32,
    pub minifat_sectors: u32,
    pub mini_stream_sectors: u32,
    pub fat_sector_payload: u32,
    pub fat_sectors: u32,
    pub difat_sectors: u32,
    pub total_sectors: u32,
}

impl SizePlan {
    /// `stream_lengths` are the payload lengths of every stream in the tree
    /// (storages contribute nothing); `storage_count` is the number of
    /// storage (directory) nodes, not counting the root.
    pub fn compute(stream_lengths: &[usize], storage_count: u32) -> SizePlan {
        let footprints: Vec<StreamFootprint> = stream_lengths.iter().copied().map(footprint).collect();

        let file_count = stream_lengths.len() as u32;
        let dir_entries = file_count + storage_count + 1;
        let dir_sectors = div_ceil(dir_entries * 128, SECTOR_SIZE as u32);

        let mini_sectors: u32 = footprints.iter().map(|f| f.mini_sectors).sum();
        let minifat_sectors = if mini_sectors > 0 {
            div_ceil(mini_sectors * 4, SECTOR_SIZE as u32)
        } else {
            0
        };
        let mini_stream_sectors = if mini_sectors > 0 {
            div_ceil(mini_sectors * MINI_SECTOR_SIZE as u32, SECTOR_SIZE as u32)
        } else {
            0
        };

        let large_stream_sectors: u32 = footprints.iter().map(|f| f.fat_sectors).sum();
        let large_stream_count = footprints.iter().filter(|f| f.fat_sectors > 0).count() as u32;

        // Sectors that land in the primary FAT chain regardless of the
        // FAT/DIFAT self-reference overhead computed below: the directory
        // chain, every large stream's data sectors plus one EOC slot each,
        // the MiniFAT chain, and the mini-stream (if any).
        let n_used = dir_sectors
            + large_stream_sectors
            + large_stream_count
            + minifat_sectors
            + mini_stream_sectors;

        // Fixed-point iteration over the mutual FAT/DIFAT self-reference
        // dependency: allocating n FAT sectors costs n more FAT entries,
        // which may push the FAT sector count up again, and once the FAT
        // sector count exceeds the 109 entries the header holds directly,
        // DIFAT sectors are needed too and they also consume FAT entries.
        let mut fat_sectors = 0u32;
        let mut difat_sectors = 0u32;
        for _ in 0..8 {
            let total_entries = n_used + fat_sectors + difat_sectors;
            let next_fat_sectors = div_ceil(total_entries, ENTRIES_PER_SECTOR);
            let next_difat_sectors = if next_fat_sectors > 109 {
                div_ceil(next_fat_sectors - 109, DIFAT_ENTRIES_PER_SECTOR)
            } else {
                0
            };
            if next_fat_sectors == fat_sectors && next_difat_sectors == difat_sectors {
                break;
            }
            fat_sectors = next_fat_sectors;
            difat_sectors = next_difat_sectors;
        }

        let total_sectors = 1 // header
            + difat_sectors
            + fat_sectors
            + dir_sectors
            + large_stream_sectors
            + minifat_sectors
            + mini_stream_sectors;

        SizePlan {
            dir_entries,
            dir_sectors,
            mini_sectors,
            minifat_sectors,
            mini_stream_sectors,
            fat_sector_payload: n_used,
            fat_sectors,
            difat_sectors,
            total_sectors,
        }
    }

    /// Total buffer size in bytes, including the 512-byte header.
    pub fn total_bytes(&self) -> usize {
        self.total_sectors as usize * SECTOR_SIZE
    }
}
