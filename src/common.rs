use binrw::binrw;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Sector size in bytes. This writer only ever produces v3 (512-byte
/// sector) compound files; v4 (4096-byte sectors) is out of scope.
pub const SECTOR_SIZE: usize = 512;

/// Minisector size in bytes, fixed by the format.
pub const MINI_SECTOR_SIZE: usize = 64;

/// Any stream at or above this size is stored in the regular FAT chain
/// rather than the mini-stream.
pub const MINI_STREAM_CUTOFF: u32 = 4096;

/// Byte length of one FAT, MiniFAT, or DIFAT entry.
pub const ENTRY_SIZE: usize = 4;

/// Byte length of one directory entry.
pub const DIR_ENTRY_SIZE: usize = 128;

/// Number of DIFAT entries that live directly in the header.
pub const HEADER_DIFAT_COUNT: usize = 109;

/// Number of FAT/MiniFAT entries per 512-byte sector.
pub const ENTRIES_PER_SECTOR: u32 = (SECTOR_SIZE / ENTRY_SIZE) as u32;

/// Number of DIFAT entries per DIFAT sector (the last u32 is `next_difat`).
pub const DIFAT_ENTRIES_PER_SECTOR: u32 = ENTRIES_PER_SECTOR - 1;

/// Number of directory entries per 512-byte directory sector.
pub const DIR_ENTRIES_PER_SECTOR: u32 = (SECTOR_SIZE / DIR_ENTRY_SIZE) as u32;

pub const DIF_SECT: u32 = 0xFFFFFFFC;
pub const FAT_SECT: u32 = 0xFFFFFFFD;
pub const END_OF_CHAIN: u32 = 0xFFFFFFFE;
pub const FREE_SECT: u32 = 0xFFFFFFFF;
pub const NO_STREAM: u32 = 0xFFFFFFFF;

/// REGSECT 0x00000000 - 0xFFFFFFF9 Regular sector number.
///
/// DIFSECT 0xFFFFFFFC Specifies a DIFAT sector in the FAT.
///
/// FATSECT 0xFFFFFFFD Specifies a FAT sector in the FAT.
///
/// ENDOFCHAIN 0xFFFFFFFE End of a linked chain of sectors.
///
/// FREESECT 0xFFFFFFFF Specifies an unallocated sector in the FAT, Mini FAT, or DIFAT.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectorType {
    #[brw(magic(0xFFFFFFFCu32))]
    DifSect,
    #[brw(magic(0xFFFFFFFDu32))]
    FatSect,
    #[default]
    #[brw(magic(0xFFFFFFFEu32))]
    EndOfChain,
    #[brw(magic(0xFFFFFFFFu32))]
    FreeSect,
    RegularSect(u32),
}

impl SectorType {
    /// The raw sector number, if this is a regular (data-carrying) sector.
    pub fn as_regular(self) -> Option<u32> {
        match self {
            SectorType::RegularSect(v) => Some(v),
            _ => None,
        }
    }
}

impl From<u32> for SectorType {
    fn from(value: u32) -> Self {
        match value {
            DIF_SECT => SectorType::DifSect,
            FAT_SECT => SectorType::FatSect,
            END_OF_CHAIN => SectorType::EndOfChain,
            FREE_SECT => SectorType::FreeSect,
            v => SectorType::RegularSect(v),
        }
    }
}

impl From<SectorType> for u32 {
    fn from(value: SectorType) -> Self {
        match value {
            SectorType::DifSect => DIF_SECT,
            SectorType::FatSect => FAT_SECT,
            SectorType::EndOfChain => END_OF_CHAIN,
            SectorType::FreeSect => FREE_SECT,
            SectorType::RegularSect(v) => v,
        }
    }
}

impl Display for SectorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SectorType::DifSect => write!(f, "DifSect"),
            SectorType::FatSect => write!(f, "FatSect"),
            SectorType::EndOfChain => write!(f, "EndOfChain"),
            SectorType::FreeSect => write!(f, "FreeSect"),
            SectorType::RegularSect(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Error)]
pub enum OleError {
    #[error("invalid stream path {0:?}: must be relative, non-empty, and free of `..` segments")]
    InvalidPath(String),
    #[error("stream {path:?} is {len} bytes, exceeding the maximum of 2^31 - 1 bytes")]
    PayloadTooLarge { path: String, len: usize },
    #[error("sector allocator overflowed the planned buffer size (planner bug)")]
    Overflow,
    #[error("binary encode error")]
    EncodeError(#[from] binrw::Error),
}

pub type OleResult<T> = Result<T, OleError>;
