use crate::common::{SectorType, HEADER_DIFAT_COUNT};
use binrw::binrw;

/// The fixed 512-byte compound file header (MS-CFB 2.2).
///
/// This writer only ever emits version 3 (512-byte sector) files, so every
/// field that MS-CFB pins to a constant for v3 — minor/major version, byte
/// order, sector shift, mini sector shift, the reserved bytes, and the
/// (always-zero) directory sector count — is consumed as a single `magic`
/// byte string ahead of [`fat_sector_count`](Header::fat_sector_count)
/// rather than represented as a field. There is no way to construct a
/// `Header` whose fixed bytes disagree with v3.
#[binrw]
#[brw(little)]
#[brw(magic(0xE11AB1A1E011CFD0u64))]
#[derive(Debug, Clone)]
pub struct Header {
    // CLSID (16, zero) + minor version (0x003E) + major version (0x0003)
    // + byte order (0xFFFE) + sector shift (0x0009) + mini sector shift
    // (0x0006) + reserved (6, zero) + number of directory sectors (0).
    #[brw(magic(b"\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x3E\x00\x03\x00\xFE\xFF\x09\x00\x06\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00"))]
    /// Number of FAT sectors in the file.
    pub fat_sector_count: u32,
    /// Starting sector of the directory chain.
    pub dir_start: SectorType,
    // Transaction signature number (4, zero) + mini stream cutoff size (4096).
    #[brw(magic(b"\x00\x00\x00\x00\x00\x10\x00\x00"))]
    /// Starting sector of the MiniFAT chain, or `ENDOFCHAIN` if there is no mini-stream.
    pub minifat_start: SectorType,
    /// Number of MiniFAT sectors.
    pub minifat_count: u32,
    /// Starting sector of the DIFAT overflow chain, or `ENDOFCHAIN` if the DIFAT fits in the header.
    pub difat_start: SectorType,
    /// Number of DIFAT overflow sectors.
    pub difat_count: u32,
    /// The first 109 DIFAT entries (FAT sector numbers), embedded in the header.
    pub header_difat: [SectorType; HEADER_DIFAT_COUNT],
}

impl Header {
    /// A freshly allocated header with every variable field defaulted to
    /// "empty" (no FAT, no directory, no mini-stream, no DIFAT overflow).
    /// [`crate::writer::CfbWriter`] patches every field in place once the
    /// rest of the layout is known.
    pub fn empty() -> Self {
        Header {
            fat_sector_count: 0,
            dir_start: SectorType::EndOfChain,
            minifat_start: SectorType::EndOfChain,
            minifat_count: 0,
            difat_start: SectorType::EndOfChain,
            difat_count: 0,
            header_difat: [SectorType::FreeSect; HEADER_DIFAT_COUNT],
        }
    }
}
