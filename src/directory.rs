//! Directory entries and the balanced red-black sibling tree MS-CFB uses to
//! arrange the children of each storage.
//!
//! https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-cfb/a94d7445-c4be-49cd-b6b9-2f4abc663817

use crate::allocator::Allocator;
use crate::common::{OleResult, SectorType, DIR_ENTRIES_PER_SECTOR, DIR_ENTRY_SIZE};
use crate::fat::FatManager;
use crate::path_tree::TreeNode;
use binrw::{binrw, BinWrite};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::io::Cursor;

#[binrw]
#[brw(little)]
#[derive(Debug, Clone)]
pub struct Entry {
    /// UTF-16LE name, null-terminated, zero-padded to 64 bytes.
    pub name: [u8; 64],
    /// Length of the name in bytes, including the terminating null.
    pub name_length: u16,
    pub object_type: ObjectType,
    pub color: Color,
    /// `NOSTREAM` and `FREESECT` share the bit pattern `0xFFFFFFFF`, so
    /// `SectorType::FreeSect` doubles as "no sibling" here, matching the
    /// field's on-disk representation.
    pub left_sibling_id: SectorType,
    pub right_sibling_id: SectorType,
    pub child_id: SectorType,
    pub clsid: [u8; 16],
    pub state_bits: u32,
    pub creation_time: u64,
    pub modified_time: u64,
    pub starting_sector_location: SectorType,
    pub stream_size: u64,
}

impl Display for Entry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.name(), self.object_type, self.color)
    }
}

impl Entry {
    pub fn name(&self) -> String {
        let units: Vec<u16> = self
            .name
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&u| u != 0)
            .collect();
        String::from_utf16_lossy(&units)
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    #[brw(magic(0x00u8))]
    Unknown,
    #[brw(magic(0x01u8))]
    Storage,
    #[brw(magic(0x02u8))]
    Stream,
    #[brw(magic(0x05u8))]
    RootStorage,
}

impl Display for ObjectType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectType::Unknown => write!(f, "unknown"),
            ObjectType::Storage => write!(f, "storage"),
            ObjectType::Stream => write!(f, "stream"),
            ObjectType::RootStorage => write!(f, "root storage"),
        }
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    #[brw(magic(0x00u8))]
    Red,
    #[brw(magic(0x01u8))]
    Black,
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Red => write!(f, "red"),
            Color::Black => write!(f, "black"),
        }
    }
}

/// Where a stream's payload ended up, as decided by the stream/mini-stream
/// writers. Storages carry `Empty`.
#[derive(Debug, Clone, Copy)]
pub enum Placement {
    Empty,
    Large { start_sector: u32, size: u64 },
    Mini { start_minisector: u32, size: u64 },
}

/// UTF-16LE-encodes `name`, truncating to 31 code units if necessary
/// without splitting a surrogate pair, and appends the null terminator.
/// Returns the fixed 64-byte field and the byte length to store in
/// `name_length`.
fn encode_name(name: &str) -> ([u8; 64], u16) {
    let mut units: Vec<u16> = name.encode_utf16().collect();
    if units.len() > 31 {
        units.truncate(31);
        if matches!(units.last(), Some(&u) if (0xD800..=0xDBFF).contains(&u)) {
            units.pop();
        }
    }
    units.push(0);

    let mut field = [0u8; 64];
    for (i, unit) in units.iter().enumerate() {
        let bytes = unit.to_le_bytes();
        field[i * 2] = bytes[0];
        field[i * 2 + 1] = bytes[1];
    }
    (field, (units.len() * 2) as u16)
}

/// MS-CFB's uppercasing is a plain code-unit transform, not a locale- or
/// Unicode-aware case fold: `str::to_uppercase()` can change the number of
/// UTF-16 code units (e.g. `"ß"` becomes `"SS"`), which would desync the
/// length component of [`sibling_key`] from the very units being compared.
/// Only ASCII letters are folded; everything else passes through untouched.
fn ascii_upper_units(name: &str) -> Vec<u16> {
    name.encode_utf16()
        .map(|unit| if (0x61..=0x7A).contains(&unit) { unit - 0x20 } else { unit })
        .collect()
}

/// The CFB sibling sort key: UTF-16 code-unit length first, then an
/// ordinal, non-locale-aware uppercase comparison of the code units.
fn sibling_key(name: &str) -> (usize, Vec<u16>) {
    let units = ascii_upper_units(name);
    (units.len(), units)
}

fn root_entry(root_clsid: [u8; 16], mini_stream: Placement) -> Entry {
    let (name, name_length) = encode_name("Root Entry");
    let (starting_sector_location, stream_size) = match mini_stream {
        Placement::Empty => (SectorType::RegularSect(0), 0u64),
        Placement::Large { start_sector, size } => (SectorType::RegularSect(start_sector), size),
        Placement::Mini { .. } => unreachable!("mini-stream aggregate is always a large stream"),
    };
    Entry {
        name,
        name_length,
        object_type: ObjectType::RootStorage,
        color: Color::Black,
        left_sibling_id: SectorType::FreeSect,
        right_sibling_id: SectorType::FreeSect,
        child_id: SectorType::FreeSect,
        clsid: root_clsid,
        state_bits: 0,
        creation_time: 0,
        modified_time: 0,
        starting_sector_location,
        stream_size,
    }
}

fn node_entry(node: &TreeNode, placement: Placement) -> Entry {
    let (name, name_length) = encode_name(&node.name);
    let (starting_sector_location, stream_size) = match placement {
        Placement::Empty => (SectorType::RegularSect(0), 0u64),
        Placement::Large { start_sector, size } => (SectorType::RegularSect(start_sector), size),
        Placement::Mini { start_minisector, size } => (SectorType::RegularSect(start_minisector), size),
    };
    Entry {
        name,
        name_length,
        object_type: if node.is_file {
            ObjectType::Stream
        } else {
            ObjectType::Storage
        },
        color: Color::Black,
        left_sibling_id: SectorType::FreeSect,
        right_sibling_id: SectorType::FreeSect,
        child_id: SectorType::FreeSect,
        clsid: [0u8; 16],
        state_bits: 0,
        creation_time: 0,
        modified_time: 0,
        starting_sector_location,
        stream_size,
    }
}

/// Recursively builds a balanced binary tree over `indices` (directory
/// entry indices, sorted and split at the midpoint each level so depth
/// alternates evenly), assigning `color` to the node at this level and the
/// opposite color one level down, wiring `left_sibling_id`/`right_sibling_id`
/// in place, and returning the subtree's root entry index.
fn build_balanced_tree(
    entries: &mut [Entry],
    mut indices: Vec<usize>,
    color: Color,
) -> SectorType {
    if indices.is_empty() {
        return SectorType::FreeSect;
    }
    indices.sort_by(|&a, &b| sibling_key(&entries[a].name()).cmp(&sibling_key(&entries[b].name())));

    let mid = indices.len() / 2;
    let node_idx = indices[mid];
    let next_color = if color == Color::Black { Color::Red } else { Color::Black };

    let left = build_balanced_tree(entries, indices[..mid].to_vec(), next_color);
    let right = build_balanced_tree(entries, indices[mid + 1..].to_vec(), next_color);

    entries[node_idx].color = color;
    entries[node_idx].left_sibling_id = left;
    entries[node_idx].right_sibling_id = right;

    SectorType::RegularSect(node_idx as u32)
}

/// Builds every directory entry (root first, then one per tree node in
/// depth-first order) and wires up each storage's child sibling tree.
pub fn build_entries(
    nodes: &[TreeNode],
    placements: &[Placement],
    root_clsid: [u8; 16],
    mini_stream: Placement,
) -> Vec<Entry> {
    let mut entries = Vec::with_capacity(nodes.len() + 1);
    entries.push(root_entry(root_clsid, mini_stream));
    for (node, placement) in nodes.iter().zip(placements.iter()) {
        entries.push(node_entry(node, *placement));
    }

    // Group child entry indices by parent entry index; the root is parent
    // -1 represented here as `None`.
    let mut children: HashMap<Option<usize>, Vec<usize>> = HashMap::new();
    for (i, node) in nodes.iter().enumerate() {
        children.entry(node.parent_index).or_default().push(i + 1);
    }

    for (parent, kids) in children {
        let subtree_root = build_balanced_tree(&mut entries, kids, Color::Black);
        match parent {
            None => entries[0].child_id = subtree_root,
            Some(parent_entry_idx) => entries[parent_entry_idx + 1].child_id = subtree_root,
        }
    }

    entries
}

/// Writes `entries` into the directory sector chain, padding the final
/// sector with unallocated (all-zero) entries, and links the chain into
/// the primary FAT. Returns the starting sector number.
pub fn write(
    buf: &mut [u8],
    alloc: &mut Allocator,
    fat: &mut FatManager,
    entries: &[Entry],
) -> OleResult<u32> {
    let sector_count = (entries.len() as u32).div_ceil(DIR_ENTRIES_PER_SECTOR);
    let first_sector = alloc.take_sectors(sector_count)?;
    let first_entry = alloc.take_fat_entries(sector_count);

    for (i, entry) in entries.iter().enumerate() {
        let sector = first_sector + (i as u32 / DIR_ENTRIES_PER_SECTOR);
        let slot = i as u32 % DIR_ENTRIES_PER_SECTOR;
        let offset = Allocator::sector_offset(sector) + slot as usize * DIR_ENTRY_SIZE;
        let mut cursor = Cursor::new(&mut buf[offset..offset + DIR_ENTRY_SIZE]);
        entry.write_le(&mut cursor)?;
    }
    // Pad the rest of the final sector with unallocated entries; zero bytes
    // alone would decode the sibling/child fields as RegularSect(0) rather
    // than NOSTREAM, so each slot is written out explicitly.
    let unallocated = unallocated_entry();
    for i in entries.len()..(sector_count * DIR_ENTRIES_PER_SECTOR) as usize {
        let sector = first_sector + (i as u32 / DIR_ENTRIES_PER_SECTOR);
        let slot = i as u32 % DIR_ENTRIES_PER_SECTOR;
        let offset = Allocator::sector_offset(sector) + slot as usize * DIR_ENTRY_SIZE;
        let mut cursor = Cursor::new(&mut buf[offset..offset + DIR_ENTRY_SIZE]);
        unallocated.write_le(&mut cursor)?;
    }

    for i in 0..sector_count {
        let entry = first_entry + i;
        fat.update(buf, entry, SectorType::EndOfChain)?;
        if i > 0 {
            fat.update(buf, entry - 1, SectorType::RegularSect(first_sector + i))?;
        }
    }

    Ok(first_sector)
}

fn unallocated_entry() -> Entry {
    Entry {
        name: [0u8; 64],
        name_length: 0,
        object_type: ObjectType::Unknown,
        color: Color::Red,
        left_sibling_id: SectorType::FreeSect,
        right_sibling_id: SectorType::FreeSect,
        child_id: SectorType::FreeSect,
        clsid: [0u8; 16],
        state_bits: 0,
        creation_time: 0,
        modified_time: 0,
        starting_sector_location: SectorType::RegularSect(0),
        stream_size: 0,
    }
}
