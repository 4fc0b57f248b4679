//! The coordinating pipeline: one exclusively owned output buffer, built
//! straight through from size planning to the final header patch.

use crate::allocator::Allocator;
use crate::common::{OleError, OleResult, SectorType};
use crate::difat::DifatManager;
use crate::directory::{self, Placement};
use crate::fat::FatManager;
use crate::header::Header;
use crate::mini_fat::MiniFatManager;
use crate::mini_stream::MiniStreamBuffer;
use crate::path_tree::{self, TreeNode};
use crate::size_plan::SizePlan;
use crate::stream;
use binrw::BinWrite;
use std::io::Cursor;

/// Builds a complete CFB v3 byte buffer from a flat list of stream paths
/// and payloads plus the root storage's CLSID.
///
/// Mirrors the donor `CFBWriter`'s construction order: header, FAT, MiniFAT,
/// DIFAT, mini-stream, large streams, directory, then the header is patched
/// last once every start/count is known.
pub fn build(streams: &[(impl AsRef<str>, Option<Vec<u8>>)], root_clsid: [u8; 16]) -> OleResult<Vec<u8>> {
    let entries: Vec<(&str, bool)> = streams
        .iter()
        .map(|(p, payload)| (p.as_ref(), payload.is_some()))
        .collect();
    let nodes = path_tree::build(&entries)?;

    validate_payload_sizes(&nodes, streams)?;

    let storage_count = nodes.iter().filter(|n| !n.is_file).count() as u32;
    let stream_lengths: Vec<usize> = nodes
        .iter()
        .filter(|n| n.is_file)
        .map(|n| {
            streams[n.payload_index.expect("file node always carries a payload index")]
                .1
                .as_ref()
                .map(|p| p.len())
                .unwrap_or(0)
        })
        .collect();
    let plan = SizePlan::compute(&stream_lengths, storage_count);

    let mut buf = vec![0u8; plan.total_bytes()];
    let mut alloc = Allocator::new(plan.total_sectors);
    let mut header = Header::empty();
    let mut fat = FatManager::new();
    let mut minifat = MiniFatManager::new();
    let mut difat = DifatManager::new();

    // Header occupies sector offset 0 implicitly: it's the region before
    // sector 0, so no sector allocation call is needed for it.
    fat.allocate(&mut buf, &mut alloc, plan.fat_sectors)?;
    minifat.allocate(&mut buf, &mut alloc, &mut fat, plan.minifat_sectors)?;
    difat.allocate(&mut buf, &mut alloc, &mut fat, plan.difat_sectors)?;

    let mut mini_stream = MiniStreamBuffer::new(plan.mini_sectors);

    let mut placements = Vec::with_capacity(nodes.len());
    for node in &nodes {
        if !node.is_file {
            placements.push(Placement::Empty);
            continue;
        }
        let payload = streams[node.payload_index.unwrap()].1.as_deref().unwrap_or(&[]);
        let placement = if payload.len() as u32 >= crate::common::MINI_STREAM_CUTOFF {
            let start = stream::write(&mut buf, &mut alloc, &mut fat, payload)?;
            Placement::Large { start_sector: start, size: payload.len() as u64 }
        } else if payload.is_empty() {
            Placement::Empty
        } else {
            let start = mini_stream.write(&mut buf, &mut alloc, &mut minifat, payload)?;
            Placement::Mini { start_minisector: start, size: payload.len() as u64 }
        };
        placements.push(placement);
    }

    let mini_stream_placement = if mini_stream.is_empty() {
        Placement::Empty
    } else {
        let bytes = mini_stream.into_bytes();
        let start = stream::write(&mut buf, &mut alloc, &mut fat, &bytes)?;
        Placement::Large { start_sector: start, size: bytes.len() as u64 }
    };

    let entries = directory::build_entries(&nodes, &placements, root_clsid, mini_stream_placement);
    let dir_start = directory::write(&mut buf, &mut alloc, &mut fat, &entries)?;

    difat.record_fat_sectors(&mut buf, &mut header, &fat)?;

    header.fat_sector_count = fat.sector_count();
    header.dir_start = SectorType::RegularSect(dir_start);
    if let Some(start) = minifat.start_sector() {
        header.minifat_start = SectorType::RegularSect(start);
        header.minifat_count = minifat.sector_count();
    }
    if let Some(start) = difat.start_sector() {
        header.difat_start = SectorType::RegularSect(start);
        header.difat_count = difat.sector_count();
    }

    let mut header_cursor = Cursor::new(&mut buf[0..512]);
    header.write_le(&mut header_cursor)?;

    Ok(buf)
}

fn validate_payload_sizes(
    nodes: &[TreeNode],
    streams: &[(impl AsRef<str>, Option<Vec<u8>>)],
) -> OleResult<()> {
    for node in nodes {
        if let Some(idx) = node.payload_index {
            if let Some(payload) = &streams[idx].1 {
                if payload.len() > i32::MAX as usize {
                    return Err(OleError::PayloadTooLarge {
                        path: streams[idx].0.as_ref().to_string(),
                        len: payload.len(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// A convenience builder mirroring the donor `CFBWriter`'s shape for
/// callers who prefer constructing a value over calling a free function.
pub struct CfbWriter {
    streams: Vec<(String, Option<Vec<u8>>)>,
    root_clsid: [u8; 16],
}

impl CfbWriter {
    pub fn new(root_clsid: [u8; 16]) -> CfbWriter {
        CfbWriter {
            streams: Vec::new(),
            root_clsid,
        }
    }

    pub fn add_stream(&mut self, path: impl Into<String>, payload: Vec<u8>) -> &mut Self {
        self.streams.push((path.into(), Some(payload)));
        self
    }

    pub fn add_storage(&mut self, path: impl Into<String>) -> &mut Self {
        self.streams.push((path.into(), None));
        self
    }

    pub fn build(&self) -> OleResult<Vec<u8>> {
        build(&self.streams, self.root_clsid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_produces_the_minimal_three_sector_file() {
        let streams: Vec<(&str, Option<Vec<u8>>)> = vec![];
        let buf = build(&streams, [0u8; 16]).unwrap();
        assert_eq!(buf.len(), 512 + 512 + 512);
        assert_eq!(&buf[0..8], &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]);
    }

    #[test]
    fn single_small_stream_round_trips_through_the_mini_stream() {
        let streams: Vec<(&str, Option<Vec<u8>>)> = vec![("small.bin", Some(b"hi".to_vec()))];
        let buf = build(&streams, [0u8; 16]).unwrap();
        assert!(buf.len() > 1536);
    }

    #[test]
    fn single_large_stream_round_trips_through_the_fat_chain() {
        let payload = vec![0x11u8; 5000];
        let streams: Vec<(&str, Option<Vec<u8>>)> = vec![("big.bin", Some(payload))];
        let buf = build(&streams, [0u8; 16]).unwrap();
        assert!(buf.len() >= 512 * 2 + 5000);
    }

    #[test]
    fn nested_storage_builds_without_error() {
        let streams: Vec<(&str, Option<Vec<u8>>)> = vec![
            ("a/b/c.bin", Some(vec![1, 2, 3])),
            ("a/d.bin", Some(vec![4, 5, 6])),
        ];
        let buf = build(&streams, [0u8; 16]).unwrap();
        assert!(!buf.is_empty());
    }

    #[test]
    fn builder_type_matches_the_free_function() {
        let mut writer = CfbWriter::new([0u8; 16]);
        writer.add_stream("readme.txt", b"hello".to_vec());
        let via_builder = writer.build().unwrap();
        let via_function: Vec<(&str, Option<Vec<u8>>)> =
            vec![("readme.txt", Some(b"hello".to_vec()))];
        let via_free_fn = build(&via_function, [0u8; 16]).unwrap();
        assert_eq!(via_builder, via_free_fn);
    }
}
