//! Turns a flat list of stream paths into the ordered, depth-first tree of
//! storages and streams that the directory builder walks.

use crate::common::{OleError, OleResult};
use std::collections::HashMap;

/// One node of the flattened path tree: either a stream (leaf, carries a
/// payload) or an implicit storage (directory) created because some stream
/// path runs through it.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub is_file: bool,
    /// Index into the caller's original `streams` slice, if this node is a
    /// stream.
    pub payload_index: Option<usize>,
    /// Index of this node's parent within the returned `Vec`, or `None` for
    /// a top-level node (implicit child of the root).
    pub parent_index: Option<usize>,
}

fn split_segments(path: &str) -> OleResult<Vec<&str>> {
    if path.is_empty() || path.starts_with('/') || path.starts_with('\\') {
        return Err(OleError::InvalidPath(path.to_string()));
    }
    let segments: Vec<&str> = path.split(|c| c == '/' || c == '\\').collect();
    if segments.iter().any(|s| s.is_empty() || *s == "..") {
        return Err(OleError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

/// Builds the depth-first, stably-sorted tree described by a flat list of
/// stream/storage entries.
///
/// `entries[i]` is `(path, has_payload)` for the node whose payload is
/// `payload_index == Some(i)` in the returned nodes; `has_payload` is
/// exactly the caller's `payload.is_some()` for that entry (per the input
/// API, `None` means storage, `Some` means stream — never inferred from the
/// name). Every intermediate segment of every path becomes a storage node
/// even when it never appears on its own in `entries`.
pub fn build(entries: &[(impl AsRef<str>, bool)]) -> OleResult<Vec<TreeNode>> {
    // First pass: collect every unique path prefix exactly once, recording
    // for leaf segments which input entry produced them. The map's value
    // also records the immediate parent key so the second pass can group
    // siblings without re-splitting paths.
    struct Unique {
        parts: Vec<String>,
        is_file: bool,
        payload_index: Option<usize>,
    }
    let mut visited: HashMap<String, Unique> = HashMap::new();
    let mut children: HashMap<String, Vec<String>> = HashMap::new();

    for (idx, (path, has_payload)) in entries.iter().enumerate() {
        let path = path.as_ref();
        let segments = split_segments(path)?;
        for i in 1..=segments.len() {
            let key = segments[..i].join("/");
            if visited.contains_key(&key) {
                continue;
            }
            let is_last = i == segments.len();
            visited.insert(
                key.clone(),
                Unique {
                    parts: segments[..i].iter().map(|s| s.to_string()).collect(),
                    is_file: is_last && *has_payload,
                    payload_index: if is_last { Some(idx) } else { None },
                },
            );
            let parent_key = if i > 1 {
                segments[..i - 1].join("/")
            } else {
                String::new()
            };
            children.entry(parent_key).or_default().push(key);
        }
    }

    for sibs in children.values_mut() {
        sibs.sort_by(|a, b| case_insensitive_key(a).cmp(&case_insensitive_key(b)));
    }

    // Second pass: a true depth-first walk — visit a node, then recurse into
    // each of its children (in sorted order) before moving to the next
    // sibling — so every node's whole subtree is contiguous in the output.
    let mut nodes = Vec::with_capacity(visited.len());
    let mut stack: Vec<(String, Option<usize>)> =
        children.get("").cloned().unwrap_or_default().into_iter().map(|k| (k, None)).collect();
    stack.reverse();

    while let Some((key, parent_index)) = stack.pop() {
        let unique = visited.remove(&key).expect("key was inserted in first pass");
        let this_index = nodes.len();
        nodes.push(TreeNode {
            name: unique.parts.last().cloned().unwrap_or_default(),
            is_file: unique.is_file,
            payload_index: unique.payload_index,
            parent_index,
        });
        if let Some(kids) = children.get(&key) {
            for kid in kids.iter().rev() {
                stack.push((kid.clone(), Some(this_index)));
            }
        }
    }

    Ok(nodes)
}

fn case_insensitive_key(path: &str) -> String {
    path.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_top_level_stream_has_no_parent() {
        let nodes = build(&[("readme.txt", true)]).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "readme.txt");
        assert!(nodes[0].is_file);
        assert_eq!(nodes[0].payload_index, Some(0));
        assert_eq!(nodes[0].parent_index, None);
    }

    #[test]
    fn intermediate_segments_become_implicit_storages() {
        let nodes = build(&[("a/b/c.bin", true)]).unwrap();
        assert_eq!(nodes.len(), 3);
        let a = nodes.iter().position(|n| n.name == "a").unwrap();
        let b = nodes.iter().position(|n| n.name == "b").unwrap();
        let c = nodes.iter().position(|n| n.name == "c.bin").unwrap();
        assert!(!nodes[a].is_file);
        assert_eq!(nodes[a].parent_index, None);
        assert!(!nodes[b].is_file);
        assert_eq!(nodes[b].parent_index, Some(a));
        assert!(nodes[c].is_file);
        assert_eq!(nodes[c].parent_index, Some(b));
        assert_eq!(nodes[c].payload_index, Some(0));
    }

    #[test]
    fn shared_prefixes_deduplicate_to_one_storage_node() {
        let nodes = build(&[("dir/one.txt", true), ("dir/two.txt", true)]).unwrap();
        // "dir" appears once even though both paths run through it.
        assert_eq!(nodes.iter().filter(|n| n.name == "dir").count(), 1);
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn parents_precede_children_in_depth_first_order() {
        let nodes = build(&[("a/b/c.bin", true), ("a/d.bin", true)]).unwrap();
        for (i, node) in nodes.iter().enumerate() {
            if let Some(parent) = node.parent_index {
                assert!(parent < i, "parent must be emitted before its child");
            }
        }
    }

    #[test]
    fn a_subtree_is_emitted_contiguously_before_the_next_sibling() {
        // "a"'s whole subtree (a, a/b, a/b/c.bin) must appear before "z.bin",
        // a later top-level sibling — not interleaved by depth.
        let nodes = build(&[("a/b/c.bin", true), ("z.bin", true)]).unwrap();
        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c.bin", "z.bin"]);
    }

    #[test]
    fn absolute_path_is_rejected() {
        assert!(matches!(
            build(&[("/etc/passwd", true)]),
            Err(OleError::InvalidPath(_))
        ));
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(build(&[("", true)]), Err(OleError::InvalidPath(_))));
    }

    #[test]
    fn dot_dot_segment_is_rejected() {
        assert!(matches!(
            build(&[("a/../b.txt", true)]),
            Err(OleError::InvalidPath(_))
        ));
    }

    #[test]
    fn a_stream_name_without_a_dot_is_still_a_stream() {
        // Stream-vs-storage is decided by the caller's payload, never by
        // whether the name looks like a file name: many real CFB streams
        // (e.g. "WordDocument") carry no extension at all.
        let nodes = build(&[("WordDocument", true)]).unwrap();
        assert!(nodes[0].is_file);
    }

    #[test]
    fn an_explicit_storage_with_a_dotted_name_is_still_a_storage() {
        let nodes = build(&[("storage.like", false)]).unwrap();
        let leaf = nodes.iter().find(|n| n.name == "storage.like").unwrap();
        assert!(!leaf.is_file);
    }
}
