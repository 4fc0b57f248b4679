//! A single-pass writer for the Compound File Binary (CFB/OLE2) container
//! format — the structured-storage container used by legacy `.doc`, `.xls`,
//! and `.msi` files.
//!
//! Given an ordered list of relative stream paths (with payloads for
//! streams, `None` for storages) and a root CLSID, [`writer::build`]
//! computes the full sector layout in one pass and returns a complete CFB
//! v3 byte buffer. There is no reader here and no support for appending to
//! an existing file — see the crate's `SPEC_FULL.md` for the full scope.

pub mod allocator;
pub mod common;
pub mod difat;
pub mod directory;
pub mod fat;
pub mod header;
pub mod mini_fat;
pub mod mini_stream;
pub mod path_tree;
pub mod size_plan;
pub mod stream;
pub mod writer;

pub use common::{OleError, OleResult};
pub use writer::{build, CfbWriter};
