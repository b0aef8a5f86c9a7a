//! Diff, inverse patch, and undo history engine for drawnet documents.
//!
//! An edit is a [`Patch`]: a recursive partial document in which any key
//! may be replaced, merged into, or removed with the `{"deleted": true}`
//! marker. Applying a patch rewrites only the positions it names and
//! rechecks the invariants those positions can affect. A rejected patch
//! leaves the drawing as it was.
//!
//! The inverse of a patch is captured from the pre-image of every touched
//! path when the patch is applied, so undo is exact by construction. A
//! [`Document`] strings edits together into a linear undo/redo history and
//! an [`Operation`] log that [`replay`] can rebuild a snapshot from.

pub mod apply;
pub mod differ;
pub mod document;
pub mod drawing;
pub mod error;
pub mod history;
pub mod operation;
pub mod patch;

pub use apply::{apply, apply_in_place, apply_with_inverse, inverse};
pub use differ::{diff, diff_filtered, values_equal, DiffFilter};
pub use document::{replay, Document};
pub use error::PatchError;
pub use history::History;
pub use operation::{Operation, OperationType};
pub use patch::{MergePolicy, Patch, PatchNode, Patchable};
