//! Core value types of the collection engine.

pub(crate) mod candidate_item;
pub(crate) mod cell_ref;
mod checkpoint;
pub(crate) mod field_record;
pub(crate) mod hyperlink;
#[cfg(test)]
mod hyperlink_test;
mod phase;

pub use candidate_item::{CandidateItem, QUEUE_KEY_COLUMN, QUEUE_URL_COLUMN};
pub use cell_ref::{CellRef, column_letters};
pub use checkpoint::{CHECKPOINT_VERSION, Checkpoint};
pub use field_record::{DETAIL_UNAVAILABLE, FieldRecord, missing_field};
pub use hyperlink::{decode_hyperlink, encode_hyperlink, is_url};
pub use phase::Phase;

/// One emitted row: ordered cell strings matching a worksheet header.
pub type SinkRow = Vec<String>;
