//! Primary-key generators compared by the keybench load generator.
//!
//! Every generator writes a 16 byte key. [`KeyGenerator::TimeOrdered`] puts a
//! 100ns tick count first so that keys sort by creation time, while
//! [`KeyGenerator::TimeOrderedTruncated`] reproduces the byte shuffling that
//! happens when such a key is re-parsed by an implementation that stores the
//! leading fields little-endian.

pub mod error;
pub mod generator;
pub mod key;
pub mod ticks;

pub use error::{GenerationError, ParseKindError};
pub use generator::{lay_out_time_ordered, reorder_through_text, GeneratorKind, KeyGenerator};
pub use key::{Key, KEY_LEN};
pub use ticks::ticks_since_gregorian_reform;
