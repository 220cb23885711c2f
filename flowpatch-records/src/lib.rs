//! Record collection storage: the loader and the writer.
//!
//! The loader is strict about shape (an array of objects, each with a string identifier) and
//! tolerant about everything else: unknown fields, key order and number literals round-trip.
//! The writer never leaves the destination half-written.

mod error;
mod load;
mod save;

pub use error::{LoadError, MalformedInputError, SaveError};
pub use load::{load_records, parse_records};
pub use save::{backup_file, render_records, save_records, write_atomic};
