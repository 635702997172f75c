//! Gorilla-style compression (delta-of-delta timestamps, XOR-coded doubles)
//! for ordered `(timestamp, f64)` samples, packed into fixed-capacity chunks.
//!
//! A chunk is append-only and decodes with forward-only iterators. When a
//! sample no longer fits, `append` fails without mutating the chunk and the
//! caller rotates to a new one.
//!
//! # Example
//!
//! ```
//! use doubledelta::chunk::CompressedChunk;
//!
//! let mut chunk = CompressedChunk::with_capacity(4096);
//! chunk.append(1000, 5.0).unwrap();
//! chunk.append(1010, 5.0).unwrap();
//! chunk.append(1020, 7.5).unwrap();
//!
//! let samples: Vec<(u64, f64)> = chunk.iter().collect();
//! assert_eq!(samples, vec![(1000, 5.0), (1010, 5.0), (1020, 7.5)]);
//! ```

pub mod bitstream;
pub mod chunk;
pub mod error;
mod helper;

pub use chunk::{ChunkIter, CompressedChunk};
pub use error::Error;
