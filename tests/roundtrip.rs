//! Property-based round-trip tests for the compressed chunk.
//!
//! Values are drawn from arbitrary 64-bit patterns, so NaNs, infinities and
//! subnormals are all in play; comparisons are on bit patterns, not on `==`.

use doubledelta::chunk::CompressedChunk;
use doubledelta::error::Error;
use proptest::prelude::*;

/// Monotonic timestamps (zero deltas allowed) paired with arbitrary values.
fn samples_strategy() -> impl Strategy<Value = Vec<(u64, f64)>> {
    (
        0_u64..1_000_000_000_000,
        prop::collection::vec((0_u64..1_000_000_000, any::<u64>()), 1..100),
    )
        .prop_map(|(base, steps)| {
            let mut ts = base;
            steps
                .into_iter()
                .map(|(delta, bits)| {
                    ts += delta;
                    (ts, f64::from_bits(bits))
                })
                .collect()
        })
}

/// Regular cadence with slowly varying values, the shape chunks see in practice.
fn typical_series_strategy() -> impl Strategy<Value = Vec<(u64, f64)>> {
    (1_u64..1000, 1_usize..200).prop_flat_map(|(interval, count)| {
        let start = 1_600_000_000_u64;
        prop::collection::vec(-1000.0_f64..1000.0, count).prop_map(move |values| {
            values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (start + i as u64 * interval, v))
                .collect()
        })
    })
}

fn decode(chunk: &CompressedChunk) -> Vec<(u64, u64)> {
    chunk.iter().map(|(t, v)| (t, v.to_bits())).collect()
}

proptest! {
    #[test]
    fn roundtrip_arbitrary_patterns(samples in samples_strategy()) {
        let mut chunk = CompressedChunk::with_capacity(samples.len() * 24 + 64);
        for &(t, v) in &samples {
            chunk.append(t, v).unwrap();
        }

        let exp: Vec<(u64, u64)> = samples.iter().map(|&(t, v)| (t, v.to_bits())).collect();
        prop_assert_eq!(decode(&chunk), exp);
    }

    #[test]
    fn roundtrip_typical_series(samples in typical_series_strategy()) {
        let mut chunk = CompressedChunk::with_capacity(samples.len() * 24 + 64);
        for &(t, v) in &samples {
            chunk.append(t, v).unwrap();
        }

        let exp: Vec<(u64, u64)> = samples.iter().map(|&(t, v)| (t, v.to_bits())).collect();
        prop_assert_eq!(decode(&chunk), exp);
    }

    #[test]
    fn full_chunk_rejects_atomically(samples in samples_strategy()) {
        let mut chunk = CompressedChunk::with_capacity(32);
        let mut appended = Vec::new();

        for &(t, v) in &samples {
            let before = chunk.to_bytes();
            match chunk.append(t, v) {
                Ok(()) => appended.push((t, v.to_bits())),
                Err(Error::CapacityExceeded) => {
                    prop_assert_eq!(chunk.to_bytes(), before);
                    break;
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        prop_assert_eq!(chunk.num_samples(), appended.len() as u64);
        prop_assert_eq!(decode(&chunk), appended);
    }

    #[test]
    fn serialization_preserves_samples(samples in typical_series_strategy()) {
        let mut chunk = CompressedChunk::with_capacity(samples.len() * 24 + 64);
        for &(t, v) in &samples {
            chunk.append(t, v).unwrap();
        }

        let restored = CompressedChunk::from_bytes(&chunk.to_bytes()).unwrap();
        prop_assert_eq!(decode(&restored), decode(&chunk));
    }
}
