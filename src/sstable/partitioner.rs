use std::hash::Hasher;
use twox_hash::XxHash64;

/// The only partitioner this build understands. Metadata fetched from a
/// peer naming any other partitioner is rejected at bootstrap.
pub const PARTITIONER_NAME: &str = "XxHash64Partitioner";

pub fn is_supported(name: &str) -> bool {
    name == PARTITIONER_NAME
}

/// Token of a partition key. Tokens only need a stable total order, so the
/// raw 64-bit hash reinterpreted as a signed value is enough.
pub fn partition_token(key: &[u8]) -> i64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(key);
    hasher.finish() as i64
}
