use rand::{rng, Rng};

use super::base62;

/// Length of generated short ids
pub const SHORT_ID_LENGTH: usize = 8;

/// Generates a short id of exactly `length` base62 characters from a random value
pub fn generate_short_id(length: usize) -> String {
    let random_id: u64 = rng().random();
    let mut encoded = base62::encode(random_id);

    while encoded.len() < length {
        encoded.push(base62::random_char());
    }
    encoded.truncate(length);

    encoded
}
