use rand::{rng, Rng};

const CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const BASE: u64 = CHARSET.len() as u64;

/// Converts a number to base62 representation (0-9, A-Z, a-z)
pub fn encode(mut num: u64) -> String {
    if num == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while num > 0 {
        digits.push(CHARSET[(num % BASE) as usize] as char);
        num /= BASE;
    }

    digits.iter().rev().collect()
}

/// Generates a random base62 character
pub fn random_char() -> char {
    CHARSET[rng().random_range(0..CHARSET.len())] as char
}

#[cfg(test)]
pub fn is_base62(s: &str) -> bool {
    s.bytes().all(|b| CHARSET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode(0), "0");
        assert_eq!(encode(61), "z");
        assert_eq!(encode(62), "10");
        assert_eq!(encode(u64::MAX), "LygHa16AHYF");
    }
}
