use rand::Rng;

pub const REFERENCE_CODE_PREFIX: &str = "PSD-";
pub const REFERENCE_CODE_LENGTH: usize = 8;

/// Upper-case letters and digits without the look-alikes 0/O and 1/I.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Short human-shareable code, e.g. `PSD-7KQ2M9XA`.
pub fn generate_reference_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REFERENCE_CODE_LENGTH)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{REFERENCE_CODE_PREFIX}{suffix}")
}

pub fn is_reference_code(value: &str) -> bool {
    value
        .strip_prefix(REFERENCE_CODE_PREFIX)
        .is_some_and(|suffix| {
            suffix.len() == REFERENCE_CODE_LENGTH && suffix.bytes().all(|b| ALPHABET.contains(&b))
        })
}
