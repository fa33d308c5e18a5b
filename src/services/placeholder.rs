use rand::Rng;

/// Length of the random suffix appended to every placeholder key
pub const SUFFIX_LEN: usize = 7;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Fresh transient key for a loading placeholder: `{prefix}-{7 base36 chars}`
///
/// Only unique within a single render pass. Never persist these or compare
/// them across renders; every call draws a new suffix.
pub fn generate(prefix: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = std::iter::repeat_with(|| BASE36[rng.random_range(0..BASE36.len())] as char)
        .take(SUFFIX_LEN)
        .collect();
    format!("{}-{}", prefix, suffix)
}

/// `count` fresh keys for one list of placeholders
pub fn generate_many(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|_| generate(prefix)).collect()
}
