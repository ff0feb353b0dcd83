use rand::Rng;
use rand::distr::Alphanumeric;

/// Generate a random alphanumeric password for provisioned accounts.
pub fn generate_password(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
