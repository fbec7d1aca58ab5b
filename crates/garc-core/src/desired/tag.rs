use sha2::{Digest, Sha256};
use tracing::debug;

use super::image::normalize_repository;

/// Number of hex characters kept from the digest.
const TAG_LEN: usize = 7;

/// Repository name under which the built runner image is pushed and pulled.
///
/// Pure function of the base image and the two version pins: the same inputs
/// always produce the same tag, so an unchanged Runner never yields a new image
/// reference. The base image tag does not take part (only the normalized
/// repository name does); an unparsable reference is hashed verbatim.
pub fn repository_tag(image: &str, binary_version: &str, runner_version: &str) -> String {
    let base = match normalize_repository(image) {
        Ok(name) => name,
        Err(e) => {
            debug!(image, error = %e, "image reference not normalizable; hashing it verbatim");
            image.to_string()
        }
    };

    let mut hasher = Sha256::new();
    hasher.update(base.as_bytes());
    hasher.update(binary_version.as_bytes());
    hasher.update(runner_version.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..TAG_LEN].to_string()
}
