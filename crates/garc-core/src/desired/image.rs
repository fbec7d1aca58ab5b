//! Docker image reference normalization.
//!
//! Mirrors the reference grammar used by container registries: a reference is
//! `[domain/]path[:tag][@digest]`, where a missing domain means Docker Hub and
//! a single-component Docker Hub path lives under `library/`.
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

const DEFAULT_DOMAIN: &str = "docker.io";
const LEGACY_DEFAULT_DOMAIN: &str = "index.docker.io";
const OFFICIAL_REPO_PREFIX: &str = "library/";
const NAME_TOTAL_LENGTH_MAX: usize = 255;

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    let alnum = r"[a-z0-9]+";
    let separator = r"(?:[._]|__|[-]+)";
    let path_component = format!(r"{alnum}(?:{separator}{alnum})*");
    let domain_component = r"(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])";
    let domain = format!(r"{domain_component}(?:\.{domain_component})*(?::[0-9]+)?");
    let tag = r"[\w][\w.-]{0,127}";
    let digest = r"[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9a-fA-F]{32,}";

    Regex::new(&format!(
        r"^(?:(?P<domain>{domain})/)?(?P<path>{path_component}(?:/{path_component})*)(?::{tag})?(?:@{digest})?$"
    ))
    .expect("reference grammar is a valid regex")
});

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9]{64}$").expect("identifier pattern is a valid regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageRefError {
    #[error("invalid reference format: {0}")]
    Format(String),

    #[error("repository name must be lowercase: {0}")]
    Uppercase(String),

    #[error("repository name must not be longer than {NAME_TOTAL_LENGTH_MAX} characters")]
    NameTooLong,

    #[error("reference is a bare image id, not a repository name")]
    Identifier,
}

/// Returns the fully qualified repository name of `reference` with any tag and digest removed.
///
/// `alpine:3.18` becomes `docker.io/library/alpine`;
/// `ghcr.io/org/img@sha256:…` becomes `ghcr.io/org/img`.
pub fn normalize_repository(reference: &str) -> Result<String, ImageRefError> {
    if IDENTIFIER.is_match(reference) {
        return Err(ImageRefError::Identifier);
    }

    let (domain, remainder) = split_domain(reference);
    let remote = remainder.split(':').next().unwrap_or(&remainder);
    if remote.to_lowercase() != remote {
        return Err(ImageRefError::Uppercase(remote.to_string()));
    }

    let qualified = format!("{domain}/{remainder}");
    let caps = REFERENCE
        .captures(&qualified)
        .ok_or_else(|| ImageRefError::Format(reference.to_string()))?;

    let name = match (caps.name("domain"), caps.name("path")) {
        (Some(d), Some(p)) => format!("{}/{}", d.as_str(), p.as_str()),
        (None, Some(p)) => p.as_str().to_string(),
        _ => return Err(ImageRefError::Format(reference.to_string())),
    };
    if name.len() > NAME_TOTAL_LENGTH_MAX {
        return Err(ImageRefError::NameTooLong);
    }
    Ok(name)
}

fn split_domain(name: &str) -> (String, String) {
    let (mut domain, mut remainder) = match name.split_once('/') {
        Some((first, rest))
            if first.contains(['.', ':'])
                || first == "localhost"
                || first.to_lowercase() != first =>
        {
            (first.to_string(), rest.to_string())
        }
        _ => (DEFAULT_DOMAIN.to_string(), name.to_string()),
    };

    if domain == LEGACY_DEFAULT_DOMAIN {
        domain = DEFAULT_DOMAIN.to_string();
    }
    if domain == DEFAULT_DOMAIN && !remainder.contains('/') {
        remainder = format!("{OFFICIAL_REPO_PREFIX}{remainder}");
    }
    (domain, remainder)
}
