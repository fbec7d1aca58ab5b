//! Installs the GitHub Actions runner distribution into the working directory.
use std::io::Cursor;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::info;

use garc_exec::{CommandSpec, LogConfig, run_checked};

use crate::error::AgentError;

/// Download URL of the linux x64 tarball for `version`.
pub fn download_url(base: &str, version: &str) -> String {
    format!(
        "{}/v{version}/actions-runner-linux-x64-{version}.tar.gz",
        base.trim_end_matches('/')
    )
}

/// Unpacks a gzipped tarball into `dest`, keeping each entry's mode bits.
pub fn unpack_archive(bytes: &[u8], dest: &Path) -> Result<(), AgentError> {
    let mut archive = Archive::new(GzDecoder::new(Cursor::new(bytes)));
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);
    archive
        .unpack(dest)
        .map_err(|e| AgentError::Install(format!("unpack into {}: {e}", dest.display())))
}

/// Downloads and unpacks the runner, then installs its OS dependencies.
pub async fn install_runner(
    http: &reqwest::Client,
    base: &str,
    version: &str,
    dest: &Path,
) -> Result<(), AgentError> {
    let url = download_url(base, version);
    info!(%url, "downloading runner");

    let resp = http.get(&url).send().await?;
    if !resp.status().is_success() {
        return Err(AgentError::Install(format!(
            "download {url}: status {}",
            resp.status()
        )));
    }
    let bytes = resp.bytes().await?;

    let target: PathBuf = dest.to_path_buf();
    tokio::task::spawn_blocking(move || unpack_archive(&bytes, &target))
        .await
        .map_err(|e| AgentError::Install(format!("unpack task: {e}")))??;
    info!(dest = %dest.display(), "runner unpacked");

    let deps = CommandSpec::new("bash")
        .arg("bin/installdependencies.sh")
        .current_dir(dest);
    run_checked(&deps, LogConfig::default()).await?;
    info!("runner dependencies installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use axum::{Router, routing::get};
    use flate2::{Compression, write::GzEncoder};

    use super::*;

    fn tarball(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
        for (path, data, mode) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn url_matches_release_layout() {
        assert_eq!(
            download_url("https://github.com/actions/runner/releases/download/", "2.321.0"),
            "https://github.com/actions/runner/releases/download/v2.321.0/actions-runner-linux-x64-2.321.0.tar.gz"
        );
    }

    #[test]
    fn unpack_preserves_modes() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = tarball(&[
            ("run.sh", b"#!/bin/bash\n", 0o755),
            ("bin/data.json", b"{}", 0o600),
        ]);

        unpack_archive(&bytes, dir.path()).unwrap();

        let mode = |p: &str| {
            std::fs::metadata(dir.path().join(p))
                .unwrap()
                .permissions()
                .mode()
                & 0o777
        };
        assert_eq!(mode("run.sh"), 0o755);
        assert_eq!(mode("bin/data.json"), 0o600);
    }

    #[test]
    fn corrupt_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = unpack_archive(b"definitely not gzip", dir.path()).unwrap_err();
        assert!(matches!(err, AgentError::Install(_)));
    }

    #[tokio::test]
    async fn installs_from_release_server() {
        let bytes = tarball(&[
            ("bin/installdependencies.sh", b"touch deps-installed\n", 0o755),
            ("config.sh", b"exit 0\n", 0o755),
        ]);
        let app = Router::new().route(
            "/v9.9.9/actions-runner-linux-x64-9.9.9.tar.gz",
            get(move || {
                let bytes = bytes.clone();
                async move { bytes }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let dir = tempfile::tempdir().unwrap();
        install_runner(&reqwest::Client::new(), &base, "9.9.9", dir.path())
            .await
            .unwrap();

        assert!(dir.path().join("config.sh").exists());
        assert!(dir.path().join("deps-installed").exists());
    }

    #[tokio::test]
    async fn missing_release_is_fatal() {
        let app = Router::new();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let dir = tempfile::tempdir().unwrap();
        let err = install_runner(&reqwest::Client::new(), &base, "1.0.0", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Install(_)));
    }
}
