//! Fetching the speed test tool and the Cloudflare IP list.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use futures::stream::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use reqwest::Client;

use crate::error::DownloadError;

/// Downloads `url` to `dest`, one attempt, bounded by `timeout`.
///
/// The body is streamed into `<dest>.part` and renamed when complete, so an
/// interrupted download never looks like a finished file.
pub async fn download_file(
    client: &Client,
    url: &str,
    dest: &Path,
    timeout: Duration,
) -> Result<(), DownloadError> {
    info!("下载地址: {}", url);

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?;

    let pb = match response.content_length() {
        Some(len) => {
            let pb = ProgressBar::new(len);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let part = part_path(dest);
    let written = stream_to_file(response, &part, &pb).await;
    pb.finish_and_clear();
    if let Err(e) = written {
        let _ = std::fs::remove_file(&part);
        return Err(e);
    }

    std::fs::rename(&part, dest)?;
    Ok(())
}

async fn stream_to_file(
    response: reqwest::Response,
    path: &Path,
    pb: &ProgressBar,
) -> Result<(), DownloadError> {
    let mut file = File::create(path)?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        pb.inc(chunk.len() as u64);
    }
    file.flush()?;
    Ok(())
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Unpacks a `.tar.gz` into `dest_dir` and returns the path of `executable`
/// inside it, made executable on Unix.
pub async fn extract_executable(
    archive: &Path,
    dest_dir: &Path,
    executable: &str,
    timeout: Duration,
) -> Result<PathBuf, DownloadError> {
    info!("解压文件...");
    let archive = archive.to_path_buf();
    let dir = dest_dir.to_path_buf();
    let unpack = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let file = File::open(&archive)?;
        tar::Archive::new(GzDecoder::new(file)).unpack(&dir)
    });

    match tokio::time::timeout(timeout, unpack).await {
        Ok(joined) => joined.map_err(std::io::Error::other)??,
        Err(_) => return Err(DownloadError::ExtractTimeout(timeout)),
    }

    let tool = dest_dir.join(executable);
    if !tool.is_file() {
        return Err(DownloadError::MissingExecutable(tool));
    }
    make_executable(&tool)?;
    Ok(tool)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
