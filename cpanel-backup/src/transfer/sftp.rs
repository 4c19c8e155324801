//! Native SFTP upload over libssh2.

use super::{file_name_of, Destination, TransferResult, Transporter};
use crate::config::TransferMethod;
use crate::utils::errors::{BackupError, Result};
use crate::watcher::progress::format_bytes;
use async_trait::async_trait;
use std::io::BufReader;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

/// Uploads with password authentication, creating remote directories first
pub struct SftpTransporter {
    timeout: Duration,
}

impl SftpTransporter {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Transporter for SftpTransporter {
    fn method(&self) -> TransferMethod {
        TransferMethod::Sftp
    }

    async fn send(&self, local_path: &Path, destination: &Destination) -> TransferResult {
        let file_name = file_name_of(local_path);
        info!("Uploading to {} via SFTP...", destination.remote_url(&file_name));

        let local = local_path.to_path_buf();
        let dest = destination.clone();
        let timeout = self.timeout;

        // libssh2 is blocking
        let joined = tokio::task::spawn_blocking(move || {
            let mut transcript = Vec::new();
            let result = upload_via_sftp(&local, &dest, timeout, &mut transcript);
            (result, transcript)
        })
        .await;

        match joined {
            Ok((Ok(_bytes), transcript)) => {
                info!("[SUCCESS] Upload complete.");
                TransferResult::succeeded(None, transcript.join("\n"))
            }
            Ok((Err(e), mut transcript)) => {
                transcript.push(format!("error: {}", e));
                let output = transcript.join("\n");
                error!("SFTP upload failed:\n{}", output);
                TransferResult::failed(None, output)
            }
            Err(e) => {
                error!("SFTP upload task failed: {}", e);
                TransferResult::failed(None, format!("upload task failed: {}", e))
            }
        }
    }
}

fn upload_via_sftp(
    local: &Path,
    dest: &Destination,
    timeout: Duration,
    transcript: &mut Vec<String>,
) -> Result<u64> {
    let addr = (dest.host.as_str(), dest.port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| BackupError::Config(format!("cannot resolve {}", dest.host)))?;

    let tcp = TcpStream::connect_timeout(&addr, timeout)?;
    transcript.push(format!("Connected to {}:{}", dest.host, dest.port));

    let mut sess = ssh2::Session::new()?;
    sess.set_tcp_stream(tcp);
    sess.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
    sess.handshake()?;

    sess.userauth_password(&dest.username, &dest.password)
        .map_err(|e| BackupError::Authentication(format!("SSH authentication failed: {}", e)))?;
    if !sess.authenticated() {
        return Err(BackupError::Authentication("SSH authentication failed".to_string()));
    }
    transcript.push(format!("Authenticated as {}", dest.username));

    let sftp = sess.sftp()?;
    ensure_remote_dir(&sftp, &dest.remote_dir, transcript)?;

    let remote_path = PathBuf::from(dest.remote_path(&file_name_of(local)));
    let mut reader = BufReader::new(std::fs::File::open(local)?);
    let mut remote_file = sftp.create(&remote_path)?;
    let bytes = std::io::copy(&mut reader, &mut remote_file)?;
    drop(remote_file);

    // closing flushes the last packets; confirm the server kept everything
    let remote_size = sftp.stat(&remote_path)?.size.unwrap_or(0);
    if remote_size != bytes {
        return Err(BackupError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!(
                "remote size {} does not match uploaded {} bytes",
                remote_size, bytes
            ),
        )));
    }

    transcript.push(format!(
        "Uploaded {} to {}",
        format_bytes(bytes),
        remote_path.display()
    ));
    Ok(bytes)
}

/// `mkdir -p` over SFTP
fn ensure_remote_dir(sftp: &ssh2::Sftp, remote_dir: &str, transcript: &mut Vec<String>) -> Result<()> {
    let mut current = PathBuf::from("/");
    for component in remote_dir.split('/').filter(|c| !c.is_empty()) {
        current.push(component);
        if sftp.stat(&current).is_ok() {
            continue;
        }
        sftp.mkdir(&current, 0o755)?;
        transcript.push(format!("Created remote directory {}", current.display()));
    }
    Ok(())
}
