//! Remote upload consumer (SFTP over a pooled SSH connection), gated behind
//! the `remote-sync` feature.
//!
//! Grounded on `original_source/parallel_scp_r.py`: a bounded
//! `Queue(maxsize=num_max_threads)` of already-authenticated SFTP sessions,
//! `get`/`put` around each op. Multi-key and interactive-password
//! authentication fallback is out of scope per spec.md's "credential
//! prompting" Non-goal; this consumer authenticates via the calling user's
//! ssh-agent only.

use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::progress::Stats;
use crate::scheduler::{traverse, Order, TraverseOptions};

/// A bounded pool of live SFTP sessions, borrowed with [`ConnectionPool::get`]
/// and returned with [`ConnectionPool::put`] around each operation — the
/// same shape as the source's `Queue(maxsize=num_max_threads)`.
pub struct ConnectionPool {
    sender: crossbeam_channel::Sender<ssh2::Sftp>,
    receiver: crossbeam_channel::Receiver<ssh2::Sftp>,
    // Kept alive for the pool's lifetime: dropping a `Session` closes every
    // `Sftp` channel opened on it.
    _sessions: Vec<ssh2::Session>,
}

impl ConnectionPool {
    /// Open `count` SSH sessions to `host:port` as `user`, authenticate via
    /// ssh-agent, and open one SFTP channel per session.
    pub fn connect(host: &str, port: u16, user: &str, count: usize) -> Result<Self> {
        let count = count.max(1);
        let mut sessions = Vec::with_capacity(count);
        let (sender, receiver) = crossbeam_channel::bounded(count);
        for _ in 0..count {
            let tcp = TcpStream::connect((host, port))
                .map_err(|e| Error::OperationFailed(format!("connecting to {host}:{port}: {e}")))?;
            let mut session = ssh2::Session::new()
                .map_err(|e| Error::OperationFailed(format!("creating ssh session: {e}")))?;
            session.set_tcp_stream(tcp);
            session
                .handshake()
                .map_err(|e| Error::OperationFailed(format!("ssh handshake: {e}")))?;
            session
                .userauth_agent(user)
                .map_err(|e| Error::OperationFailed(format!("ssh-agent authentication for {user}: {e}")))?;
            let sftp = session
                .sftp()
                .map_err(|e| Error::OperationFailed(format!("opening sftp channel: {e}")))?;
            sender.send(sftp).expect("channel just created, cannot be closed");
            sessions.push(session);
        }
        Ok(Self {
            sender,
            receiver,
            _sessions: sessions,
        })
    }

    /// Borrow a connection, blocking until one is available.
    pub fn get(&self) -> ssh2::Sftp {
        self.receiver.recv().expect("connection pool closed while borrowing")
    }

    /// Return a connection for reuse.
    pub fn put(&self, sftp: ssh2::Sftp) {
        let _ = self.sender.send(sftp);
    }
}

fn dest_for(path: &Path, src_root: &Path, dest_root: &Path) -> PathBuf {
    let name = src_root.file_name().map(PathBuf::from).unwrap_or_default();
    if path == src_root {
        dest_root.join(&name)
    } else {
        dest_root.join(&name).join(path.strip_prefix(src_root).unwrap_or(path))
    }
}

fn upload_dir(src: &Path, src_root: &Path, dest_root: &Path, pool: &ConnectionPool) -> Result<()> {
    let dest = dest_for(src, src_root, dest_root);
    let mode = std::fs::metadata(src).map(|m| mode_bits(&m)).unwrap_or(0o755);
    let sftp = pool.get();
    let result = sftp.mkdir(&dest, mode as i32);
    pool.put(sftp);
    match result {
        Ok(()) => Ok(()),
        // A directory that already exists on the remote is not an error.
        Err(_) => Ok(()),
    }
}

fn upload_file(src: &Path, src_root: &Path, dest_root: &Path, pool: &ConnectionPool) -> Result<()> {
    let dest = dest_for(src, src_root, dest_root);
    let mut local = std::fs::File::open(src).map_err(|e| Error::io(src, e))?;
    let sftp = pool.get();
    let mode = std::fs::metadata(src).map(|m| mode_bits(&m)).unwrap_or(0o644);
    let result = (|| -> Result<()> {
        let mut remote = sftp
            .create(&dest)
            .map_err(|e| Error::OperationFailed(format!("creating remote file {}: {e}", dest.display())))?;
        std::io::copy(&mut local, &mut remote)
            .map_err(|e| Error::io(src, e))?;
        let _ = sftp.setstat(
            &dest,
            ssh2::FileStat {
                size: None,
                uid: None,
                gid: None,
                perm: Some(mode),
                atime: None,
                mtime: None,
            },
        );
        Ok(())
    })();
    pool.put(sftp);
    result
}

#[cfg(unix)]
fn mode_bits(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn mode_bits(_meta: &std::fs::Metadata) -> u32 {
    0o644
}

/// Recursively upload `sources` to `user@host:port` under `remote_dest`.
pub fn run_upload(
    sources: &[PathBuf],
    host: &str,
    port: u16,
    user: &str,
    remote_dest: &Path,
    max_workers: usize,
    quiet: bool,
) -> Result<Stats> {
    let pool = Arc::new(ConnectionPool::connect(host, port, user, max_workers)?);
    let dest = remote_dest.to_path_buf();

    let pool_dir = pool.clone();
    let dest_dir = dest.clone();
    let dir_op = move |path: &Path, root: &Path| upload_dir(path, root, &dest_dir, &pool_dir);

    let pool_file = pool.clone();
    let dest_file = dest.clone();
    let file_op = move |path: &Path, root: &Path| upload_file(path, root, &dest_file, &pool_file);

    traverse(
        sources,
        dir_op,
        file_op,
        TraverseOptions {
            order: Order::PreOrder,
            strict_hierarchical: true,
            max_workers,
            print_lock: Some(Arc::new(std::sync::Mutex::new(()))),
            quiet,
        },
    )
}
