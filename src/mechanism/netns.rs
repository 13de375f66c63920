// ABOUTME: Reads the network namespace inode of the current process.
// ABOUTME: Used to synthesize netnsInode when the consumer does not send one.

const SELF_NETNS: &str = "/proc/self/ns/net";

/// Inode of this process's network namespace.
#[cfg(unix)]
pub fn current_netns_inode() -> std::io::Result<u64> {
    use std::os::unix::fs::MetadataExt;

    let meta = std::fs::metadata(SELF_NETNS)?;
    Ok(meta.ino())
}

#[cfg(not(unix))]
pub fn current_netns_inode() -> std::io::Result<u64> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        format!("{SELF_NETNS} is only available on unix"),
    ))
}
