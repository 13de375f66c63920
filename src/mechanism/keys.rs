// ABOUTME: Fixed mechanism parameter keys shared with consumers over the wire.
// ABOUTME: Changing any of these strings breaks compatibility with existing peers.

/// Mechanism token for the shared-memory interface.
pub const MEMIF: &str = "MEMIF";
/// Mechanism token for a kernel interface moved into the consumer namespace.
pub const KERNEL: &str = "KERNEL";
/// Mechanism token for a VXLAN tunnel.
pub const VXLAN: &str = "VXLAN";

/// Network namespace inode of the side that owns the interface.
pub const NETNS_INODE: &str = "netnsInode";
/// Interface name.
pub const INTERFACE_NAME: &str = "name";
/// Path of the memif control socket.
pub const SOCKET_FILENAME: &str = "socketfile";
/// Base directory the socket file lives under.
pub const WORKSPACE: &str = "workspace";
/// Role marker: this side creates the memif socket.
pub const MASTER: &str = "master";
/// Role marker: this side connects to an existing memif socket.
pub const SLAVE: &str = "slave";

/// VXLAN tunnel source address.
pub const SRC_IP: &str = "src_ip";
/// VXLAN tunnel destination address.
pub const DST_IP: &str = "dst_ip";
/// VXLAN network identifier.
pub const VNI: &str = "vni";
