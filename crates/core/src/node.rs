use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of an agent: the local IP address by default, overridable
/// via config for multi-agent-per-host test setups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Best-effort local IP discovery, the way a cron fleet agent identifies
    /// itself when no explicit node id is configured.
    pub fn discover() -> crate::Result<Self> {
        let socket = std::net::UdpSocket::bind("0.0.0.0:0")?;
        // Connecting a UDP socket performs no handshake; it only binds the
        // route used to pick a local address, which is the outbound IP.
        socket.connect("8.8.8.8:80")?;
        let addr = socket.local_addr()?;
        Ok(Self(addr.ip().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
