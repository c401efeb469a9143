//! Connection lifecycle state.

/// Per-handle connection state.
///
/// State transitions are driven exclusively by inbound frames and socket
/// lifecycle events:
///
/// ```text
/// Disconnected --(connection_established)--> Connected --(socket close)--> Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No usable connection; the socket id is unset.
    #[default]
    Disconnected,
    /// Handshake completed; the socket id is set.
    Connected,
}

impl ConnectionState {
    /// Whether the handle is connected.
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("disconnected"),
            ConnectionState::Connected => f.write_str("connected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert!(!ConnectionState::default().is_connected());
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Disconnected.to_string(), "disconnected");
    }
}
