//! Connectivity probe — is outbound network reachability currently available?

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Answers whether the host can currently reach the outside world.
pub trait ConnectivityProbe {
    /// Must never panic or error; every failure collapses to `false`.
    fn is_reachable(&self) -> bool;
}

/// TCP connect to a well-known external address (by default `8.8.8.8:53`).
///
/// `timeout` bounds each connect attempt. A host name target is first
/// resolved through the system resolver, which has no timeout of its own, and
/// every resolved address is tried in turn, so the worst case is the resolver
/// delay plus one `timeout` per address. Use an IP literal to keep the probe
/// bounded by a single `timeout`.
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }
}

impl ConnectivityProbe for TcpProbe {
    fn is_reachable(&self) -> bool {
        let addrs: Vec<_> = match self.address.to_socket_addrs() {
            Ok(addrs) => addrs.collect(),
            Err(e) => {
                tracing::warn!(target_addr = %self.address, error = %e, "Connection refused (address resolution failed)");
                return false;
            }
        };

        let mut last_error = None;
        for addr in &addrs {
            match TcpStream::connect_timeout(addr, self.timeout) {
                // Stream is dropped here, closing the probe connection.
                Ok(_stream) => return true,
                Err(e) => last_error = Some(e),
            }
        }

        match last_error {
            Some(e) => {
                tracing::warn!(target_addr = %self.address, error = %e, "Connection refused")
            }
            None => tracing::warn!(target_addr = %self.address, "Connection refused (no addresses)"),
        }
        false
    }
}
