//! Client IP extraction.
//!
//! Default behaviour is peer-address only: this is what stops a client from
//! spoofing `X-Forwarded-For` to bypass IP-scoped rules. A trusted-proxy
//! configuration that honors forwarded headers is explicitly left
//! unspecified by the governing spec and is not implemented here.

use std::net::IpAddr;

/// Resolve the client IP for a request. `peer` is the address pingora
/// handed back for the accepted connection.
pub fn extract(peer: IpAddr) -> IpAddr {
    peer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_peer_address_directly() {
        let peer: IpAddr = "203.0.113.9".parse().unwrap();
        assert_eq!(extract(peer), peer);
    }
}
