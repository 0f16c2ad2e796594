//! Utility module, a grab-bag of functionality

use std::net::UdpSocket;

/// The address this host would use to reach the outside world.
///
/// No packets are sent; connecting a UDP socket only selects a route.
/// Returns None when the host has no usable route.
pub fn local_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip().to_string())
}
