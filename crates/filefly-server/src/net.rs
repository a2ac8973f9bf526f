//! 局域网地址发现
//!
//! 取本机的出口地址用于展示访问链接。UDP connect 只做内核选路，
//! 不产生实际流量。

use std::net::{IpAddr, UdpSocket};

/// 枚举可用于局域网访问的本机地址，至少返回回环地址
pub fn local_ips() -> Vec<String> {
    let mut ips = Vec::new();
    if let Some(ip) = primary_ip() {
        ips.push(ip.to_string());
    }
    if ips.is_empty() {
        ips.push("127.0.0.1".to_string());
    }
    ips
}

fn primary_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let addr = socket.local_addr().ok()?;
    match addr.ip() {
        ip if ip.is_loopback() || ip.is_unspecified() => None,
        ip => Some(ip),
    }
}
