//! Client IP extraction utilities.

use std::net::{IpAddr, SocketAddr};

use axum::{extract::ConnectInfo, http::Request};

/// Proxy header the client IP is read from when running behind a proxy.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientIpHeader {
    /// First address of `X-Forwarded-For`
    XForwardedFor,
    /// `X-Real-IP`
    XRealIp,
}

impl ClientIpHeader {
    pub fn header_name(&self) -> &'static str {
        match self {
            ClientIpHeader::XForwardedFor => "x-forwarded-for",
            ClientIpHeader::XRealIp => "x-real-ip",
        }
    }

    fn parse(&self, value: &str) -> Result<String, &'static str> {
        let candidate = match self {
            ClientIpHeader::XForwardedFor => value.split(',').next().unwrap_or("").trim(),
            ClientIpHeader::XRealIp => value.trim(),
        };
        candidate
            .parse::<IpAddr>()
            .map(|ip| ip.to_string())
            .map_err(|_| "IP header does not contain a valid address")
    }
}

/// Extract client IP address based on configuration.
///
/// If `ip_header` is set, extracts IP from that header and returns an error
/// if the header is missing or invalid (does NOT fall back to SocketAddr).
///
/// If `ip_header` is None, uses the SocketAddr from ConnectInfo.
pub fn extract_client_ip<B>(
    request: &Request<B>,
    ip_header: Option<ClientIpHeader>,
) -> Result<String, &'static str> {
    match ip_header {
        Some(header) => {
            let header_value = request
                .headers()
                .get(header.header_name())
                .ok_or("IP header not present")?
                .to_str()
                .map_err(|_| "IP header contains invalid characters")?;
            header.parse(header_value)
        }
        None => request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
            .ok_or("No client IP available"),
    }
}
