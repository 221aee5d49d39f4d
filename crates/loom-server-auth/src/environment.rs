// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request environment extraction.
//!
//! Derives the client address and client agent of an inbound request from
//! its headers and connection info. Extraction is pure and never fails:
//! anything missing or malformed degrades to `None` / unknown.

use crate::client_agent::ClientAgent;
use http::request::Parts;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

/// Direct peer address of a connection, carried as a request extension.
///
/// The transport layer inserts it (axum fills it from `ConnectInfo`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectAddr(pub SocketAddr);

/// Controls which request data the extractor trusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
	/// Honour proxy headers (`Forwarded`, `X-Forwarded-For`, ...). Disable
	/// when the server is reachable without a trusted reverse proxy.
	pub trust_forwarded_headers: bool,
}

impl Default for EnvironmentConfig {
	fn default() -> Self {
		Self {
			trust_forwarded_headers: true,
		}
	}
}

/// Request-derived facts made available to policy predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
	pub client_address: Option<String>,
	pub raw_client_agent: Option<String>,
	pub client_agent: ClientAgent,
}

impl Environment {
	/// Extracts the environment from request parts.
	#[tracing::instrument(level = "debug", skip_all)]
	pub fn from_request(parts: &Parts, config: &EnvironmentConfig) -> Self {
		let remote = parts.extensions.get::<ConnectAddr>().map(|addr| addr.0);
		Self::from_headers(&parts.headers, remote, config)
	}

	pub fn from_headers(
		headers: &HeaderMap,
		remote: Option<SocketAddr>,
		config: &EnvironmentConfig,
	) -> Self {
		let client_address = extract_client_address(headers, remote, config);
		let raw_client_agent = header_str(headers, "user-agent").map(str::to_string);
		let client_agent = raw_client_agent
			.as_deref()
			.map(ClientAgent::parse)
			.unwrap_or_else(ClientAgent::unknown);

		tracing::debug!(
			client_address = ?client_address,
			device = ?client_agent.device,
			"Request environment extracted"
		);

		Self {
			client_address,
			raw_client_agent,
			client_agent,
		}
	}

	/// Parsed client address, when it is a literal IP.
	pub fn client_ip(&self) -> Option<IpAddr> {
		self.client_address.as_deref()?.parse().ok()
	}

	pub fn is_loopback(&self) -> bool {
		self.client_ip().is_some_and(|ip| ip.is_loopback())
	}
}

/// Resolves the client address.
///
/// With forwarded headers trusted, checks in order of preference:
/// 1. `Forwarded` (RFC 7239, `for=` of the first element)
/// 2. `X-Forwarded-For` (first IP in chain)
/// 3. `X-Real-IP` (nginx style)
/// 4. `CF-Connecting-IP` (Cloudflare)
///
/// and falls back to the direct connection address.
fn extract_client_address(
	headers: &HeaderMap,
	remote: Option<SocketAddr>,
	config: &EnvironmentConfig,
) -> Option<String> {
	if config.trust_forwarded_headers {
		let forwarded = header_str(headers, "forwarded")
			.and_then(forwarded_for)
			.or_else(|| header_str(headers, "x-forwarded-for").and_then(first_hop))
			.or_else(|| header_str(headers, "x-real-ip").and_then(parse_ip))
			.or_else(|| header_str(headers, "cf-connecting-ip").and_then(parse_ip));

		if let Some(ip) = forwarded {
			return Some(ip.to_string());
		}
	}

	remote.map(|addr| addr.ip().to_string())
}

/// Returns a trimmed, non-empty UTF-8 header value.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	let value = headers.get(name)?.to_str().ok()?.trim();
	(!value.is_empty()).then_some(value)
}

/// Parses an address token, with or without a port.
///
/// Accepts `192.0.2.1`, `192.0.2.1:8080`, `2001:db8::1`, `[2001:db8::1]` and
/// `[2001:db8::1]:8080`. Hostnames and other tokens yield `None`.
fn parse_ip(candidate: &str) -> Option<IpAddr> {
	let candidate = candidate.trim().trim_matches('"');
	if let Ok(ip) = candidate.parse::<IpAddr>() {
		return Some(ip);
	}
	if let Ok(addr) = candidate.parse::<SocketAddr>() {
		return Some(addr.ip());
	}
	candidate
		.strip_prefix('[')
		.and_then(|rest| rest.strip_suffix(']'))
		.and_then(|inner| inner.parse::<IpAddr>().ok())
}

fn first_hop(value: &str) -> Option<IpAddr> {
	parse_ip(value.split(',').next()?)
}

/// Extracts the node of the first `for=` pair of an RFC 7239 header.
///
/// Obfuscated identifiers (`_hidden`), `unknown` and hostnames are not
/// addresses and yield `None`.
fn forwarded_for(value: &str) -> Option<IpAddr> {
	let element = value.split(',').next()?;
	let node = element.split(';').find_map(|pair| {
		let (key, value) = pair.split_once('=')?;
		key.trim().eq_ignore_ascii_case("for").then_some(value)
	})?;
	parse_ip(node)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::client_agent::DeviceKind;
	use http::{HeaderValue, Request};

	fn parts_with(headers: &[(&str, &str)], remote: Option<&str>) -> Parts {
		let mut builder = Request::builder().uri("/api/threads");
		for (name, value) in headers {
			builder = builder.header(*name, *value);
		}
		let (mut parts, ()) = builder.body(()).unwrap().into_parts();
		if let Some(remote) = remote {
			parts
				.extensions
				.insert(ConnectAddr(remote.parse().unwrap()));
		}
		parts
	}

	fn address(headers: &[(&str, &str)], remote: Option<&str>) -> Option<String> {
		let parts = parts_with(headers, remote);
		Environment::from_request(&parts, &EnvironmentConfig::default()).client_address
	}

	#[test]
	fn forwarded_takes_precedence() {
		let headers = [
			("forwarded", "for=192.0.2.60;proto=http;by=203.0.113.43"),
			("x-forwarded-for", "1.1.1.1"),
			("x-real-ip", "2.2.2.2"),
			("cf-connecting-ip", "3.3.3.3"),
		];
		assert_eq!(
			address(&headers, Some("10.0.0.1:4000")),
			Some("192.0.2.60".to_string())
		);
	}

	#[test]
	fn header_precedence_chain() {
		assert_eq!(
			address(
				&[
					("x-forwarded-for", "203.0.113.195, 70.41.3.18"),
					("x-real-ip", "2.2.2.2"),
				],
				None
			),
			Some("203.0.113.195".to_string())
		);
		assert_eq!(
			address(
				&[("x-real-ip", "198.51.100.178"), ("cf-connecting-ip", "3.3.3.3")],
				None
			),
			Some("198.51.100.178".to_string())
		);
		assert_eq!(
			address(&[("cf-connecting-ip", "192.0.2.1")], None),
			Some("192.0.2.1".to_string())
		);
	}

	#[test]
	fn falls_back_to_connection_address() {
		assert_eq!(
			address(&[], Some("198.51.100.7:52100")),
			Some("198.51.100.7".to_string())
		);
		assert_eq!(address(&[], None), None);
	}

	#[test]
	fn untrusted_proxy_headers_are_ignored() {
		let parts = parts_with(&[("x-forwarded-for", "1.1.1.1")], Some("10.0.0.9:1234"));
		let config = EnvironmentConfig {
			trust_forwarded_headers: false,
		};
		let env = Environment::from_request(&parts, &config);
		assert_eq!(env.client_address, Some("10.0.0.9".to_string()));
	}

	#[test]
	fn empty_headers_are_skipped() {
		assert_eq!(
			address(
				&[("x-forwarded-for", " , 8.8.8.8"), ("x-real-ip", "9.9.9.9")],
				None
			),
			Some("9.9.9.9".to_string())
		);
	}

	#[test]
	fn forwarded_for_variants() {
		let ip = |s: &str| Some(s.parse::<IpAddr>().unwrap());
		assert_eq!(
			forwarded_for("for=\"[2001:db8:cafe::17]:4711\""),
			ip("2001:db8:cafe::17")
		);
		assert_eq!(
			forwarded_for("For=\"192.0.2.43:47011\", for=198.51.100.17"),
			ip("192.0.2.43")
		);
		assert_eq!(forwarded_for("for=\"[2001:db8::1]\""), ip("2001:db8::1"));
		assert_eq!(forwarded_for("proto=https;for=192.0.2.1"), ip("192.0.2.1"));
		assert_eq!(forwarded_for("for=hostname"), None);
		assert_eq!(forwarded_for("for=unknown"), None);
		assert_eq!(forwarded_for("for=_hidden"), None);
		assert_eq!(forwarded_for("proto=https"), None);
		assert_eq!(forwarded_for("garbage"), None);
	}

	#[test]
	fn unparseable_values_fall_back_to_connection_address() {
		let remote = Some("10.0.0.1:4000");
		let expected = Some("10.0.0.1".to_string());
		assert_eq!(address(&[("x-forwarded-for", "garbage, 1.2.3.4")], remote), expected);
		assert_eq!(address(&[("x-real-ip", "not-an-ip")], remote), expected);
		assert_eq!(address(&[("forwarded", "for=hostname")], remote), expected);
		assert_eq!(address(&[("cf-connecting-ip", "example.com")], remote), expected);
	}

	#[test]
	fn unparseable_value_falls_through_to_next_header() {
		assert_eq!(
			address(
				&[("x-forwarded-for", "proxy.internal"), ("x-real-ip", "198.51.100.4:8080")],
				Some("10.0.0.1:4000")
			),
			Some("198.51.100.4".to_string())
		);
	}

	#[test]
	fn obfuscated_forwarded_falls_through_to_next_header() {
		assert_eq!(
			address(
				&[("forwarded", "for=_gazonk"), ("x-forwarded-for", "8.8.8.8")],
				None
			),
			Some("8.8.8.8".to_string())
		);
	}

	#[test]
	fn client_agent_is_parsed() {
		let parts = parts_with(
			&[(
				"user-agent",
				"Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
			)],
			None,
		);
		let env = Environment::from_request(&parts, &EnvironmentConfig::default());
		assert!(env.raw_client_agent.is_some());
		assert_eq!(env.client_agent.device, DeviceKind::Desktop);
	}

	#[test]
	fn missing_or_invalid_agent_is_unknown() {
		let env = Environment::from_request(&parts_with(&[], None), &EnvironmentConfig::default());
		assert_eq!(env.raw_client_agent, None);
		assert!(env.client_agent.is_unknown());

		let mut headers = HeaderMap::new();
		headers.insert(
			"user-agent",
			HeaderValue::from_bytes(&[0x66, 0xff, 0x66]).unwrap(),
		);
		let env = Environment::from_headers(&headers, None, &EnvironmentConfig::default());
		assert_eq!(env.raw_client_agent, None);
		assert!(env.client_agent.is_unknown());
	}

	#[test]
	fn loopback_detection() {
		let env = Environment {
			client_address: Some("127.0.0.1".to_string()),
			..Default::default()
		};
		assert!(env.is_loopback());

		let env = Environment {
			client_address: Some("not-an-ip".to_string()),
			..Default::default()
		};
		assert_eq!(env.client_ip(), None);
		assert!(!env.is_loopback());
	}
}
