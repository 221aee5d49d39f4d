// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Best-effort parsing of `User-Agent` strings.
//!
//! Parsing never fails. Anything unrecognised degrades to
//! [`ClientAgent::unknown`] or to partially filled fields.

use serde::{Deserialize, Serialize};

/// A named piece of client software with an optional version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Software {
	pub name: String,
	pub version: Option<String>,
}

impl Software {
	fn new(name: &str, version: Option<String>) -> Self {
		Self {
			name: name.to_string(),
			version,
		}
	}
}

/// Coarse device classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
	Desktop,
	Mobile,
	Tablet,
	Bot,
	#[default]
	Unknown,
}

/// Structured view of a client-agent header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAgent {
	pub browser: Option<Software>,
	pub os: Option<Software>,
	pub device: DeviceKind,
}

const BOT_MARKERS: &[&str] = &["bot", "crawler", "spider", "slurp", "headlesschrome"];

/// Checked in order; more specific engines must precede the ones they embed
/// (Edge and Opera both carry a `Chrome/` token, Chrome carries `Safari/`).
const BROWSERS: &[(&str, &str)] = &[
	("Edg/", "Edge"),
	("EdgA/", "Edge"),
	("OPR/", "Opera"),
	("SamsungBrowser/", "Samsung Internet"),
	("Firefox/", "Firefox"),
	("FxiOS/", "Firefox"),
	("CriOS/", "Chrome"),
	("Chromium/", "Chromium"),
	("Chrome/", "Chrome"),
];

impl ClientAgent {
	pub fn unknown() -> Self {
		Self::default()
	}

	pub fn is_unknown(&self) -> bool {
		*self == Self::default()
	}

	pub fn is_bot(&self) -> bool {
		self.device == DeviceKind::Bot
	}

	pub fn is_mobile(&self) -> bool {
		matches!(self.device, DeviceKind::Mobile | DeviceKind::Tablet)
	}

	/// Parses a raw `User-Agent` value.
	pub fn parse(raw: &str) -> Self {
		let ua = raw.trim();
		if ua.is_empty() || !ua.is_ascii() {
			return Self::unknown();
		}

		let lower = ua.to_ascii_lowercase();
		let is_bot = BOT_MARKERS.iter().any(|marker| lower.contains(marker));

		let browser = detect_browser(ua).or_else(|| first_product(ua));
		let os = detect_os(ua);
		let device = if is_bot {
			DeviceKind::Bot
		} else {
			detect_device(ua, os.as_ref())
		};

		Self {
			browser,
			os,
			device,
		}
	}
}

fn detect_browser(ua: &str) -> Option<Software> {
	for (needle, name) in BROWSERS {
		if ua.contains(needle) {
			return Some(Software::new(name, version_after(ua, needle)));
		}
	}

	if ua.contains("Safari/") && ua.contains("Version/") {
		return Some(Software::new("Safari", version_after(ua, "Version/")));
	}

	if ua.contains("MSIE ") {
		return Some(Software::new(
			"Internet Explorer",
			version_after(ua, "MSIE "),
		));
	}

	if ua.contains("Trident/") {
		return Some(Software::new("Internet Explorer", version_after(ua, "rv:")));
	}

	None
}

/// Falls back to the leading `product/version` token, e.g. `curl/8.4.0`.
fn first_product(ua: &str) -> Option<Software> {
	let token = ua.split_whitespace().next()?;
	let (name, version) = match token.split_once('/') {
		Some((name, version)) => (name, Some(version)),
		None => (token, None),
	};

	if name.is_empty() || name == "Mozilla" || !name.chars().all(is_product_char) {
		return None;
	}

	let version = version
		.map(|v| v.trim_end_matches([';', ',']))
		.filter(|v| !v.is_empty())
		.map(str::to_string);
	Some(Software::new(name, version))
}

fn is_product_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn detect_os(ua: &str) -> Option<Software> {
	if let Some(version) = version_after(ua, "Windows NT ") {
		let name = match version.as_str() {
			"10.0" => "10",
			"6.3" => "8.1",
			"6.2" => "8",
			"6.1" => "7",
			other => other,
		};
		return Some(Software::new("Windows", Some(name.to_string())));
	}
	if ua.contains("Windows") {
		return Some(Software::new("Windows", None));
	}

	if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod") {
		let version = version_after(ua, "iPhone OS ")
			.or_else(|| version_after(ua, "CPU OS "))
			.map(|v| v.replace('_', "."));
		return Some(Software::new("iOS", version));
	}

	if ua.contains("Android") {
		return Some(Software::new("Android", version_after(ua, "Android ")));
	}

	if ua.contains("CrOS") {
		return Some(Software::new("ChromeOS", None));
	}

	if ua.contains("Mac OS X") {
		let version = version_after(ua, "Mac OS X ").map(|v| v.replace('_', "."));
		return Some(Software::new("macOS", version));
	}

	if ua.contains("Linux") {
		return Some(Software::new("Linux", None));
	}

	None
}

fn detect_device(ua: &str, os: Option<&Software>) -> DeviceKind {
	if ua.contains("iPad") || ua.contains("Tablet") {
		return DeviceKind::Tablet;
	}
	if ua.contains("Android") && !ua.contains("Mobile") {
		return DeviceKind::Tablet;
	}
	if ua.contains("Mobi") || ua.contains("iPhone") || ua.contains("iPod") {
		return DeviceKind::Mobile;
	}

	match os.map(|os| os.name.as_str()) {
		Some("Windows" | "macOS" | "Linux" | "ChromeOS") => DeviceKind::Desktop,
		_ => DeviceKind::Unknown,
	}
}

/// Returns the dotted/underscored version number immediately following `needle`.
fn version_after(ua: &str, needle: &str) -> Option<String> {
	let start = ua.find(needle)? + needle.len();
	let version: String = ua[start..]
		.chars()
		.take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '_')
		.collect();
	let version = version.trim_end_matches(['.', '_']);
	if version.is_empty() {
		None
	} else {
		Some(version.to_string())
	}
}
