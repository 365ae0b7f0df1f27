//! Internal/external link classification
//!
//! An href is resolved against the page hosting the preview. It is external
//! when the resolved hostname differs from the page's hostname. Hrefs that
//! cannot be parsed as URLs are treated as internal.

use std::sync::LazyLock;

use regex_lite::Regex;

static SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([A-Za-z][A-Za-z0-9+.\-]*):(.*)$").expect("scheme pattern is valid")
});

/// Where a link points relative to the current page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    Internal,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkClassifier {
    page_host: String,
}

impl LinkClassifier {
    /// Build a classifier for the page at `page_url`
    pub fn new(page_url: &str) -> Self {
        let page_host = match resolve_host(page_url) {
            Resolved::Host(host) => host,
            Resolved::Relative | Resolved::Malformed => String::new(),
        };
        Self { page_host }
    }

    pub fn page_host(&self) -> &str {
        &self.page_host
    }

    pub fn classify(&self, href: &str) -> LinkTarget {
        match resolve_host(href) {
            Resolved::Host(host) if host != self.page_host => LinkTarget::External,
            _ => LinkTarget::Internal,
        }
    }
}

enum Resolved {
    /// Resolves against the page, so it shares the page host
    Relative,
    Host(String),
    Malformed,
}

fn resolve_host(href: &str) -> Resolved {
    let href = href.trim();

    if let Some(rest) = href.strip_prefix("//") {
        return authority_host(rest, false);
    }

    let Some(caps) = SCHEME.captures(href) else {
        return Resolved::Relative;
    };
    let scheme = caps.get(1).map_or("", |m| m.as_str()).to_ascii_lowercase();
    let rest = caps.get(2).map_or("", |m| m.as_str());

    match rest.strip_prefix("//") {
        Some(authority) => authority_host(authority, scheme == "file"),
        // mailto:, tel: and friends carry no host
        None => Resolved::Host(String::new()),
    }
}

fn authority_host(rest: &str, allow_empty: bool) -> Resolved {
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);

    let host = if host_port.starts_with('[') {
        match host_port.find(']') {
            Some(close) => {
                let port = &host_port[close + 1..];
                if !valid_port(port) {
                    return Resolved::Malformed;
                }
                &host_port[..=close]
            }
            None => return Resolved::Malformed,
        }
    } else {
        let (host, port) = match host_port.find(':') {
            Some(colon) => host_port.split_at(colon),
            None => (host_port, ""),
        };
        if !valid_port(port) || !host.chars().all(valid_host_char) {
            return Resolved::Malformed;
        }
        host
    };

    if host.is_empty() && !allow_empty {
        return Resolved::Malformed;
    }
    Resolved::Host(host.trim_end_matches('.').to_lowercase())
}

/// `port` is empty or `:` followed by digits
fn valid_port(port: &str) -> bool {
    match port.strip_prefix(':') {
        Some(digits) => digits.chars().all(|c| c.is_ascii_digit()),
        None => port.is_empty(),
    }
}

fn valid_host_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '.' | '_' | '~' | '%')
}
