//! Outbound URL validation: SSRF protection for benchmark-adapter fetches.
//!
//! Every adapter HTTP fetch (C3, spec §6) is validated through
//! [`UrlValidator`] before a request is issued, blocking internal/private
//! targets a compromised or misconfigured adapter source could point at.

use std::net::IpAddr;

/// Blocked regardless of the allowlist: loopback, RFC 1918, link-local,
/// the "this network" block, multicast, broadcast, and their IPv6
/// equivalents.
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_multicast()
                || v4.is_broadcast()
                || v4.octets()[0] == 0
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // unique local fc00::/7
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // link-local fe80::/10
        }
    }
}

const BLOCKED_HOSTNAMES: &[&str] = &["localhost", "localhost.localdomain", "ip6-localhost", "ip6-loopback"];
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

fn is_blocked_hostname(hostname: &str) -> bool {
    let lower = hostname.to_ascii_lowercase();
    BLOCKED_HOSTNAMES.contains(&lower.as_str()) || lower.starts_with("localhost") || lower.ends_with(".local")
}

/// Scheme and host extracted from a URL string, enough for SSRF checks
/// without pulling in a full URL-parsing dependency.
struct ParsedUrl<'a> {
    scheme: &'a str,
    host: &'a str,
}

fn parse_url(url: &str) -> Result<ParsedUrl<'_>, UrlValidationError> {
    let (scheme, rest) = url.split_once("://").ok_or_else(|| UrlValidationError::Malformed(url.to_string()))?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    if authority.is_empty() {
        return Err(UrlValidationError::MissingHostname);
    }
    // Strip userinfo, then port, respecting bracketed IPv6 literals.
    let after_userinfo = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
    let host = if let Some(bracketed) = after_userinfo.strip_prefix('[') {
        bracketed.split(']').next().unwrap_or(after_userinfo)
    } else {
        after_userinfo.split(':').next().unwrap_or(after_userinfo)
    };
    if host.is_empty() {
        return Err(UrlValidationError::MissingHostname);
    }
    Ok(ParsedUrl { scheme, host })
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("empty URL")]
    Empty,
    #[error("invalid URL: {0}")]
    Malformed(String),
    #[error("invalid scheme '{0}', allowed: http, https")]
    InvalidScheme(String),
    #[error("URL missing hostname")]
    MissingHostname,
    #[error("blocked hostname: {0}")]
    BlockedHostname(String),
    #[error("private IP addresses are blocked: {0}")]
    PrivateIp(String),
    #[error("domain not in allowlist: {0}")]
    NotAllowlisted(String),
}

/// Validates outbound URLs before benchmark-adapter fetches are issued.
///
/// Mirrors `UrlValidator` from the original orchestrator's `security.py`
/// (T-037): block private IP ranges and localhost variants by default, and
/// when an allowlist is configured, require an exact or subdomain match.
/// [`LocalInferenceAdapter`](crate::local_inference::LocalInferenceAdapter)
/// is the one adapter that constructs this with `block_private_ips: false`,
/// since its whole job is reaching a local runtime.
pub struct UrlValidator {
    allowed_domains: Vec<String>,
    block_private_ips: bool,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self { allowed_domains: Vec::new(), block_private_ips: true }
    }
}

impl UrlValidator {
    pub fn new(allowed_domains: Vec<String>, block_private_ips: bool) -> Self {
        Self { allowed_domains, block_private_ips }
    }

    pub fn validate(&self, url: &str) -> Result<(), UrlValidationError> {
        if url.is_empty() {
            return Err(UrlValidationError::Empty);
        }

        let parsed = parse_url(url)?;

        if !ALLOWED_SCHEMES.contains(&parsed.scheme.to_ascii_lowercase().as_str()) {
            return Err(UrlValidationError::InvalidScheme(parsed.scheme.to_string()));
        }

        if self.block_private_ips && is_blocked_hostname(parsed.host) {
            return Err(UrlValidationError::BlockedHostname(parsed.host.to_string()));
        }

        if self.block_private_ips {
            if let Ok(ip) = parsed.host.parse::<IpAddr>() {
                if is_private_ip(ip) {
                    return Err(UrlValidationError::PrivateIp(parsed.host.to_string()));
                }
            }
        }

        if !self.allowed_domains.is_empty() && !self.matches_allowed_domain(parsed.host) {
            return Err(UrlValidationError::NotAllowlisted(parsed.host.to_string()));
        }

        Ok(())
    }

    pub fn is_valid(&self, url: &str) -> bool {
        self.validate(url).is_ok()
    }

    fn matches_allowed_domain(&self, hostname: &str) -> bool {
        let hostname_lower = hostname.to_ascii_lowercase();
        self.allowed_domains.iter().any(|domain| {
            let domain_lower = domain.to_ascii_lowercase();
            hostname_lower == domain_lower || hostname_lower.ends_with(&format!(".{domain_lower}"))
        })
    }
}
