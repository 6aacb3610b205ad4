//! Network syntax validators: hostnames, IP literals, CIDRs, URLs, email

use crate::diagnostic::Diagnostics;
use crate::strings::echo;
use email_address::EmailAddress;
use regex::Regex;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::LazyLock;
use url::Url;

const MAX_HOSTNAME_LEN: usize = 255;
const MAX_EMAIL_LEN: usize = 254;
const WILDCARD_PREFIX: &str = "*.";

/// One DNS label: no leading or trailing hyphen, at most 63 characters
static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_]([a-zA-Z0-9_-]{0,61}[a-zA-Z0-9_])?$").unwrap()
});

/// Value must be a syntactically valid hostname
pub fn hostname(value: &str) -> Diagnostics {
    let reject = |why: &str| {
        Diagnostics::error("invalid hostname", format!("{} {why}", echo(value)))
    };

    if value.is_empty() {
        return reject("is empty");
    }
    if value.len() > MAX_HOSTNAME_LEN {
        return reject("is longer than 255 characters");
    }
    if value.ends_with('.') {
        return reject("must not end with a dot");
    }

    let labels: Vec<&str> = value.split('.').collect();
    if labels
        .last()
        .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_digit()))
    {
        return reject("has an all-numeric top-level label");
    }

    for label in &labels {
        if !LABEL.is_match(label) {
            return reject(&format!(
                "has invalid label {label:?} (letters, digits, '-' and '_' only, not starting or ending with '-')"
            ));
        }
    }

    Diagnostics::new()
}

/// Like [`hostname`], but a leading `*.` wildcard is allowed
pub fn wildcard_hostname(value: &str) -> Diagnostics {
    match value.strip_prefix(WILDCARD_PREFIX) {
        Some(rest) => hostname(rest),
        None => hostname(value),
    }
}

/// Value must be a hostname or an IPv4 literal
///
/// IPv6 literals are not accepted.
pub fn hostname_or_ipv4(value: &str) -> Diagnostics {
    if value.parse::<Ipv4Addr>().is_ok() {
        return Diagnostics::new();
    }
    let diags = hostname(value);
    if diags.is_empty() {
        return diags;
    }
    Diagnostics::error(
        "invalid host",
        format!("expected {} to be a hostname or an IPv4 address", echo(value)),
    )
}

/// Value must be `address/prefix` for IPv4 or IPv6
pub fn cidr(value: &str) -> Diagnostics {
    let reject = |why: &str| Diagnostics::error("invalid CIDR", format!("{} {why}", echo(value)));

    let Some((addr, prefix)) = value.split_once('/') else {
        return reject("is missing a /prefix");
    };
    let Ok(addr) = addr.parse::<IpAddr>() else {
        return reject("does not start with an IP address");
    };
    let Ok(prefix) = prefix.parse::<u8>() else {
        return reject("has a non-numeric prefix length");
    };

    let max = if addr.is_ipv4() { 32 } else { 128 };
    if prefix > max {
        return reject(&format!("has prefix length {prefix}, maximum is {max}"));
    }
    Diagnostics::new()
}

/// Value must be an absolute URL with both a scheme and a host
pub fn url(value: &str) -> Diagnostics {
    match Url::parse(value) {
        Ok(parsed) if parsed.host_str().is_some_and(|h| !h.is_empty()) => Diagnostics::new(),
        Ok(_) => Diagnostics::error(
            "invalid URL",
            format!("expected {} to have a scheme and a host", echo(value)),
        ),
        Err(e) => Diagnostics::error(
            "invalid URL",
            format!("{} is not a valid URL: {e}", echo(value)),
        ),
    }
}

/// Value must be a single mailbox address
pub fn email(value: &str) -> Diagnostics {
    if value.len() > MAX_EMAIL_LEN {
        return Diagnostics::error(
            "invalid email",
            format!("{} is longer than {MAX_EMAIL_LEN} characters", echo(value)),
        );
    }
    if value.contains(',') {
        return Diagnostics::error(
            "invalid email",
            format!("expected a single address, got {}", echo(value)),
        );
    }
    match value.parse::<EmailAddress>() {
        Ok(_) => Diagnostics::new(),
        Err(e) => Diagnostics::error(
            "invalid email",
            format!("{} is not a valid email address: {e}", echo(value)),
        ),
    }
}
