//! Pure matching primitives: string mode matching, compiled regex, and
//! CIDR/IP membership. Nothing in this module performs I/O or locking — it
//! is meant to stay entirely CPU-bound so rule evaluation never suspends.

use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use regex::Regex;

use crate::waf::model::MatchMode;

/// A rule's pattern, compiled once at reload time. `Regex` holds a
/// pre-compiled regex only when the mode is `regex` and the pattern parsed;
/// otherwise the rule is carried as `LoadFailed` and is skipped by the
/// engine without aborting the reload.
#[derive(Clone)]
pub enum CompiledPattern {
    Exact(String),
    Contains(String),
    Regex(Regex),
    LoadFailed,
}

impl CompiledPattern {
    pub fn compile(mode: MatchMode, pattern: &str) -> CompiledPattern {
        match mode {
            MatchMode::Exact => CompiledPattern::Exact(pattern.to_string()),
            MatchMode::Contains => CompiledPattern::Contains(pattern.to_ascii_lowercase()),
            MatchMode::Regex => match Regex::new(pattern) {
                Ok(re) => CompiledPattern::Regex(re),
                Err(e) => {
                    log::warn!("rule pattern failed to compile, marking load-failed: {}", e);
                    CompiledPattern::LoadFailed
                }
            },
        }
    }

    pub fn is_load_failed(&self) -> bool {
        matches!(self, CompiledPattern::LoadFailed)
    }

    /// Evaluate the compiled pattern against `subject`. A load-failed
    /// pattern never matches anything.
    pub fn matches(&self, subject: &str) -> bool {
        match self {
            CompiledPattern::Exact(p) => subject == p,
            CompiledPattern::Contains(p) => subject.to_ascii_lowercase().contains(p.as_str()),
            CompiledPattern::Regex(re) => re.is_match(subject),
            CompiledPattern::LoadFailed => false,
        }
    }
}

/// A compiled IP matcher: either a single literal address or a CIDR block.
/// Malformed values fail closed, i.e. never match.
#[derive(Clone)]
pub enum CompiledIpPattern {
    Literal(IpAddr),
    Cidr(IpNet),
    LoadFailed,
}

impl CompiledIpPattern {
    pub fn compile(value: &str) -> CompiledIpPattern {
        if value.contains('/') {
            match IpNet::from_str(value) {
                Ok(net) => CompiledIpPattern::Cidr(net),
                Err(e) => {
                    log::warn!("malformed CIDR '{}', failing closed: {}", value, e);
                    CompiledIpPattern::LoadFailed
                }
            }
        } else {
            match IpAddr::from_str(value) {
                Ok(ip) => CompiledIpPattern::Literal(ip),
                Err(e) => {
                    log::warn!("malformed IP literal '{}', failing closed: {}", value, e);
                    CompiledIpPattern::LoadFailed
                }
            }
        }
    }

    pub fn matches(&self, candidate: IpAddr) -> bool {
        match self {
            CompiledIpPattern::Literal(ip) => *ip == candidate,
            CompiledIpPattern::Cidr(net) => net.contains(&candidate),
            CompiledIpPattern::LoadFailed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_is_byte_equal() {
        let p = CompiledPattern::compile(MatchMode::Exact, "abc");
        assert!(p.matches("abc"));
        assert!(!p.matches("abcd"));
        assert!(!p.matches("ABC"));
    }

    #[test]
    fn contains_is_case_insensitive() {
        let p = CompiledPattern::compile(MatchMode::Contains, "OR '1'='1");
        assert!(p.matches("id=1' or '1'='1"));
        assert!(!p.matches("id=1"));
    }

    #[test]
    fn regex_is_precompiled_and_partial() {
        let p = CompiledPattern::compile(MatchMode::Regex, r"^/admin");
        assert!(p.matches("/admin/users"));
        assert!(!p.matches("/not-admin"));
    }

    #[test]
    fn unbalanced_regex_is_load_failed_and_never_matches() {
        let p = CompiledPattern::compile(MatchMode::Regex, "[unbalanced");
        assert!(p.is_load_failed());
        assert!(!p.matches("[unbalanced"));
        assert!(!p.matches(""));
    }

    #[test]
    fn ip_literal_matches_exact_address_only() {
        let p = CompiledIpPattern::compile("10.0.0.5");
        assert!(p.matches("10.0.0.5".parse().unwrap()));
        assert!(!p.matches("10.0.0.6".parse().unwrap()));
    }

    #[test]
    fn cidr_matches_membership() {
        let p = CompiledIpPattern::compile("10.0.0.0/24");
        assert!(p.matches("10.0.0.5".parse().unwrap()));
        assert!(!p.matches("10.0.1.5".parse().unwrap()));
    }

    #[test]
    fn malformed_cidr_fails_closed() {
        let p = CompiledIpPattern::compile("10.0.0.0/999");
        assert!(!p.matches("10.0.0.5".parse().unwrap()));
    }
}
