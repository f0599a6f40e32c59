//! VCenter VM name → Zabbix host name
//!
//! VMs are named `VW-<host>-<owner>` in VCenter while Zabbix knows them as
//! `<host>`. Every component (export, grouping, comparison) goes through
//! [`normalize`]; nothing else is allowed to derive identities.

use regex::Regex;
use std::sync::LazyLock;

static VW_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"VW-(\w+)-").expect("VW_TOKEN is a valid regex pattern"));

/// Canonical identity of a VM name.
///
/// Returns the token of the leftmost `VW-<token>-` occurrence, case preserved,
/// or the input unchanged when no such occurrence exists.
pub fn normalize(raw_name: &str) -> String {
    match VW_TOKEN.captures(raw_name).and_then(|c| c.get(1)) {
        Some(token) => token.as_str().to_string(),
        None => raw_name.to_string(),
    }
}
