//! Text extraction helpers for iproute2 and brctl output.
//!
//! Output of `ip addr show` and `brctl show` is line oriented, with nesting
//! expressed only through indentation. Parsers here never fail: a line that
//! does not match simply yields no field.

use once_cell::sync::Lazy;
use regex::Regex;

const IF_HEADER: &str = r"(?P<ifindex>\d+):\s+(?P<ifname>\S+):\s+<(?P<flags>[^>\s]*)>";

/// `<index>: <name>: <FLAGS>` interface header line.
pub static IF_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(IF_HEADER).expect("Invalid regex pattern"));

/// `mtu <N>` on the header line.
pub static MTU_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+mtu (?P<mtu>\S+)").expect("Invalid regex pattern"));

/// `state <STATE>` on the header line.
pub static STATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+state (?P<oper>\S+)").expect("Invalid regex pattern"));

/// `link/ether <MAC> ...` sub-line.
pub static ETHER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+link/ether\s+(?P<addr>\S+)(?:\s+|$)").expect("Invalid regex pattern")
});

/// `<af> <addr>/<prefix>` address sub-line.
pub static ADDR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+(?P<af_type>\S+)\s+(?P<addr>\S+)/(?P<prefix>\S+)")
        .expect("Invalid regex pattern")
});

/// Bridge name column of a `brctl show` row.
pub static BR_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<bname>\S+)\s+").expect("Invalid regex pattern"));

/// Bridge id column of the first `brctl show <br>` row.
pub static BR_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\S+\s+(?P<br_id>\S+)\s+").expect("Invalid regex pattern"));

/// Interfaces column of the first `brctl show <br>` row.
pub static BR_FIRST_MEMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\S+\s+\S+\s+\S+\s+(?P<iname>\S+)").expect("Invalid regex pattern")
});

/// Continuation rows of `brctl show <br>` carry only an interface name.
pub static BR_MEMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+(?P<iname>\S+)").expect("Invalid regex pattern"));

/// Applies `pattern` anywhere in `line` and returns the named group.
///
/// Returns `None` when the pattern does not match or the group did not
/// participate in the match.
pub fn extract(pattern: &Regex, field: &str, line: &str) -> Option<String> {
    pattern
        .captures(line)?
        .name(field)
        .map(|m| m.as_str().to_string())
}

/// Width of the leading whitespace of `line`.
pub fn leading_ws(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Splits `lines` into contiguous blocks, opening a new block at every line
/// whose indentation equals `reference_indent`.
///
/// Lines before the first reference-indented line form their own block.
/// Concatenating the result reproduces the input exactly.
pub fn group_lines_by_indent<S: AsRef<str>>(
    reference_indent: usize,
    lines: &[S],
) -> Vec<Vec<String>> {
    let mut blocks = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in lines {
        let line = line.as_ref();
        if leading_ws(line) == reference_indent && !current.is_empty() {
            blocks.push(std::mem::take(&mut current));
        }
        current.push(line.to_string());
    }

    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}
