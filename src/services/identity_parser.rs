//! Student identifier parsing.
//!
//! Identifiers look like `UG20/SCCS/1026` (an optional hyphen may separate
//! the prefix letters from its digits, e.g. `UG-20/SCCS/1026`). The middle
//! segment is a two-letter faculty code followed by a two-to-four letter
//! department code.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER_RE: Regex =
        Regex::new(r"^[A-Z]+-?\d+/([A-Z]{2})([A-Z]{2,4})/\d+$")
            .expect("identifier pattern must compile");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityCodes {
    pub faculty_code: String,
    pub department_code: String,
}

/// Outcome of parsing. `Unparsed` is not an error: the user simply gets
/// no faculty or department club.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedIdentity {
    Parsed(IdentityCodes),
    Unparsed,
}

pub fn parse_identifier(raw: &str) -> ParsedIdentity {
    let normalized = raw.trim().to_ascii_uppercase();
    match IDENTIFIER_RE.captures(&normalized) {
        Some(caps) => ParsedIdentity::Parsed(IdentityCodes {
            faculty_code: caps[1].to_string(),
            department_code: caps[2].to_string(),
        }),
        None => ParsedIdentity::Unparsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(faculty: &str, department: &str) -> ParsedIdentity {
        ParsedIdentity::Parsed(IdentityCodes {
            faculty_code: faculty.into(),
            department_code: department.into(),
        })
    }

    #[test]
    fn test_parses_reference_identifier() {
        assert_eq!(parse_identifier("UG20/SCCS/1026"), codes("SC", "CS"));
    }

    #[test]
    fn test_accepts_hyphenated_prefix_and_lowercase() {
        assert_eq!(parse_identifier(" ug-19/enmech/0042 "), codes("EN", "MECH"));
    }

    #[test]
    fn test_malformed_identifiers_are_unparsed() {
        for raw in [
            "",
            "UG20",
            "UG20/SC/1026",
            "UG20/S1CS/1026",
            "20/SCCS/1026",
            "UG20/SCCS/",
            "UG20/SCCSXYZ/1026",
            "UG20/SCCS/1026/extra",
        ] {
            assert_eq!(parse_identifier(raw), ParsedIdentity::Unparsed, "{}", raw);
        }
    }
}
