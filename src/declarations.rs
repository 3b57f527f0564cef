//! Parsing of declaration text produced by the generator
//!
//! Objects and scopes arrive as `name: meaning` lines. Relations carry
//! their parameter list and usage cases:
//!
//! ```text
//! locates_in(a, b): a is located in b | locates_in(aleph, paris); locates_in(paris, france)
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A `name: meaning` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedDecl {
    pub name: String,
    pub meaning: String,
}

/// A parsed relation declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDecl {
    pub name: String,
    pub params: Vec<String>,
    pub meaning: String,
    pub usage_cases: Vec<String>,
}

static PARAMS_RE: OnceLock<Regex> = OnceLock::new();
static SECTION_RE: OnceLock<Regex> = OnceLock::new();

fn params_regex() -> &'static Regex {
    PARAMS_RE.get_or_init(|| Regex::new(r"\(([^()]*)\)").expect("parameter list pattern"))
}

fn section_regex() -> &'static Regex {
    SECTION_RE.get_or_init(|| Regex::new(r"-- \*\*.+\n").expect("section header pattern"))
}

fn skip_line(line: &str) -> bool {
    line.trim().is_empty() || line.contains("```")
}

fn split_named(line: &str) -> Option<NamedDecl> {
    let (name, meaning) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(NamedDecl { name: name.to_string(), meaning: meaning.trim().to_string() })
}

/// Parse `name: meaning` object lines; lines without `:` are ignored
pub fn parse_object_lines(text: &str) -> Vec<NamedDecl> {
    text.lines().filter(|l| !skip_line(l)).filter_map(split_named).collect()
}

/// Parse `name: meaning` scope lines
pub fn parse_scope_lines(text: &str) -> Vec<NamedDecl> {
    parse_object_lines(text)
}

/// Parse one `name(p1, p2): meaning | case; case` line.
///
/// Each usage case must use the declared number of commas, so a case list
/// whose comma count is not a multiple of the declaration's is rejected.
pub fn parse_relation_line(line: &str) -> CoreResult<RelationDecl> {
    let line = line.trim();
    let invalid = |reason: &str| CoreError::invalid_declaration(line, reason);

    let (head, rest) = line
        .split_once(':')
        .ok_or_else(|| invalid("expected `name(params): meaning | usage cases`"))?;
    let (meaning, cases) = rest
        .split_once('|')
        .ok_or_else(|| invalid("no usage case given after `|`"))?;

    if cases.contains('"') || cases.contains('\'') {
        return Err(invalid("relations should not take strings; use declared objects or integers"));
    }

    let head = head.trim();
    let name = head.split('(').next().unwrap_or(head).trim();
    if !crate::fol::is_identifier(name) {
        return Err(invalid("relation name is not an identifier"));
    }

    let params: Vec<String> = match params_regex().captures(head) {
        Some(caps) => caps[1]
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        None => return Err(invalid("missing parameter list")),
    };

    let usage_cases: Vec<String> = cases
        .split(';')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    // unary relations have no commas to compare
    if params.len() > 1 {
        let declared = params.len() - 1;
        let total: usize = usage_cases.iter().map(|c| c.matches(',').count()).sum();
        if total % declared != 0 {
            return Err(invalid(&format!(
                "usage cases are ambiguous: {} commas is not a multiple of the {} separating the parameters",
                total, declared
            )));
        }
    }

    Ok(RelationDecl {
        name: name.to_string(),
        params,
        meaning: meaning.trim().to_string(),
        usage_cases,
    })
}

/// Parse every relation line in `text`, stopping at the first bad one
pub fn parse_relation_lines(text: &str) -> CoreResult<Vec<RelationDecl>> {
    text.lines().filter(|l| !skip_line(l)).map(parse_relation_line).collect()
}

/// Split a generator response on `-- **Title**` header lines
pub fn divide_response_parts(text: &str) -> Vec<String> {
    section_regex()
        .split(text)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
