//! Transcript parser — single-pass state machine over scanner output
//!
//! The scanner's report is a fixed, line-oriented grammar:
//!
//! ```text
//! Hash <fingerprint>                                  — opens a group
//! * Method <label> in file <path>, line <n>           — primary or variant
//! URL: <locator>                                      — variant locator, or
//!                                                       extra primary locator
//! ```
//!
//! Parsing is tolerant by contract: the external tool's output is not
//! validated, it is absorbed. Malformed lines are skipped with a warning,
//! never fatal. One group is emitted per `Hash` header, in header order,
//! even when the block under it yields no usable primary.

use super::{MatchGroup, MatchRecord, SourceLocation};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static METHOD_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\* Method (.*?) in file (.*?), line (\d+)").expect("method line pattern")
});

/// Parser position within the transcript.
///
/// Exactly the three situations the grammar distinguishes; every line class
/// is handled explicitly for each of them.
enum ParserState {
    /// No `Hash` header seen yet (or only ignorable noise so far)
    NoGroup,
    /// Header seen, first method line still pending
    AwaitingPrimary(MatchGroup),
    /// Primary assigned; further method lines are variants
    HavePrimary(MatchGroup),
}

impl ParserState {
    /// Flush the open group (if any) into `out` and reset to `NoGroup`.
    fn flush(&mut self, out: &mut Vec<MatchGroup>) {
        match std::mem::replace(self, ParserState::NoGroup) {
            ParserState::NoGroup => {}
            ParserState::AwaitingPrimary(group) | ParserState::HavePrimary(group) => {
                out.push(group);
            }
        }
    }
}

/// Parse a raw scanner transcript into ordered match groups.
///
/// `repo_url` is the repository under test; it is only used to synthesize
/// the primary's blob locator (`<repo_url>/blob/main/<path>#L<line>`).
/// Pure and infallible — grammar mismatches degrade per line, never abort.
pub fn parse(transcript: &str, repo_url: &str) -> Vec<MatchGroup> {
    let mut groups = Vec::new();
    let mut state = ParserState::NoGroup;

    for line in transcript.lines() {
        if let Some(fingerprint) = hash_header(line) {
            state.flush(&mut groups);
            state = ParserState::AwaitingPrimary(MatchGroup::new(fingerprint));
        } else if is_method_line(line) {
            state = handle_method_line(state, line, repo_url);
        } else if let Some(url) = url_line(line) {
            state = handle_url_line(state, url);
        }
        // Anything else: blank lines, comments, scanner chatter — ignored.
    }

    state.flush(&mut groups);
    groups
}

// ─── Line Classification ────────────────────────────────────────────

/// `Hash <fingerprint>` header. The fingerprint token is required; a bare
/// `Hash` line is treated as noise.
fn hash_header(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("Hash ")?;
    let token = rest.split_whitespace().next()?;
    Some(token)
}

fn is_method_line(line: &str) -> bool {
    line.trim_start().starts_with("* Method") && line.contains("in file")
}

fn url_line(line: &str) -> Option<&str> {
    let idx = line.find("URL:")?;
    Some(line[idx + "URL:".len()..].trim())
}

// ─── Transitions ────────────────────────────────────────────────────

fn handle_method_line(state: ParserState, line: &str, repo_url: &str) -> ParserState {
    match state {
        // Method line before any header: the occurrence has no fingerprint
        // to belong to. Skip it.
        ParserState::NoGroup => {
            warn!("method line outside any hash group, skipping: {line}");
            ParserState::NoGroup
        }
        ParserState::AwaitingPrimary(mut group) => {
            match decompose_method_line(line) {
                Some((label, location)) => {
                    group
                        .found_in
                        .push(primary_locator(repo_url, &location));
                    group.primary = Some(MatchRecord::new(label, location));
                }
                None => {
                    // Marker present but the file/line suffix is unparseable.
                    // Keep the group alive with an empty-location primary.
                    warn!(
                        fingerprint = %group.fingerprint,
                        "unparseable primary match line: {line}"
                    );
                    group.primary = Some(MatchRecord::new("", SourceLocation::default()));
                }
            }
            ParserState::HavePrimary(group)
        }
        ParserState::HavePrimary(mut group) => {
            // Every further method line under this hash is a variant, even
            // when the scanner re-emits a primary-style line.
            if let Some((label, location)) = decompose_method_line(line) {
                group.variants.push(MatchRecord::new(label, location));
            }
            ParserState::HavePrimary(group)
        }
    }
}

fn handle_url_line(state: ParserState, url: &str) -> ParserState {
    match state {
        // A locator with no group, or before the primary exists, has
        // nothing to attach to.
        ParserState::NoGroup => {
            warn!("URL line outside any hash group, discarding: {url}");
            ParserState::NoGroup
        }
        ParserState::AwaitingPrimary(group) => {
            warn!(
                fingerprint = %group.fingerprint,
                "URL line before any match line, discarding: {url}"
            );
            ParserState::AwaitingPrimary(group)
        }
        ParserState::HavePrimary(mut group) => {
            match group.variants.last_mut() {
                Some(variant) if variant.url.is_none() => {
                    variant.url = Some(url.to_string());
                }
                // No pending variant: an additional location for the primary.
                _ => group.found_in.push(url.to_string()),
            }
            ParserState::HavePrimary(group)
        }
    }
}

fn decompose_method_line(line: &str) -> Option<(String, SourceLocation)> {
    let caps = METHOD_LINE.captures(line)?;
    let label = caps.get(1)?.as_str().to_string();
    let location = SourceLocation::new(caps.get(2)?.as_str(), caps.get(3)?.as_str());
    Some((label, location))
}

/// Synthesize the query project's blob URL from the reported path.
///
/// Paths conventionally carry a `./` prefix; one without it is taken as-is.
fn primary_locator(repo_url: &str, location: &SourceLocation) -> String {
    let path = match location.file.split_once("./") {
        Some((_, suffix)) => suffix,
        None => {
            warn!("match path without ./ prefix: {}", location.file);
            location.file.as_str()
        }
    };
    format!("{repo_url}/blob/main/{path}#L{}", location.line)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPO: &str = "https://github.com/o/r";

    #[test]
    fn spec_example_single_group() {
        let transcript = "Hash abc123\n\
                          * Method foo, line 10 in file ./src/a.c, line 10\n\
                          URL: https://x/prior\n";
        let groups = parse(transcript, REPO);
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.fingerprint, "abc123");
        assert_eq!(
            group.found_in,
            vec![
                "https://github.com/o/r/blob/main/src/a.c#L10".to_string(),
                "https://x/prior".to_string(),
            ]
        );
        let primary = group.primary.as_ref().expect("primary");
        assert_eq!(primary.label, "foo, line 10");
        assert_eq!(primary.location, SourceLocation::new("./src/a.c", "10"));
        assert!(group.variants.is_empty());
    }

    #[test]
    fn one_group_per_header_in_header_order() {
        let transcript = "Hash h1\n\
                          * Method a in file ./a.c, line 1\n\
                          Hash h2\n\
                          Hash h3\n\
                          * Method c in file ./c.c, line 3\n";
        let groups = parse(transcript, REPO);
        let fingerprints: Vec<&str> =
            groups.iter().map(|g| g.fingerprint.as_str()).collect();
        assert_eq!(fingerprints, vec!["h1", "h2", "h3"]);
        // h2 never saw a method line but is still emitted
        assert!(groups[1].primary.is_none());
        assert!(groups[2].primary.is_some());
    }

    #[test]
    fn variant_takes_following_url_line() {
        let transcript = "Hash h1\n\
                          * Method own in file ./src/x.c, line 5\n\
                          * Method method: bar, project: 9, version: 1, license: MIT in file ./y.c, line 7\n\
                          URL: https://github.com/other/repo/blob/main/y.c#L7\n";
        let groups = parse(transcript, REPO);
        assert_eq!(groups[0].variants.len(), 1);
        assert_eq!(
            groups[0].variants[0].url.as_deref(),
            Some("https://github.com/other/repo/blob/main/y.c#L7")
        );
    }

    #[test]
    fn consecutive_urls_overflow_to_found_in() {
        let transcript = "Hash h1\n\
                          * Method own in file ./src/x.c, line 5\n\
                          * Method method: bar, project: 9, version: 1, license: MIT in file ./y.c, line 7\n\
                          URL: https://x/variant\n\
                          URL: https://x/extra-1\n\
                          URL: https://x/extra-2\n";
        let groups = parse(transcript, REPO);
        assert_eq!(groups[0].variants[0].url.as_deref(), Some("https://x/variant"));
        assert_eq!(
            groups[0].found_in,
            vec![
                "https://github.com/o/r/blob/main/src/x.c#L5".to_string(),
                "https://x/extra-1".to_string(),
                "https://x/extra-2".to_string(),
            ]
        );
    }

    #[test]
    fn url_without_open_group_is_discarded() {
        let groups = parse("URL: https://x/orphan\nHash h1\n", REPO);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].found_in.is_empty());
    }

    #[test]
    fn url_before_primary_is_discarded() {
        let transcript = "Hash h1\n\
                          URL: https://x/early\n\
                          * Method own in file ./a.c, line 1\n";
        let groups = parse(transcript, REPO);
        assert_eq!(
            groups[0].found_in,
            vec!["https://github.com/o/r/blob/main/a.c#L1".to_string()]
        );
    }

    #[test]
    fn unparseable_primary_suffix_yields_empty_location() {
        let transcript = "Hash h1\n\
                          * Method broken in file but no line suffix\n";
        let groups = parse(transcript, REPO);
        let primary = groups[0].primary.as_ref().expect("primary still created");
        assert_eq!(primary.location, SourceLocation::default());
        assert!(groups[0].found_in.is_empty());
    }

    #[test]
    fn duplicate_primary_style_lines_become_variants() {
        let transcript = "Hash h1\n\
                          * Method first in file ./a.c, line 1\n\
                          * Method second in file ./b.c, line 2\n\
                          * Method third in file ./c.c, line 3\n";
        let groups = parse(transcript, REPO);
        assert_eq!(groups[0].primary.as_ref().unwrap().label, "first");
        let variant_labels: Vec<&str> =
            groups[0].variants.iter().map(|v| v.label.as_str()).collect();
        assert_eq!(variant_labels, vec!["second", "third"]);
    }

    #[test]
    fn noise_lines_are_ignored() {
        let transcript = "scanner starting up\n\
                          \n\
                          Hash h1\n\
                          -- progress 50% --\n\
                          * Method own in file ./a.c, line 1\n\
                          done.\n";
        let groups = parse(transcript, REPO);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].primary.is_some());
    }

    #[test]
    fn bare_hash_line_is_noise() {
        let groups = parse("Hash\nHash \n", REPO);
        assert!(groups.is_empty());
    }

    #[test]
    fn path_without_dot_slash_prefix_used_verbatim() {
        let transcript = "Hash h1\n* Method own in file src/a.c, line 4\n";
        let groups = parse(transcript, REPO);
        assert_eq!(
            groups[0].found_in,
            vec!["https://github.com/o/r/blob/main/src/a.c#L4".to_string()]
        );
    }

    #[test]
    fn empty_transcript_yields_no_groups() {
        assert!(parse("", REPO).is_empty());
    }
}
