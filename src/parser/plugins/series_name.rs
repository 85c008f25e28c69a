//! Series-name extraction from the cleaned filename.
//!
//! Runs last: only when the folder context did not already supply a name.
//! The name is the prefix before the earliest episode marker or year, with
//! standard noise stripped.

use super::episode_japanese::KANJI_NUMERALS;
use super::{ParserPlugin, get_regex};
use crate::parser::ParseContext;
use regex::Regex;
use std::sync::OnceLock;

static MARKER_RE: OnceLock<Regex> = OnceLock::new();
static EXTENSION_RE: OnceLock<Regex> = OnceLock::new();
static BRACKET_RE: OnceLock<Regex> = OnceLock::new();
static PAREN_RE: OnceLock<Regex> = OnceLock::new();
static ANIMATION_SUFFIX_RE: OnceLock<Regex> = OnceLock::new();
static OVA_PREFIX_RE: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

/// Positions where the series name ends: episode markers of every dialect
/// the episode plugins understand, plus a year tag.
fn marker_re() -> &'static Regex {
    get_regex(
        &MARKER_RE,
        &format!(
            r"(?x)
            [Ss]\d{{1,2}}[.\s_-]?[Ee]\d{{1,3}}
            | [.\s_-][Ee][Pp]?\d{{1,3}}(?:[.\s_-]|$)
            | 第[\d{KANJI_NUMERALS}]+[話话集巻編章]
            | 其の
            | [＃\#♯]\d{{1,3}}
            | \[\d{{1,3}}\]
            | [\[(](?:19|20)\d{{2}}[\])]
            | [.\s_-]\d{{1,3}}[.\s_-]?(?:\[|$|\.(?:mp4|mkv|avi))
        "
        ),
    )
}

pub struct SeriesNamePlugin;

impl ParserPlugin for SeriesNamePlugin {
    fn priority(&self) -> u8 {
        50
    }

    fn name(&self) -> &'static str {
        "series_name"
    }

    fn should_skip(&self, ctx: &ParseContext) -> bool {
        ctx.series_name.is_some()
    }

    fn parse(&self, ctx: &mut ParseContext) {
        let stem = get_regex(&EXTENSION_RE, r"\.[A-Za-z0-9]{2,4}$")
            .replace(&ctx.cleaned_filename, "")
            .into_owned();

        let prefix = marker_re()
            .find(&stem)
            .map_or(stem.as_str(), |m| &stem[..m.start()]);

        let mut name = prefix.replace(['.', '_'], " ");
        name = get_regex(&BRACKET_RE, r"\[[^\]]*\]")
            .replace_all(&name, " ")
            .into_owned();
        name = get_regex(&PAREN_RE, r"\([^)]*\)")
            .replace_all(&name, " ")
            .into_owned();
        name = name.replace(['[', ']', '(', ')'], " ");

        name = get_regex(&ANIMATION_SUFFIX_RE, r"(?i)\s+the\s+animation\s*$")
            .replace(&name, "")
            .into_owned();
        name = get_regex(&OVA_PREFIX_RE, r"(?i)^(?:OVA|OAD|ONA)\s+")
            .replace(&name, "")
            .into_owned();

        name = get_regex(&WHITESPACE_RE, r"\s+")
            .replace_all(&name, " ")
            .into_owned();
        let name = name.trim_matches([' ', '-', '_']).to_string();

        if name.chars().count() >= 2 {
            ctx.series_name = Some(name);
            ctx.record_match(self.name(), "prefix");
        }
    }
}
