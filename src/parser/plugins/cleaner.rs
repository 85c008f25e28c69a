//! Strips release noise (group tags, source/codec brackets) from the
//! filename so later plugins see a cleaner string. Only `cleaned_filename`
//! is touched; the original is preserved for episode-marker plugins.

use super::{ParserPlugin, get_regex};
use crate::parser::ParseContext;
use regex::Regex;
use std::sync::OnceLock;

static LEADING_GROUP_RE: OnceLock<Regex> = OnceLock::new();
static META_BRACKET_RE: OnceLock<Regex> = OnceLock::new();
static META_PAREN_RE: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

const META_KEYWORDS: &str = r"\d{3,4}[pP]|[xXhH]\.?26[45]|HEVC|AVC|AV1|AAC|FLAC|OPUS|BD|BDRip|Blu-?[Rr]ay|WEB-?DL|WEBRip|HDTV|DVDRip|REMUX|10bit|Hi10P|HDR|uncensored|[0-9A-Fa-f]{8}";

pub struct CleanerPlugin;

impl ParserPlugin for CleanerPlugin {
    fn priority(&self) -> u8 {
        10
    }

    fn name(&self) -> &'static str {
        "cleaner"
    }

    fn parse(&self, ctx: &mut ParseContext) {
        let mut cleaned = ctx.original_filename.clone();

        // Release group at the very front, e.g. "[SubsPlease] Title - 01".
        cleaned = get_regex(&LEADING_GROUP_RE, r"^\[[^\]]*\]\s*")
            .replace(&cleaned, "")
            .into_owned();

        // Bracket or paren groups carrying source/codec/checksum metadata.
        let bracket_re = get_regex(
            &META_BRACKET_RE,
            &format!(r"(?x)\[[^\]]*(?:{META_KEYWORDS})[^\]]*\]"),
        );
        cleaned = bracket_re.replace_all(&cleaned, " ").into_owned();

        let paren_re = get_regex(
            &META_PAREN_RE,
            &format!(r"(?x)\([^)]*(?:{META_KEYWORDS})[^)]*\)"),
        );
        cleaned = paren_re.replace_all(&cleaned, " ").into_owned();

        cleaned = get_regex(&WHITESPACE_RE, r"\s+")
            .replace_all(&cleaned, " ")
            .trim()
            .to_string();

        if cleaned != ctx.original_filename {
            ctx.record_match(self.name(), "noise");
        }
        ctx.cleaned_filename = cleaned;
    }
}
