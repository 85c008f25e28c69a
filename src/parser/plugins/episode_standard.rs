//! Standard episode markers: `S01E01`, `EP01`, `[01]`, trailing numbers.

use super::{ParserPlugin, get_regex};
use crate::parser::ParseContext;
use regex::Regex;
use std::sync::OnceLock;

static SEASON_EPISODE_RE: OnceLock<Regex> = OnceLock::new();
static EPISODE_ONLY_RE: OnceLock<Regex> = OnceLock::new();
static BRACKET_EPISODE_RE: OnceLock<Regex> = OnceLock::new();
static TRAILING_NUMBER_RE: OnceLock<Regex> = OnceLock::new();

pub struct EpisodeStandardPlugin;

impl EpisodeStandardPlugin {
    /// Patterns tried in order; the first hit wins.
    fn patterns() -> [(&'static Regex, &'static str); 4] {
        [
            (
                get_regex(
                    &SEASON_EPISODE_RE,
                    r"[.\s_-]?[Ss](\d{1,2})[.\s_-]?[Ee](\d{1,3})",
                ),
                "season_episode",
            ),
            (
                get_regex(&EPISODE_ONLY_RE, r"[.\s_-][Ee][Pp]?(\d{1,3})(?:[.\s_-]|$)"),
                "episode_only",
            ),
            (
                get_regex(&BRACKET_EPISODE_RE, r"\[(\d{1,3})\]"),
                "episode_only",
            ),
            (
                get_regex(
                    &TRAILING_NUMBER_RE,
                    r"[.\s_-](\d{1,3})[.\s_-]?(?:\[|$|\.(?:mp4|mkv|avi))",
                ),
                "trailing_number",
            ),
        ]
    }
}

impl ParserPlugin for EpisodeStandardPlugin {
    fn priority(&self) -> u8 {
        20
    }

    fn name(&self) -> &'static str {
        "episode_standard"
    }

    fn should_skip(&self, ctx: &ParseContext) -> bool {
        ctx.episode.is_some()
    }

    fn parse(&self, ctx: &mut ParseContext) {
        for (pattern, pattern_type) in Self::patterns() {
            let Some(caps) = pattern.captures(&ctx.original_filename) else {
                continue;
            };

            if pattern_type == "season_episode" {
                ctx.season = caps[1].parse().ok();
                ctx.episode = caps[2].parse().ok();
            } else {
                ctx.episode = caps[1].parse().ok();
            }

            if ctx.episode.is_some() {
                ctx.record_match(self.name(), pattern_type);
                return;
            }
        }
    }
}
