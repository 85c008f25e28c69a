//! Chinese episode markers: `第1集`, `第12话`, numeral variants.

use super::episode_japanese::kanji_to_int;
use super::{ParserPlugin, get_regex};
use crate::parser::ParseContext;
use regex::Regex;
use std::sync::OnceLock;

static DI_ARABIC_RE: OnceLock<Regex> = OnceLock::new();
static DI_NUMERAL_RE: OnceLock<Regex> = OnceLock::new();

pub struct EpisodeChinesePlugin;

impl ParserPlugin for EpisodeChinesePlugin {
    fn priority(&self) -> u8 {
        40
    }

    fn name(&self) -> &'static str {
        "episode_chinese"
    }

    fn should_skip(&self, ctx: &ParseContext) -> bool {
        ctx.episode.is_some()
    }

    fn parse(&self, ctx: &mut ParseContext) {
        let filename = ctx.original_filename.clone();

        if let Some(caps) = get_regex(&DI_ARABIC_RE, r"第(\d{1,3})[集话]").captures(&filename)
            && let Ok(episode) = caps[1].parse()
        {
            ctx.episode = Some(episode);
            ctx.record_match(self.name(), "di_ji");
            return;
        }

        if let Some(caps) =
            get_regex(&DI_NUMERAL_RE, r"第([一二三四五六七八九十]+)[集话]").captures(&filename)
            && let Some(episode) = kanji_to_int(&caps[1])
        {
            ctx.episode = Some(episode);
            ctx.record_match(self.name(), "di_ji_numeral");
        }
    }
}
