//! Japanese episode markers: `第1話`, `第十二話`, `其の三`, `＃4`.

use super::{ParserPlugin, get_regex};
use crate::parser::ParseContext;
use regex::Regex;
use std::sync::OnceLock;

static DAI_ARABIC_RE: OnceLock<Regex> = OnceLock::new();
static DAI_KANJI_RE: OnceLock<Regex> = OnceLock::new();
static SONO_RE: OnceLock<Regex> = OnceLock::new();
static HASH_RE: OnceLock<Regex> = OnceLock::new();

/// Kanji numerals accepted as episode numbers.
pub const KANJI_NUMERALS: &str = "一二三四五六七八九十";

/// Converts kanji numerals up to 99 (`一` .. `九十九`). Returns `None` for
/// anything it does not understand.
pub(crate) fn kanji_to_int(text: &str) -> Option<i32> {
    let digit = |c: char| -> Option<i32> {
        match c {
            '一' => Some(1),
            '二' => Some(2),
            '三' => Some(3),
            '四' => Some(4),
            '五' => Some(5),
            '六' => Some(6),
            '七' => Some(7),
            '八' => Some(8),
            '九' => Some(9),
            _ => None,
        }
    };

    let chars: Vec<char> = text.chars().collect();
    match chars.as_slice() {
        [] => None,
        ['十'] => Some(10),
        [c] => digit(*c),
        ['十', c] => digit(*c).map(|units| 10 + units),
        [c, '十'] => digit(*c).map(|tens| tens * 10),
        [tens, '十', units] => {
            let tens = digit(*tens)?;
            let units = digit(*units)?;
            Some(tens * 10 + units)
        }
        _ => None,
    }
}

pub struct EpisodeJapanesePlugin;

impl ParserPlugin for EpisodeJapanesePlugin {
    fn priority(&self) -> u8 {
        30
    }

    fn name(&self) -> &'static str {
        "episode_japanese"
    }

    fn should_skip(&self, ctx: &ParseContext) -> bool {
        ctx.episode.is_some()
    }

    fn parse(&self, ctx: &mut ParseContext) {
        let filename = ctx.original_filename.clone();

        if let Some(caps) = get_regex(&DAI_ARABIC_RE, r"第(\d{1,3})話").captures(&filename)
            && let Ok(episode) = caps[1].parse()
        {
            ctx.episode = Some(episode);
            ctx.record_match(self.name(), "dai_wa");
            return;
        }

        if let Some(caps) = get_regex(&DAI_KANJI_RE, r"第([一二三四五六七八九十]+)話")
            .captures(&filename)
            && let Some(episode) = kanji_to_int(&caps[1])
        {
            ctx.episode = Some(episode);
            ctx.record_match(self.name(), "dai_wa_kanji");
            return;
        }

        if let Some(caps) =
            get_regex(&SONO_RE, r"其の([一二三四五六七八九十]+|\d{1,3})").captures(&filename)
        {
            let episode = caps[1]
                .parse()
                .ok()
                .or_else(|| kanji_to_int(&caps[1]));
            if let Some(episode) = episode {
                ctx.episode = Some(episode);
                ctx.record_match(self.name(), "sono");
                return;
            }
        }

        if let Some(caps) = get_regex(&HASH_RE, r"[＃#♯](\d{1,3})").captures(&filename)
            && let Ok(episode) = caps[1].parse()
        {
            ctx.episode = Some(episode);
            ctx.record_match(self.name(), "hash");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(filename: &str) -> Option<i32> {
        let mut ctx = ParseContext::new(filename, None);
        EpisodeJapanesePlugin.parse(&mut ctx);
        ctx.episode
    }

    #[test]
    fn test_dai_wa_arabic() {
        assert_eq!(parse("ある作品 第3話.mp4"), Some(3));
        assert_eq!(parse("ある作品 第12話 (BD).mkv"), Some(12));
    }

    #[test]
    fn test_dai_wa_kanji() {
        assert_eq!(parse("ある作品 第三話.mp4"), Some(3));
        assert_eq!(parse("ある作品 第十二話.mp4"), Some(12));
        assert_eq!(parse("ある作品 第二十一話.mp4"), Some(21));
    }

    #[test]
    fn test_sono() {
        assert_eq!(parse("ある作品 其の一.mp4"), Some(1));
        assert_eq!(parse("ある作品 其の2.mp4"), Some(2));
    }

    #[test]
    fn test_hash_marker() {
        assert_eq!(parse("ある作品 ＃4.mp4"), Some(4));
        assert_eq!(parse("ある作品 #10.mp4"), Some(10));
    }

    #[test]
    fn test_kanji_to_int() {
        assert_eq!(kanji_to_int("一"), Some(1));
        assert_eq!(kanji_to_int("十"), Some(10));
        assert_eq!(kanji_to_int("十五"), Some(15));
        assert_eq!(kanji_to_int("三十"), Some(30));
        assert_eq!(kanji_to_int("九十九"), Some(99));
        assert_eq!(kanji_to_int("百"), None);
    }
}
