//! Filename parsing built from a chain of prioritized plugins.
//!
//! Each plugin inspects and updates a shared [`ParseContext`]; the chain is
//! ordered once at construction and parsing itself never fails. A file that
//! no plugin understands simply comes back with `is_parsed = false`.

pub mod plugins;

use crate::models::parsed::ParsedInfo;

pub use plugins::ParserPlugin;

/// Mutable state threaded through the plugin chain for one filename.
#[derive(Debug, Clone, Default)]
pub struct ParseContext {
    pub original_filename: String,
    pub filepath: Option<String>,

    /// Filename with release noise removed, maintained by the cleaner plugin
    /// for plugins that run after it.
    pub cleaned_filename: String,

    pub series_name: Option<String>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    pub year: Option<i32>,
    pub tmdb_id: Option<i64>,

    pub matched_patterns: Vec<String>,
}

impl ParseContext {
    #[must_use]
    pub fn new(filename: &str, filepath: Option<&str>) -> Self {
        Self {
            original_filename: filename.to_string(),
            filepath: filepath.map(std::string::ToString::to_string),
            cleaned_filename: filename.to_string(),
            ..Self::default()
        }
    }

    pub fn record_match(&mut self, plugin: &str, pattern: &str) {
        self.matched_patterns.push(format!("{plugin}:{pattern}"));
    }
}

pub struct Parser {
    plugins: Vec<Box<dyn ParserPlugin>>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self::with_plugins(plugins::default_plugins())
    }

    /// Build a parser from an explicit plugin set. Ordering is established
    /// here, once, by ascending priority.
    #[must_use]
    pub fn with_plugins(mut plugins: Vec<Box<dyn ParserPlugin>>) -> Self {
        plugins.sort_by_key(|p| p.priority());
        Self { plugins }
    }

    #[must_use]
    pub fn parse(&self, filename: &str, filepath: Option<&str>) -> ParsedInfo {
        let mut ctx = ParseContext::new(filename, filepath);

        for plugin in &self.plugins {
            if !plugin.should_skip(&ctx) {
                plugin.parse(&mut ctx);
            }
        }

        let confidence = Self::score(&ctx);
        let is_parsed = ctx.episode.is_some() || ctx.series_name.is_some();

        ParsedInfo {
            original_filename: filename.to_string(),
            series_name: ctx.series_name,
            season: ctx.season,
            episode: ctx.episode,
            year: ctx.year,
            tmdb_id: ctx.tmdb_id,
            is_parsed,
            confidence,
            matched_patterns: ctx.matched_patterns,
        }
    }

    /// Parse many `(filename, filepath)` pairs, reporting the share that
    /// produced something usable.
    #[must_use]
    pub fn parse_batch(&self, files: &[(String, Option<String>)]) -> (Vec<ParsedInfo>, f32) {
        let results: Vec<ParsedInfo> = files
            .iter()
            .map(|(name, path)| self.parse(name, path.as_deref()))
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let success_rate = if results.is_empty() {
            0.0
        } else {
            results.iter().filter(|r| r.is_parsed).count() as f32 / results.len() as f32
        };

        (results, success_rate)
    }

    fn score(ctx: &ParseContext) -> f32 {
        let mut confidence: f32 = 0.0;

        if let Some(name) = &ctx.series_name {
            confidence += 0.4;
            if name.chars().count() >= 4 {
                confidence += 0.05;
            }
        }
        if ctx.season.is_some() {
            confidence += 0.2;
        }
        if ctx.episode.is_some() {
            confidence += 0.3;
        }
        if ctx.year.is_some() {
            confidence += 0.1;
        }

        confidence.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_standard_plex_name() {
        let parser = Parser::new();
        let info = parser.parse("Show Name - S01E03 - Pilot.mkv", None);

        assert_eq!(info.series_name.as_deref(), Some("Show Name"));
        assert_eq!(info.season, Some(1));
        assert_eq!(info.episode, Some(3));
        assert!(info.is_parsed);
        assert!(info.confidence >= 0.9);
    }

    #[test]
    fn test_unparseable_filename() {
        let parser = Parser::new();
        let info = parser.parse("x.mkv", None);

        assert!(!info.is_parsed);
        assert_eq!(info.series_name, None);
        assert_eq!(info.episode, None);
    }

    #[test]
    fn test_tmdb_id_from_folder() {
        let parser = Parser::new();
        let info = parser.parse(
            "ep01.mkv",
            Some("/library/My Show (2021) [tmdbid-12345]/Season 1/ep01.mkv"),
        );

        assert_eq!(info.tmdb_id, Some(12345));
        assert_eq!(info.season, Some(1));
        assert_eq!(info.year, Some(2021));
        assert_eq!(info.series_name.as_deref(), Some("My Show"));
        assert!(
            info.matched_patterns
                .iter()
                .any(|p| p == "folder_context:series_name")
        );
    }

    #[test]
    fn test_folder_year_out_of_range_ignored() {
        let parser = Parser::new();
        let info = parser.parse("ep01.mkv", Some("/data/shows/Old Show (2035)/ep01.mkv"));

        assert_eq!(info.year, None);
        assert_eq!(info.series_name.as_deref(), Some("Old Show"));
    }

    #[test]
    fn test_batch_success_rate() {
        let parser = Parser::new();
        let files = vec![
            ("Show - S01E01.mkv".to_string(), None),
            ("???.mkv".to_string(), None),
        ];

        let (results, rate) = parser.parse_batch(&files);
        assert_eq!(results.len(), 2);
        assert!((rate - 0.5).abs() < f32::EPSILON);
    }

    proptest! {
        #[test]
        fn parse_never_panics_and_confidence_bounded(name in "\\PC{0,80}") {
            let parser = Parser::new();
            let info = parser.parse(&name, None);
            prop_assert!((0.0..=1.0).contains(&info.confidence));
        }

        #[test]
        fn sxxeyy_always_extracted(season in 1i32..=99, episode in 1i32..=999) {
            let parser = Parser::new();
            let name = format!("Some Show S{season:02}E{episode:03}.mkv");
            let info = parser.parse(&name, None);
            prop_assert_eq!(info.season, Some(season));
            prop_assert_eq!(info.episode, Some(episode));
        }

        #[test]
        fn folder_tmdb_id_always_extracted(id in 1i64..=9_999_999) {
            let parser = Parser::new();
            let path = format!("/media/library/Show [tmdbid-{id}]/file01.mkv");
            let info = parser.parse("file01.mkv", Some(&path));
            prop_assert_eq!(info.tmdb_id, Some(id));
        }
    }
}
