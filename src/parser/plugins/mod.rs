mod cleaner;
mod episode_chinese;
mod episode_japanese;
mod episode_standard;
mod folder_context;
mod series_name;

pub use cleaner::CleanerPlugin;
pub use episode_chinese::EpisodeChinesePlugin;
pub use episode_japanese::EpisodeJapanesePlugin;
pub use episode_standard::EpisodeStandardPlugin;
pub use folder_context::FolderContextPlugin;
pub use series_name::SeriesNamePlugin;

use crate::parser::ParseContext;
use regex::Regex;
use std::sync::OnceLock;

/// One stage of the parse chain. Plugins are pure transformations on
/// [`ParseContext`] and must not overwrite fields another plugin already
/// filled unless their contract says so.
pub trait ParserPlugin: Send + Sync {
    /// Lower runs earlier.
    fn priority(&self) -> u8;

    fn name(&self) -> &'static str;

    fn should_skip(&self, _ctx: &ParseContext) -> bool {
        false
    }

    fn parse(&self, ctx: &mut ParseContext);
}

/// The default chain, in priority order: folder context, cleaner, standard
/// episode markers, Japanese markers, Chinese markers, series name.
#[must_use]
pub fn default_plugins() -> Vec<Box<dyn ParserPlugin>> {
    vec![
        Box::new(FolderContextPlugin),
        Box::new(CleanerPlugin),
        Box::new(EpisodeStandardPlugin),
        Box::new(EpisodeJapanesePlugin),
        Box::new(EpisodeChinesePlugin),
        Box::new(SeriesNamePlugin),
    ]
}

pub(crate) fn get_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}
