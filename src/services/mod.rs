pub mod files;
pub mod image;
pub mod jobs;
pub mod nfo;
pub mod rename;
pub mod scraper;
pub mod subtitle;
pub mod template;

pub use files::FileService;
pub use image::ImageService;
pub use jobs::JobService;
pub use rename::RenameService;
pub use scraper::ScraperService;
pub use subtitle::SubtitleService;
