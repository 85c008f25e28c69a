pub mod emby;
pub mod tmdb;
