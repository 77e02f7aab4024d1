//! Normalizes podcast episode records from a JSON episodes API into display-ready
//! view models, and renders or pre-generates episode detail pages from them.

pub mod api;
pub mod episode;
pub mod http;
pub mod locale;
pub mod pages;
pub mod render;

pub use episode::{EpisodeView, RawEpisode, ValidationError, normalize, normalize_with_locale};
pub use locale::Locale;
