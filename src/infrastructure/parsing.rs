//! HTML extraction for listing and trend pages
//!
//! Parsing is synchronous and works on captured HTML; nothing here touches the
//! network. Selector drift is absorbed by ordered fallback strategies.

pub mod selector_fallback;
pub mod trend_list_parser;
pub mod upload_date;
pub mod video_list_parser;
pub mod view_count;

// Re-export public types
pub use selector_fallback::{Extraction, ExtractionStrategy, SelectorFallbackExtractor};
pub use trend_list_parser::{RankedKeyword, TrendListParser};
pub use upload_date::parse_upload_date;
pub use video_list_parser::VideoListParser;
pub use view_count::parse_view_count;
