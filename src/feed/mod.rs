pub mod parser;
pub mod discovery;
pub mod source;

pub use parser::{parse_feed, FeedParser};
pub use discovery::{discover_feed_urls, FeedFilter};
pub use source::{source_from_config, FeedSource, FixtureFeedSource, HttpFeedSource};
