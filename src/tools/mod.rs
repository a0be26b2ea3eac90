pub mod web_search;

pub use web_search::{
    extract_content, truncate_query, TavilyResult, TavilySearch, WebSearch, WebSearchOutput,
};
