//! Intent routing.

pub mod classifier;
pub mod keywords;

pub use classifier::{IntentRouter, intent_from_reply};
pub use keywords::{KEYWORD_RULES, classify_by_keywords, tokenize};
