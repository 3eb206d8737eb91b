pub mod club_directory;
pub mod engagement_service;
pub mod feed_service;
pub mod identity_parser;
pub mod membership_matcher;
pub mod membership_service;
pub mod user_service;
