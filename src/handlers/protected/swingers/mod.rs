// handlers/protected/swingers/mod.rs - Member records keyed by external swinger id

pub mod import;
pub mod record;

pub use import::fetch_data_post;
