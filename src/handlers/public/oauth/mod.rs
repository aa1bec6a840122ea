// handlers/public/oauth/mod.rs - Google and GitHub sign-in flows

pub mod github;
pub mod google;

use serde::Deserialize;

/// `?code=` on a provider callback
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: String,
}
