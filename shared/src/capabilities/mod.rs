//! Capabilities the core uses to ask the shell for work.
//!
//! HTTP goes through `crux_http` and view updates through Crux's built-in
//! Render capability. The shell performs each effect and resolves it back
//! into an [`Event`].
mod http;

pub use crux_core::render::Render;
pub use crux_http::Http;

pub use self::http::{HttpResult, JsonResult, UrlError, ValidatedUrl};

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
}
