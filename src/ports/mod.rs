// src/ports/mod.rs
pub mod html;
pub mod json;
pub mod text;

pub use html::HtmlPresenter;
pub use text::TextPresenter;
