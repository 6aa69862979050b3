//! The five standard passes.

pub mod admin;
pub mod language;
pub mod render;
pub mod site;
pub mod visibility;

pub use admin::AdminIdentityPass;
pub use language::{content_fallback_chain, resolve_language, LanguagePass};
pub use render::RenderContextPass;
pub use site::SitePass;
pub use visibility::VisibilityPass;
