pub mod draft;
pub mod post;
pub mod session;
pub mod settings;
