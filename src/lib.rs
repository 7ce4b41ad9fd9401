pub mod admin;
pub mod api;
pub mod assets;
pub mod core;
pub mod settings;
pub mod templates;

// Re-export commonly used types
pub use api::{configure_routes, ApiState};
pub use assets::{AssetRegistrar, RegisterMode};
pub use settings::{Settings, SettingsStore};
pub use templates::Renderer;
