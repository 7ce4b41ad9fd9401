pub mod registrar;

pub use registrar::{AssetRegistrar, RegisterMode, SCRIPT_DEPENDENCIES};
