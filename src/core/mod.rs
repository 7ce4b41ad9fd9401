pub mod hooks;
pub mod nonce;

pub use hooks::{AdminHooks, HookPipeline};
pub use nonce::{NonceError, NonceStore};
