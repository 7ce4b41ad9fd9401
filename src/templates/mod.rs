pub mod renderer;

pub use renderer::{
    inject_inline_template, Renderer, CLIENT_RUNTIME_HANDLE, CLIENT_RUNTIME_PATH,
    INLINE_TEMPLATE_MIME,
};
