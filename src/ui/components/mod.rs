mod key_result;
mod palette;
mod toasts;

pub use key_result::KeyResult;
pub use palette::CommandPalette;
pub use toasts::render_toasts;
