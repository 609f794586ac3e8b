pub mod overlay;
pub mod window;

pub use minifb::Key;
pub use overlay::{draw_boxes, draw_status, state_color};
pub use window::MinifbRenderer;
