pub mod draw;
pub mod raster;

pub use draw::{draw_commands, DisplayState, DrawCommand, Rgba};
pub use raster::{render_text_pixmap, Rasterizer};
