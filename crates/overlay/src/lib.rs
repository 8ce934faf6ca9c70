pub mod font;
pub mod palette;
pub mod renderer;
pub mod surface;
pub mod sync;
pub mod viewport;

pub use palette::class_color;
pub use renderer::{NullSink, OverlayRenderer, PresentSink, RendererConfig};
pub use surface::{LabelPlacement, Surface};
pub use sync::{ActiveSet, SyncOptions, active_set};
pub use viewport::{Viewport, ViewportMode, ViewportRect, viewport_channel};
