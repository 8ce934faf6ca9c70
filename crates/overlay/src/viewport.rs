use tokio::sync::watch;

/// On-screen rectangle of the media element the overlay must stay glued to.
/// `x`/`y` are container-relative while windowed and viewport-absolute in
/// fullscreen (fullscreen media is reparented out of normal layout flow).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportMode {
    Windowed,
    Fullscreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub rect: ViewportRect,
    pub mode: ViewportMode,
}

impl Viewport {
    pub fn windowed(width: u32, height: u32) -> Self {
        Self {
            rect: ViewportRect {
                x: 0,
                y: 0,
                width,
                height,
            },
            mode: ViewportMode::Windowed,
        }
    }

    pub fn fullscreen(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            rect: ViewportRect {
                x,
                y,
                width,
                height,
            },
            mode: ViewportMode::Fullscreen,
        }
    }
}

/// The embedding shell publishes layout and fullscreen changes here; the
/// renderer observes them as change notifications rather than polling
/// layout every tick.
pub fn viewport_channel(initial: Viewport) -> (watch::Sender<Viewport>, watch::Receiver<Viewport>) {
    watch::channel(initial)
}
