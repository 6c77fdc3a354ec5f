//! Host events.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! Runtime code translates platform events into [`HostEvent`]s
//! (see [`platform::winit`]).

pub mod platform;

/// Keys the host reacts to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Space,
    Enter,
    /// Any other physical key, by platform scan code.
    Unknown(u32),
}

/// Platform-neutral event delivered to the application between frames.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum HostEvent {
    /// Drawable size in physical pixels. Either dimension may be zero while
    /// the window is minimized.
    Resized { width: u32, height: u32 },
    /// Pointer position normalized to `[0, 1]`, origin top-left.
    PointerMoved { x: f32, y: f32 },
    PointerLeft,
    Key { key: Key, pressed: bool, repeat: bool },
    CloseRequested,
}

/// Maps a pointer position in physical pixels to `[0, 1]` relative to a
/// `width x height` surface.
///
/// Positions outside the surface (possible while a button is held) are
/// clamped. Returns `None` for a surface without area.
pub fn normalize_pointer(x: f64, y: f64, width: u32, height: u32) -> Option<(f32, f32)> {
    if width == 0 || height == 0 {
        return None;
    }
    let nx = (x / width as f64).clamp(0.0, 1.0);
    let ny = (y / height as f64).clamp(0.0, 1.0);
    Some((nx as f32, ny as f32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_is_relative_to_surface() {
        assert_eq!(normalize_pointer(200.0, 600.0, 800, 800), Some((0.25, 0.75)));
        assert_eq!(normalize_pointer(0.0, 0.0, 640, 480), Some((0.0, 0.0)));
        assert_eq!(normalize_pointer(640.0, 480.0, 640, 480), Some((1.0, 1.0)));
    }

    #[test]
    fn pointer_outside_surface_is_clamped() {
        assert_eq!(normalize_pointer(-30.0, 900.0, 640, 480), Some((0.0, 1.0)));
    }

    #[test]
    fn empty_surface_has_no_pointer() {
        assert_eq!(normalize_pointer(10.0, 10.0, 0, 480), None);
    }
}
