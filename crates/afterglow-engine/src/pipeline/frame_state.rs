/// Inputs read once at the start of each frame.
///
/// Host events update these fields between frames; the orchestrator copies the
/// whole value before drawing, so a frame never observes a partial update.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameState {
    pub surface_width: u32,
    pub surface_height: u32,
    /// Pointer position in `[0, 1]`, origin top-left.
    pub pointer_x: f32,
    pub pointer_y: f32,
    pub elapsed_seconds: f32,
}

impl FrameState {
    pub fn new(surface_width: u32, surface_height: u32) -> Self {
        Self {
            surface_width,
            surface_height,
            pointer_x: 0.5,
            pointer_y: 0.5,
            elapsed_seconds: 0.0,
        }
    }

    pub fn resolution(&self) -> [f32; 2] {
        [self.surface_width as f32, self.surface_height as f32]
    }

    pub fn pointer(&self) -> [f32; 2] {
        [self.pointer_x, self.pointer_y]
    }
}
