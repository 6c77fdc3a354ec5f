use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::input::{normalize_pointer, HostEvent, Key};

/// Translates a winit `WindowEvent` into a [`HostEvent`].
///
/// `surface` is the current drawable size, used to normalize pointer
/// positions. Returns `None` for events the host does not forward.
pub fn translate_window_event(
    surface: PhysicalSize<u32>,
    event: &WindowEvent,
) -> Option<HostEvent> {
    match event {
        WindowEvent::Resized(size) => Some(HostEvent::Resized {
            width: size.width,
            height: size.height,
        }),

        WindowEvent::CursorMoved { position, .. } => {
            let (x, y) = normalize_pointer(position.x, position.y, surface.width, surface.height)?;
            Some(HostEvent::PointerMoved { x, y })
        }

        WindowEvent::CursorLeft { .. } => Some(HostEvent::PointerLeft),

        WindowEvent::KeyboardInput { event, .. } => Some(HostEvent::Key {
            key: map_key(event.physical_key),
            pressed: event.state == ElementState::Pressed,
            repeat: event.repeat,
        }),

        WindowEvent::CloseRequested => Some(HostEvent::CloseRequested),

        _ => None,
    }
}

fn map_key(pk: PhysicalKey) -> Key {
    match pk {
        PhysicalKey::Code(KeyCode::Escape) => Key::Escape,
        PhysicalKey::Code(KeyCode::Space) => Key::Space,
        PhysicalKey::Code(KeyCode::Enter | KeyCode::NumpadEnter) => Key::Enter,
        PhysicalKey::Code(other) => Key::Unknown(other as u32),
        // NativeKeyCode is not a u32 in winit 0.30.
        PhysicalKey::Unidentified(_) => Key::Unknown(0),
    }
}
