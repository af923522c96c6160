/// Implements this interface for windows win32 platfrom
#[cfg(target_os = "windows")]
pub mod win32;

use serde::{Deserialize, Serialize};
use std::any::Any;

/// Describes a rectangle starting at the top left corner specified by x,y
/// with the size of width and height.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rect<T> {
    pub x: T,
    pub y: T,
    pub width: T,
    pub height: T,
}

/// Filled out to specify various window parameters
/// when a window is created by `App::create_window`
#[derive(Clone, Debug)]
pub struct WindowInfo {
    pub title: String,
    pub rect: Rect<i32>,
}

/// An interface which all platforms need to implement
/// for general operating system calls
pub trait App: 'static + Any + Sized {
    type Window: Window<Self>;
    /// Create the application instance, `name` is used to register the window class
    fn create(name: &str) -> Result<Self, super::Error>;
    /// Create a new visible window
    fn create_window(&self, info: WindowInfo) -> Result<Self::Window, super::Error>;
    /// Pumps all pending messages, returns `false` once the app has been asked to quit
    fn run(&self) -> bool;
}

/// An instance of an operating system window
pub trait Window<A: App>: Any + Sized {
    /// Returns the rect the window was created with
    fn get_rect(&self) -> Rect<i32>;
    /// Returns the rect of the client area, with the origin at 0, 0
    fn get_viewport_rect(&self) -> Rect<i32> {
        let rect = self.get_rect();
        Rect {
            x: 0,
            y: 0,
            width: rect.width,
            height: rect.height,
        }
    }
    /// Returns (width, height)
    fn get_size(&self) -> (i32, i32) {
        let rect = self.get_rect();
        (rect.width, rect.height)
    }
}
