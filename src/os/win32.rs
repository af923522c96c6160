use windows::{
    core::PCSTR,
    Win32::Foundation::*,
    Win32::Graphics::Gdi::ValidateRect,
    Win32::System::LibraryLoader::*,
    Win32::UI::WindowsAndMessaging::*,
};

use crate::Error;

pub struct App {
    window_class: String,
    hinstance: HINSTANCE,
}

pub struct Window {
    info: super::WindowInfo,
    hwnd: HWND,
}

impl Window {
    pub fn get_native_handle(&self) -> HWND {
        self.hwnd
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        unsafe {
            // the window may already be gone if the user closed it
            let _ = DestroyWindow(self.hwnd);
            self.hwnd = HWND::default();
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        unsafe {
            let _ = UnregisterClassA(PCSTR(self.window_class.as_ptr()), self.hinstance);
        }
    }
}

impl super::App for App {
    type Window = Window;

    fn create(name: &str) -> Result<Self, Error> {
        unsafe {
            let window_class = name.to_string() + "\0";
            let instance: HINSTANCE = GetModuleHandleA(None)?.into();

            let wc = WNDCLASSA {
                hCursor: LoadCursorW(None, IDC_ARROW)?,
                hInstance: instance,
                lpszClassName: PCSTR(window_class.as_ptr()),
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(wndproc),
                ..Default::default()
            };

            if RegisterClassA(&wc) == 0 {
                return Err(Error {
                    msg: format!("dx12_samples::os::win32: failed to register window class: {}", name)
                });
            }

            Ok(App {
                window_class,
                hinstance: instance,
            })
        }
    }

    fn create_window(&self, info: super::WindowInfo) -> Result<Window, Error> {
        let title = info.title.clone() + "\0";
        let hwnd = unsafe {
            CreateWindowExA(
                WINDOW_EX_STYLE::default(),
                PCSTR(self.window_class.as_ptr()),
                PCSTR(title.as_ptr()),
                WS_OVERLAPPEDWINDOW | WS_VISIBLE,
                info.rect.x,
                info.rect.y,
                info.rect.width,
                info.rect.height,
                HWND::default(),
                HMENU::default(),
                self.hinstance,
                None,
            )?
        };
        tracing::debug!("dx12_samples::os::win32: created window '{}'", info.title);
        Ok(Window {
            hwnd,
            info,
        })
    }

    fn run(&self) -> bool {
        unsafe {
            let mut msg = MSG::default();
            let mut quit = false;
            while PeekMessageA(&mut msg, HWND::default(), 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageA(&msg);
                if msg.message == WM_QUIT {
                    quit = true;
                    break;
                }
            }
            !quit
        }
    }
}

impl super::Window<App> for Window {
    fn get_rect(&self) -> super::Rect<i32> {
        self.info.rect
    }
}

extern "system" fn wndproc(window: HWND, message: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    unsafe {
        match message {
            WM_PAINT => {
                let _ = ValidateRect(window, None);
                LRESULT(0)
            }
            WM_CLOSE | WM_DESTROY => {
                PostQuitMessage(0);
                LRESULT(0)
            }
            _ => DefWindowProcA(window, message, wparam, lparam),
        }
    }
}
