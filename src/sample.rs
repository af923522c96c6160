use crate::{Error, SampleInfo};

/// A sample program: initialised once, ticked every idle iteration of the message loop
/// and given the chance to drain the gpu before it is dropped.
/// `Ctx` is whatever the platform provides to render with, the d3d12 `Context` on windows.
pub trait Sample<Ctx>: Sized {
    fn init(ctx: &mut Ctx, info: &SampleInfo) -> Result<Self, Error>;
    fn tick(&mut self, ctx: &mut Ctx, delta: f32) -> Result<(), Error>;
    fn quit(&mut self, ctx: &mut Ctx) -> Result<(), Error>;
}

/// Measures the time between ticks in seconds.
pub struct FrameTimer {
    last: std::time::Instant,
    frame_count: u64,
}

impl FrameTimer {
    pub fn new() -> Self {
        FrameTimer {
            last: std::time::Instant::now(),
            frame_count: 0,
        }
    }

    /// Seconds since the previous call (or since creation for the first call).
    pub fn delta(&mut self) -> f32 {
        let now = std::time::Instant::now();
        let delta = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        self.frame_count += 1;
        delta
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives `init -> tick -> quit`. `pump` processes pending platform messages and returns
/// `false` once the app should exit. `quit` always runs after a successful `init`, also when a
/// tick fails, so the gpu is drained before resources are released; the first error is returned.
pub fn run_loop<Ctx, S, P>(ctx: &mut Ctx, info: &SampleInfo, mut pump: P) -> Result<u64, Error>
where
    S: Sample<Ctx>,
    P: FnMut(&mut Ctx) -> bool,
{
    let mut sample = S::init(ctx, info)?;
    tracing::info!("dx12_samples::sample:: {} initialised", info.name);

    let mut timer = FrameTimer::new();
    let mut result = Ok(());
    while pump(ctx) {
        let delta = timer.delta();
        if let Err(err) = sample.tick(ctx, delta) {
            tracing::error!("dx12_samples::sample:: {} tick failed: {}", info.name, err);
            result = Err(err);
            break;
        }
    }

    let quit = sample.quit(ctx);
    tracing::info!("dx12_samples::sample:: {} quit after {} frames", info.name, timer.frame_count());
    result.and(quit).map(|()| timer.frame_count())
}

/// Everything a sample needs from the platform on windows.
/// Fields drop in order: the device, then the window, then the app which owns the window class.
#[cfg(target_os = "windows")]
pub struct Context {
    pub device: crate::gfx::d3d12::Device,
    pub window: crate::os::win32::Window,
    pub app: crate::os::win32::App,
}

/// Creates the app, window and device described by `info` and runs sample `S` until the window closes.
#[cfg(target_os = "windows")]
pub fn run<S: Sample<Context>>(info: SampleInfo) -> Result<(), Error> {
    use crate::os::App;

    info.validate()?;
    let app = crate::os::win32::App::create(&info.name)?;
    let window = app.create_window(crate::os::WindowInfo {
        title: info.name.to_string(),
        rect: info.window_rect,
    })?;
    let device = crate::gfx::d3d12::Device::create(&crate::gfx::DeviceInfo::from(&info))?;

    let mut ctx = Context {
        device,
        window,
        app,
    };
    run_loop::<Context, S, _>(&mut ctx, &info, |ctx| ctx.app.run())?;
    Ok(())
}
