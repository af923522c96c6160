use dx12_samples::*;

use sync::soft;
use sync::FrameSync;

fn temp_file(name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("dx12_samples_{}_{}", std::process::id(), name));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn sample_info_defaults() {
    let info = SampleInfo::default();
    assert_eq!(info.num_buffers, 2);
    assert_eq!(info.window_rect, os::Rect { x: 0, y: 0, width: 800, height: 600 });
    assert_eq!(info.clear_colour.as_array(), [0.0, 0.2, 0.4, 1.0]);
    assert_eq!(info.feature_level, gfx::FeatureLevel::Level12_0);
    assert_eq!(info.max_shader_size, shader::DEFAULT_MAX_SHADER_SIZE);
    assert_eq!(info.texture_size, 256);
    assert!(info.texture_file.is_none());
    assert!(info.validate().is_ok());
    assert_eq!(info.shader_path("triangle.hlsl"), std::path::Path::new("shaders").join("triangle.hlsl"));
}

#[test]
fn sample_info_missing_file() {
    let path = std::env::temp_dir().join("dx12_samples_does_not_exist.json");
    let info = SampleInfo::load(&path, "0002-triangle").unwrap();
    assert_eq!(info.name, "0002-triangle");
    assert_eq!(info.num_buffers, 2);
}

#[test]
fn sample_info_partial_json() {
    let path = temp_file("partial.json", br#"{
        "num_buffers": 3,
        "sync_interval": 0,
        "clear_colour": { "r": 1.0, "g": 0.0, "b": 0.0, "a": 1.0 }
    }"#);
    let info = SampleInfo::load(&path, "0003-texture").unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(info.name, "0003-texture");
    assert_eq!(info.num_buffers, 3);
    assert_eq!(info.sync_interval, 0);
    assert_eq!(info.clear_colour.as_array(), [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(info.window_rect.width, 800);
    assert_eq!(info.shader_dir, "shaders");
}

#[test]
fn sample_info_keeps_configured_name() {
    let path = temp_file("named.json", br#"{ "name": "my quad" }"#);
    let info = SampleInfo::load(&path, "0003-texture").unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(info.name, "my quad");
}

#[test]
fn sample_info_malformed_json() {
    let path = temp_file("malformed.json", b"{ \"num_buffers\": ");
    let err = SampleInfo::load(&path, "0002-triangle").unwrap_err();
    std::fs::remove_file(&path).unwrap();
    assert!(err.msg.contains("config"));
}

#[test]
fn sample_info_unreadable_file() {
    // a directory exists but cannot be read as a file
    let err = SampleInfo::load(&std::env::temp_dir(), "0002-triangle").unwrap_err();
    assert!(err.msg.starts_with("dx12_samples::"));
}

#[test]
fn sample_info_rejects_invalid_values() {
    let path = temp_file("one_buffer.json", br#"{ "num_buffers": 1 }"#);
    let err = SampleInfo::load(&path, "0002-triangle").unwrap_err();
    std::fs::remove_file(&path).unwrap();
    assert!(err.msg.contains("num_buffers"));

    let info = SampleInfo {
        window_rect: os::Rect { x: 0, y: 0, width: 0, height: 600 },
        ..Default::default()
    };
    assert!(info.validate().is_err());

    let info = SampleInfo {
        texture_size: 4,
        ..Default::default()
    };
    assert!(info.validate().is_err());

    let info = SampleInfo {
        num_buffers: 17,
        ..Default::default()
    };
    assert!(info.validate().is_err());
}

#[test]
fn checkerboard_cells() {
    let image = image::checkerboard(256, 256);
    assert_eq!(image.width, 256);
    assert_eq!(image.height, 256);
    assert_eq!(image.data.len(), 256 * 256 * image::BYTES_PER_PIXEL);

    let pixel = |x: usize, y: usize| {
        let offset = y * image.row_pitch() + x * image::BYTES_PER_PIXEL;
        &image.data[offset..offset + 4]
    };

    // 8 cells across, each 32 pixels
    assert_eq!(pixel(0, 0), [0x00, 0x00, 0x00, 0xff]);
    assert_eq!(pixel(31, 31), [0x00, 0x00, 0x00, 0xff]);
    assert_eq!(pixel(32, 0), [0xff, 0xff, 0xff, 0xff]);
    assert_eq!(pixel(0, 32), [0xff, 0xff, 0xff, 0xff]);
    assert_eq!(pixel(32, 32), [0x00, 0x00, 0x00, 0xff]);
    assert_eq!(pixel(255, 255), [0x00, 0x00, 0x00, 0xff]);

    assert!(image.data.chunks_exact(4).all(|p| p[3] == 0xff));
}

#[test]
fn checkerboard_non_square() {
    // cell height follows the width: 64 / 8 = 8 rows per cell
    let image = image::checkerboard(64, 16);
    let row = image.row_pitch();
    assert_eq!(image.data[0], 0x00);
    assert_eq!(image.data[7 * row], 0x00);
    assert_eq!(image.data[8 * row], 0xff);
    assert_eq!(image.data[8 * row + 8 * image::BYTES_PER_PIXEL], 0x00);
}

#[test]
fn checkerboard_too_narrow() {
    let image = image::checkerboard(1, 4);
    assert_eq!(image.data.len(), 16);
    assert!(image.data.iter().all(|b| *b == 0));
}

#[test]
fn copy_rows_with_pitch() {
    let src: Vec<u8> = (0..24).collect();
    let mut dst = vec![0xaa; 16 * 2 + 8];
    image::copy_rows(&src, 8, &mut dst, 16, 3).unwrap();

    assert_eq!(&dst[0..8], &src[0..8]);
    assert_eq!(&dst[8..16], &[0xaa; 8]);
    assert_eq!(&dst[16..24], &src[8..16]);
    assert_eq!(&dst[32..40], &src[16..24]);
}

#[test]
fn copy_rows_errors() {
    let src = vec![0u8; 32];
    let mut dst = vec![0u8; 64];
    assert!(image::copy_rows(&src, 16, &mut dst, 8, 2).is_err());
    assert!(image::copy_rows(&src, 16, &mut dst, 16, 3).is_err());
    assert!(image::copy_rows(&src, 16, &mut dst[..40], 32, 2).is_err());
    assert!(image::copy_rows(&src, 16, &mut dst, 32, 0).is_ok());
}

#[test]
fn load_missing_image() {
    let err = image::load_from_file("does/not/exist.png").unwrap_err();
    assert!(err.msg.contains("failed to open"));
}

#[test]
fn load_shader_source() {
    for file in ["triangle.hlsl", "texture.hlsl"] {
        let path = SampleInfo::default().shader_path(file);
        let source = shader::load_source(&path, shader::DEFAULT_MAX_SHADER_SIZE).unwrap();
        assert!(source.contains("VSMain"));
        assert!(source.contains("PSMain"));
    }
}

#[test]
fn load_shader_missing() {
    let err = shader::load_source(std::path::Path::new("shaders/missing.hlsl"), 1024).unwrap_err();
    assert!(err.msg.contains("open shader file failed"));
}

#[test]
fn load_shader_too_large() {
    let path = temp_file("large.hlsl", &vec![b' '; 2048]);
    let err = shader::load_source(&path, 1024).unwrap_err();
    assert!(err.msg.contains("too large"));
    assert!(shader::load_source(&path, 4096).is_ok());
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn shader_targets() {
    assert_eq!(shader::ShaderInfo::vertex("VSMain").target(), "vs_5_0");
    assert_eq!(shader::ShaderInfo::fragment("PSMain").target(), "ps_5_0");
    assert_eq!(shader::ShaderInfo::fragment("PSMain").shader_type, shader::ShaderType::Fragment);
}

#[test]
fn vertex_layouts_match_structs() {
    let layout = gfx::colour_vertex_layout();
    assert_eq!(layout[0].aligned_byte_offset as usize, std::mem::offset_of!(gfx::ColourVertex, position));
    assert_eq!(layout[1].aligned_byte_offset as usize, std::mem::offset_of!(gfx::ColourVertex, colour));
    let size: usize = layout.iter().map(|e| e.format.size_bytes()).sum();
    assert_eq!(size, std::mem::size_of::<gfx::ColourVertex>());

    let layout = gfx::textured_vertex_layout();
    assert_eq!(layout[0].aligned_byte_offset as usize, std::mem::offset_of!(gfx::TexturedVertex, position));
    assert_eq!(layout[1].aligned_byte_offset as usize, std::mem::offset_of!(gfx::TexturedVertex, colour));
    assert_eq!(layout[2].aligned_byte_offset as usize, std::mem::offset_of!(gfx::TexturedVertex, uv));
    assert_eq!(layout[2].semantic, "TEXCOORD");
    let size: usize = layout.iter().map(|e| e.format.size_bytes()).sum();
    assert_eq!(size, std::mem::size_of::<gfx::TexturedVertex>());
}

#[test]
fn geometry() {
    let tri = gfx::triangle_vertices(2.0);
    assert_eq!(tri[0].position, [0.0, 0.5, 0.0]);
    assert_eq!(tri[0].colour, [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(gfx::as_u8_slice(&tri).len(), 3 * 28);

    let quad = gfx::quad_vertices(1.0);
    assert_eq!(quad[0].uv, [0.0, 1.0]);
    assert_eq!(quad[2].uv, [1.0, 0.0]);
    assert_eq!(gfx::as_u8_slice(&gfx::QUAD_INDICES).len(), 24);
    assert!(gfx::QUAD_INDICES.iter().all(|i| (*i as usize) < quad.len()));
}

#[test]
fn viewport_and_scissor_from_rect() {
    let rect = os::Rect { x: 10, y: 20, width: 800, height: 600 };
    let viewport = gfx::Viewport::from(rect);
    assert_eq!(viewport, gfx::Viewport {
        x: 10.0,
        y: 20.0,
        width: 800.0,
        height: 600.0,
        min_depth: 0.0,
        max_depth: 1.0,
    });
    let scissor = gfx::ScissorRect::from(rect);
    assert_eq!(scissor, gfx::ScissorRect { left: 10, top: 20, right: 810, bottom: 620 });
}

#[test]
fn root_signature_version_fallback() {
    use gfx::RootSignatureVersion;
    assert_eq!(RootSignatureVersion::select::<()>(Ok(RootSignatureVersion::Version1_1)), RootSignatureVersion::Version1_1);
    assert_eq!(RootSignatureVersion::select(Err("unsupported")), RootSignatureVersion::Version1_0);
}

#[test]
fn device_flags_from_sample_info() {
    let info = SampleInfo {
        debug_layer: true,
        gpu_based_validation: true,
        ..Default::default()
    };
    let device_info = gfx::DeviceInfo::from(&info);
    assert!(device_info.flags.contains(gfx::DeviceFlags::DEBUG_LAYER | gfx::DeviceFlags::GPU_BASED_VALIDATION));

    // validation without the debug layer is ignored
    let info = SampleInfo {
        debug_layer: false,
        gpu_based_validation: true,
        ..Default::default()
    };
    assert!(gfx::DeviceInfo::from(&info).flags.is_empty());
}

struct MockCtx {
    pumps: u32,
    fail_init: bool,
    fail_on_tick: Option<u32>,
    quit_called: bool,
    signalled: Vec<u64>,
    pending: usize,
}

impl MockCtx {
    fn new(pumps: u32) -> Self {
        MockCtx {
            pumps,
            fail_init: false,
            fail_on_tick: None,
            quit_called: false,
            signalled: Vec::new(),
            pending: 0,
        }
    }

    fn pump(&mut self) -> bool {
        if self.pumps == 0 {
            return false;
        }
        self.pumps -= 1;
        true
    }
}

struct MockSample {
    frame_sync: FrameSync<soft::Timeline>,
    ticks: u32,
}

impl sample::Sample<MockCtx> for MockSample {
    fn init(ctx: &mut MockCtx, info: &SampleInfo) -> Result<Self, Error> {
        if ctx.fail_init {
            return Err(Error { msg: "init failed".to_string() });
        }
        let timeline = soft::Timeline::new(soft::Retire::OnWait);
        let mut frame_sync = FrameSync::new(timeline, info.num_buffers as usize, 0)?;
        frame_sync.wait_for_gpu()?;
        Ok(MockSample {
            frame_sync,
            ticks: 0,
        })
    }

    fn tick(&mut self, ctx: &mut MockCtx, _delta: f32) -> Result<(), Error> {
        self.ticks += 1;
        if ctx.fail_on_tick == Some(self.ticks) {
            return Err(Error { msg: "device removed".to_string() });
        }
        let next = (self.frame_sync.frame_index() + 1) % self.frame_sync.num_buffers();
        self.frame_sync.wait_for_next_frame(next)
    }

    fn quit(&mut self, ctx: &mut MockCtx) -> Result<(), Error> {
        ctx.quit_called = true;
        self.frame_sync.wait_for_gpu()?;
        ctx.signalled = self.frame_sync.timeline().signalled();
        ctx.pending = self.frame_sync.timeline().pending();
        Ok(())
    }
}

#[test]
fn run_loop_ticks_until_pump_stops() {
    let mut ctx = MockCtx::new(5);
    let frames = sample::run_loop::<_, MockSample, _>(&mut ctx, &SampleInfo::default(), MockCtx::pump).unwrap();
    assert_eq!(frames, 5);
    assert!(ctx.quit_called);
    assert_eq!(ctx.pending, 0);
    assert_eq!(ctx.signalled, vec![1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn run_loop_quits_after_tick_error() {
    let mut ctx = MockCtx::new(10);
    ctx.fail_on_tick = Some(3);
    let err = sample::run_loop::<_, MockSample, _>(&mut ctx, &SampleInfo::default(), MockCtx::pump).unwrap_err();
    assert_eq!(err.msg, "device removed");
    assert!(ctx.quit_called);
    assert_eq!(ctx.pending, 0);
    assert_eq!(ctx.pumps, 7);
}

#[test]
fn run_loop_init_error() {
    let mut ctx = MockCtx::new(10);
    ctx.fail_init = true;
    assert!(sample::run_loop::<_, MockSample, _>(&mut ctx, &SampleInfo::default(), MockCtx::pump).is_err());
    assert!(!ctx.quit_called);
    assert_eq!(ctx.pumps, 10);
}

#[test]
fn frame_timer_counts() {
    let mut timer = sample::FrameTimer::new();
    assert!(timer.delta() >= 0.0);
    timer.delta();
    assert_eq!(timer.frame_count(), 2);
}

#[cfg(target_os = "windows")]
mod d3d12 {
    use dx12_samples::*;
    use os::App;
    use os::Window;

    fn create_window(app: &os::win32::App) -> os::win32::Window {
        app.create_window(os::WindowInfo {
            title: String::from("dx12_samples tests"),
            rect: os::Rect {
                x: 0,
                y: 0,
                width: 640,
                height: 480,
            },
        }).unwrap()
    }

    #[test]
    #[ignore = "requires a direct3d 12 capable adapter"]
    fn create_d3d12_device() {
        let dev = gfx::d3d12::Device::create(&gfx::DeviceInfo::default()).unwrap();
        assert!(!dev.get_adapter_info().name.is_empty());
    }

    #[test]
    #[ignore = "requires a desktop session"]
    fn create_window_rect() {
        let app = os::win32::App::create("dx12_samples_create_window").unwrap();
        let win = create_window(&app);
        assert_eq!(win.get_rect(), os::Rect { x: 0, y: 0, width: 640, height: 480 });
        assert_eq!(win.get_size(), (640, 480));
    }

    #[test]
    #[ignore = "requires a direct3d 12 capable adapter and a desktop session"]
    fn swap_chain_frames() {
        let app = os::win32::App::create("dx12_samples_swap_chain").unwrap();
        let win = create_window(&app);
        let dev = gfx::d3d12::Device::create(&gfx::DeviceInfo::default()).unwrap();

        let swap_chain = dev.create_swap_chain(&gfx::SwapChainInfo {
            num_buffers: 2,
            width: 640,
            height: 480,
            clear_colour: SampleInfo::default().clear_colour,
        }, &win).unwrap();
        let mut frame_sync = dev.create_frame_sync(&swap_chain).unwrap();
        let mut cmd = dev.create_cmd_buf(2, frame_sync.frame_index(), None).unwrap();
        cmd.close().unwrap();

        for _ in 0..8 {
            app.run();
            cmd.reset(frame_sync.frame_index(), None).unwrap();
            cmd.begin_backbuffer(&swap_chain);
            cmd.end_backbuffer(&swap_chain);
            cmd.close().unwrap();
            dev.execute(&cmd).unwrap();
            swap_chain.present(0).unwrap();
            frame_sync.wait_for_next_frame(swap_chain.get_backbuffer_index() as usize).unwrap();
        }
        frame_sync.wait_for_gpu().unwrap();
    }
}
