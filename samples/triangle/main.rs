#[cfg(target_os = "windows")]
use dx12_samples::*;

#[cfg(target_os = "windows")]
use gfx::d3d12 as gfx_platform;

#[cfg(target_os = "windows")]
use os::Window;

#[cfg(target_os = "windows")]
use sample::Context;

/// Coloured triangle drawn into a double buffered swap chain.
#[cfg(target_os = "windows")]
struct Triangle {
    swap_chain: gfx_platform::SwapChain,
    frame_sync: sync::FrameSync<gfx_platform::FenceTimeline>,
    cmd: gfx_platform::CmdBuf,
    pipeline: gfx_platform::Pipeline,
    vertex_buffer: gfx_platform::Buffer,
    viewport: gfx::Viewport,
    scissor: gfx::ScissorRect,
    sync_interval: u32,
}

#[cfg(target_os = "windows")]
impl sample::Sample<Context> for Triangle {
    fn init(ctx: &mut Context, info: &SampleInfo) -> Result<Self, Error> {
        let device = &ctx.device;
        let rect = ctx.window.get_viewport_rect();

        let swap_chain = device.create_swap_chain(&gfx::SwapChainInfo {
            num_buffers: info.num_buffers,
            width: rect.width as u32,
            height: rect.height as u32,
            clear_colour: info.clear_colour,
        }, &ctx.window)?;

        let shader_path = info.shader_path("triangle.hlsl");
        let vs = shader::compile_from_file(&shader_path, info.max_shader_size, &shader::ShaderInfo::vertex("VSMain"))?;
        let fs = shader::compile_from_file(&shader_path, info.max_shader_size, &shader::ShaderInfo::fragment("PSMain"))?;

        let pipeline = device.create_pipeline(&gfx_platform::PipelineInfo {
            vs: &vs,
            fs: &fs,
            input_layout: gfx::colour_vertex_layout(),
            root_signature: gfx::RootSignatureInfo::Empty,
        })?;

        let vertices = gfx::triangle_vertices(info.aspect());
        let vertex_buffer = device.create_buffer(&gfx::BufferInfo {
            usage: gfx::BufferUsage::Vertex,
            stride: std::mem::size_of::<gfx::ColourVertex>(),
        }, gfx::as_u8_slice(&vertices))?;

        // the list is created open, nothing to upload so close it straight away
        let frame_sync = device.create_frame_sync(&swap_chain)?;
        let cmd = device.create_cmd_buf(swap_chain.get_num_buffers(), frame_sync.frame_index(), Some(&pipeline))?;
        cmd.close()?;

        Ok(Triangle {
            swap_chain,
            frame_sync,
            cmd,
            pipeline,
            vertex_buffer,
            viewport: gfx::Viewport::from(rect),
            scissor: gfx::ScissorRect::from(rect),
            sync_interval: info.sync_interval,
        })
    }

    fn tick(&mut self, ctx: &mut Context, _delta: f32) -> Result<(), Error> {
        self.cmd.reset(self.frame_sync.frame_index(), Some(&self.pipeline))?;

        self.cmd.set_pipeline(&self.pipeline);
        self.cmd.set_viewport(&self.viewport);
        self.cmd.set_scissor_rect(&self.scissor);
        self.cmd.begin_backbuffer(&self.swap_chain);
        self.cmd.set_vertex_buffer(&self.vertex_buffer, 0);
        self.cmd.draw_instanced(3, 1, 0, 0);
        self.cmd.end_backbuffer(&self.swap_chain);
        self.cmd.close()?;

        ctx.device.execute(&self.cmd)?;
        self.swap_chain.present(self.sync_interval)?;

        self.frame_sync.wait_for_next_frame(self.swap_chain.get_backbuffer_index() as usize)
    }

    fn quit(&mut self, _ctx: &mut Context) -> Result<(), Error> {
        // must wait for the final frame to be completed
        self.frame_sync.wait_for_gpu()
    }
}

#[cfg(target_os = "windows")]
fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_target(false)
        .init();

    let info = SampleInfo::from_args("0002-triangle")?;
    if let Err(err) = sample::run::<Triangle>(info) {
        tracing::error!("triangle failed: {}", err);
        return Err(err);
    }
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn main() {
    tracing_subscriber::fmt().with_target(false).init();
    tracing::error!("triangle requires windows and direct3d 12");
    std::process::exit(1);
}
