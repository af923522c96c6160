#[cfg(target_os = "windows")]
use dx12_samples::*;

#[cfg(target_os = "windows")]
use gfx::d3d12 as gfx_platform;

#[cfg(target_os = "windows")]
use os::Window;

#[cfg(target_os = "windows")]
use sample::Context;

/// Indexed quad sampling a texture uploaded through an upload heap, with one command
/// allocator per back buffer.
#[cfg(target_os = "windows")]
struct TexturedQuad {
    swap_chain: gfx_platform::SwapChain,
    frame_sync: sync::FrameSync<gfx_platform::FenceTimeline>,
    cmd: gfx_platform::CmdBuf,
    pipeline: gfx_platform::Pipeline,
    shader_heap: gfx_platform::ShaderHeap,
    texture: gfx_platform::Texture,
    vertex_buffer: gfx_platform::Buffer,
    index_buffer: gfx_platform::Buffer,
    viewport: gfx::Viewport,
    scissor: gfx::ScissorRect,
    sync_interval: u32,
}

#[cfg(target_os = "windows")]
fn load_image(info: &SampleInfo) -> Result<image::ImageData, Error> {
    match &info.texture_file {
        Some(file) => image::load_from_file(file),
        None => Ok(image::checkerboard(info.texture_size, info.texture_size)),
    }
}

#[cfg(target_os = "windows")]
impl sample::Sample<Context> for TexturedQuad {
    fn init(ctx: &mut Context, info: &SampleInfo) -> Result<Self, Error> {
        let device = &ctx.device;
        let rect = ctx.window.get_viewport_rect();

        let swap_chain = device.create_swap_chain(&gfx::SwapChainInfo {
            num_buffers: info.num_buffers,
            width: rect.width as u32,
            height: rect.height as u32,
            clear_colour: info.clear_colour,
        }, &ctx.window)?;
        let mut shader_heap = device.create_shader_heap(1)?;
        let mut frame_sync = device.create_frame_sync(&swap_chain)?;

        let shader_path = info.shader_path("texture.hlsl");
        let vs = shader::compile_from_file(&shader_path, info.max_shader_size, &shader::ShaderInfo::vertex("VSMain"))?;
        let fs = shader::compile_from_file(&shader_path, info.max_shader_size, &shader::ShaderInfo::fragment("PSMain"))?;

        let pipeline = device.create_pipeline(&gfx_platform::PipelineInfo {
            vs: &vs,
            fs: &fs,
            input_layout: gfx::textured_vertex_layout(),
            root_signature: gfx::RootSignatureInfo::SingleTexture,
        })?;

        // created open, the texture copy is recorded before the first frame
        let cmd = device.create_cmd_buf(swap_chain.get_num_buffers(), frame_sync.frame_index(), Some(&pipeline))?;

        let vertices = gfx::quad_vertices(info.aspect());
        let vertex_buffer = device.create_buffer(&gfx::BufferInfo {
            usage: gfx::BufferUsage::Vertex,
            stride: std::mem::size_of::<gfx::TexturedVertex>(),
        }, gfx::as_u8_slice(&vertices))?;

        let index_buffer = device.create_buffer(&gfx::BufferInfo {
            usage: gfx::BufferUsage::Index,
            stride: std::mem::size_of::<u32>(),
        }, gfx::as_u8_slice(&gfx::QUAD_INDICES))?;

        let image = load_image(info)?;
        let mut texture = device.create_texture(&cmd, &mut shader_heap, &image)?;

        cmd.close()?;
        device.execute(&cmd)?;

        // the upload buffer can only go once the copy has executed
        if let Err(err) = frame_sync.wait_for_gpu() {
            tracing::warn!("texture: flush after upload failed, retrying: {}", err);
            if frame_sync.wait_for_gpu().is_err() && texture.has_pending_upload() {
                // the copy may still be reading these, leak them rather than free under the gpu
                tracing::error!("texture: gpu did not finish the upload, leaking upload resources");
                std::mem::forget(texture);
                std::mem::forget(cmd);
            }
            return Err(err);
        }
        texture.release_upload();

        Ok(TexturedQuad {
            swap_chain,
            frame_sync,
            cmd,
            pipeline,
            shader_heap,
            texture,
            vertex_buffer,
            index_buffer,
            viewport: gfx::Viewport::from(rect),
            scissor: gfx::ScissorRect::from(rect),
            sync_interval: info.sync_interval,
        })
    }

    fn tick(&mut self, ctx: &mut Context, _delta: f32) -> Result<(), Error> {
        self.cmd.reset(self.frame_sync.frame_index(), Some(&self.pipeline))?;

        self.cmd.set_pipeline(&self.pipeline);
        self.cmd.set_texture(&self.shader_heap, &self.texture);
        self.cmd.set_viewport(&self.viewport);
        self.cmd.set_scissor_rect(&self.scissor);
        self.cmd.begin_backbuffer(&self.swap_chain);
        self.cmd.set_vertex_buffer(&self.vertex_buffer, 0);
        self.cmd.set_index_buffer(&self.index_buffer);
        self.cmd.draw_indexed_instanced(gfx::QUAD_INDICES.len() as u32, 1, 0, 0, 0);
        self.cmd.end_backbuffer(&self.swap_chain);
        self.cmd.close()?;

        ctx.device.execute(&self.cmd)?;
        self.swap_chain.present(self.sync_interval)?;

        self.frame_sync.wait_for_next_frame(self.swap_chain.get_backbuffer_index() as usize)
    }

    fn quit(&mut self, _ctx: &mut Context) -> Result<(), Error> {
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

    let info = SampleInfo::from_args("0003-texture")?;
    if let Err(err) = sample::run::<TexturedQuad>(info) {
        tracing::error!("texture failed: {}", err);
        return Err(err);
    }
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn main() {
    tracing_subscriber::fmt().with_target(false).init();
    tracing::error!("texture requires windows and direct3d 12");
    std::process::exit(1);
}
