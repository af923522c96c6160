use windows::{
    core::PCSTR,
    Win32::Foundation::*,
    Win32::Graphics::Direct3D::*,
    Win32::Graphics::Direct3D12::*,
    Win32::Graphics::Dxgi::Common::*,
    Win32::Graphics::Dxgi::*,
    Win32::System::Threading::*,
};
use windows_core::Interface;

use std::ffi::c_void;

use crate::image::ImageData;
use crate::os::win32;
use crate::os::Window;
use crate::sync::{FrameSync, Timeline};
use crate::Error;

use super::{
    AdapterInfo, BufferInfo, BufferUsage, ClearColour, DeviceFlags, DeviceInfo, FeatureLevel, Format,
    InputElementInfo, RootSignatureInfo, RootSignatureVersion, ScissorRect, SwapChainInfo, Viewport,
};

pub struct Device {
    adapter_info: AdapterInfo,
    dxgi_factory: IDXGIFactory4,
    device: ID3D12Device,
    command_queue: ID3D12CommandQueue,
}

pub struct SwapChain {
    swap_chain: IDXGISwapChain3,
    num_buffers: u32,
    width: u32,
    height: u32,
    clear_colour: ClearColour,
    _rtv_heap: ID3D12DescriptorHeap,
    rtv_handles: Vec<D3D12_CPU_DESCRIPTOR_HANDLE>,
    render_targets: Vec<ID3D12Resource>,
}

/// A fence on the direct queue with an event to block on.
pub struct FenceTimeline {
    command_queue: ID3D12CommandQueue,
    fence: ID3D12Fence,
    fence_event: HANDLE,
}

pub struct CmdBuf {
    frame_index: usize,
    command_allocators: Vec<ID3D12CommandAllocator>,
    command_list: ID3D12GraphicsCommandList,
}

pub struct Buffer {
    _resource: ID3D12Resource,
    vbv: Option<D3D12_VERTEX_BUFFER_VIEW>,
    ibv: Option<D3D12_INDEX_BUFFER_VIEW>,
}

pub struct Texture {
    _resource: ID3D12Resource,
    upload: Option<ID3D12Resource>,
    srv_index: usize,
}

/// Shader visible heap for shader resource views.
pub struct ShaderHeap {
    heap: ID3D12DescriptorHeap,
    increment_size: usize,
    capacity: usize,
    offset: usize,
}

pub struct Pipeline {
    root_signature: ID3D12RootSignature,
    pso: ID3D12PipelineState,
}

/// Information to create a graphics pipeline from compiled shaders.
pub struct PipelineInfo<'a> {
    pub vs: &'a ID3DBlob,
    pub fs: &'a ID3DBlob,
    pub input_layout: Vec<InputElementInfo>,
    pub root_signature: RootSignatureInfo,
}

fn to_dxgi_format(format: Format) -> DXGI_FORMAT {
    match format {
        Format::Unknown => DXGI_FORMAT_UNKNOWN,
        Format::RGBA8n => DXGI_FORMAT_R8G8B8A8_UNORM,
        Format::RG32f => DXGI_FORMAT_R32G32_FLOAT,
        Format::RGB32f => DXGI_FORMAT_R32G32B32_FLOAT,
        Format::RGBA32f => DXGI_FORMAT_R32G32B32A32_FLOAT,
        Format::R32u => DXGI_FORMAT_R32_UINT,
    }
}

fn to_d3d_feature_level(level: FeatureLevel) -> D3D_FEATURE_LEVEL {
    match level {
        FeatureLevel::Level11_0 => D3D_FEATURE_LEVEL_11_0,
        FeatureLevel::Level11_1 => D3D_FEATURE_LEVEL_11_1,
        FeatureLevel::Level12_0 => D3D_FEATURE_LEVEL_12_0,
        FeatureLevel::Level12_1 => D3D_FEATURE_LEVEL_12_1,
    }
}

fn transition_barrier(
    resource: &ID3D12Resource,
    state_before: D3D12_RESOURCE_STATES,
    state_after: D3D12_RESOURCE_STATES,
) -> D3D12_RESOURCE_BARRIER {
    D3D12_RESOURCE_BARRIER {
        Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
        Anonymous: D3D12_RESOURCE_BARRIER_0 {
            Transition: std::mem::ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                pResource: unsafe { std::mem::transmute_copy(resource) },
                StateBefore: state_before,
                StateAfter: state_after,
                Subresource: D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
            }),
        },
    }
}

fn buffer_desc(size: u64) -> D3D12_RESOURCE_DESC {
    D3D12_RESOURCE_DESC {
        Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
        Alignment: 0,
        Width: size,
        Height: 1,
        DepthOrArraySize: 1,
        MipLevels: 1,
        Format: DXGI_FORMAT_UNKNOWN,
        SampleDesc: DXGI_SAMPLE_DESC {
            Count: 1,
            Quality: 0,
        },
        Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
        Flags: D3D12_RESOURCE_FLAG_NONE,
    }
}

fn create_committed_resource(
    device: &ID3D12Device,
    heap_type: D3D12_HEAP_TYPE,
    desc: &D3D12_RESOURCE_DESC,
    state: D3D12_RESOURCE_STATES) -> Result<ID3D12Resource, Error> {
    let mut resource: Option<ID3D12Resource> = None;
    unsafe {
        device.CreateCommittedResource(
            &D3D12_HEAP_PROPERTIES {
                Type: heap_type,
                ..Default::default()
            },
            D3D12_HEAP_FLAG_NONE,
            desc,
            state,
            None,
            &mut resource,
        )?;
    }
    resource.ok_or_else(|| Error {
        msg: "dx12_samples::gfx::d3d12: CreateCommittedResource returned no resource".to_string()
    })
}

fn adapter_name(desc: &DXGI_ADAPTER_DESC1) -> String {
    let len = desc.Description.iter().position(|c| *c == 0).unwrap_or(desc.Description.len());
    String::from_utf16_lossy(&desc.Description[..len])
}

/// Finds the first hardware adapter able to create a device at `feature_level`, software
/// adapters (Microsoft Basic Render Driver) are skipped.
fn get_hardware_adapter(
    factory: &IDXGIFactory4,
    feature_level: FeatureLevel) -> Result<(IDXGIAdapter1, ID3D12Device, AdapterInfo), Error> {
    unsafe {
        let mut i = 0;
        while let Ok(adapter) = factory.EnumAdapters1(i) {
            i += 1;
            let desc = adapter.GetDesc1()?;
            if (DXGI_ADAPTER_FLAG(desc.Flags as i32) & DXGI_ADAPTER_FLAG_SOFTWARE) != DXGI_ADAPTER_FLAG_NONE {
                continue;
            }

            let mut device: Option<ID3D12Device> = None;
            if D3D12CreateDevice(&adapter, to_d3d_feature_level(feature_level), &mut device).is_ok() {
                if let Some(device) = device {
                    let info = AdapterInfo {
                        name: adapter_name(&desc),
                        dedicated_video_memory: desc.DedicatedVideoMemory,
                        feature_level,
                    };
                    return Ok((adapter, device, info));
                }
            }
            tracing::debug!(
                "dx12_samples::gfx::d3d12: adapter {} does not support {:?}",
                adapter_name(&desc), feature_level);
        }
    }
    Err(Error {
        msg: format!("dx12_samples::gfx::d3d12: no hardware adapter supports {:?}", feature_level)
    })
}

fn enable_debug_layer(flags: DeviceFlags) {
    unsafe {
        let mut debug: Option<ID3D12Debug> = None;
        if let Some(debug) = D3D12GetDebugInterface(&mut debug).ok().and(debug) {
            debug.EnableDebugLayer();
            tracing::info!("dx12_samples::gfx::d3d12: enabled debug layer");
            if flags.contains(DeviceFlags::GPU_BASED_VALIDATION) {
                if let Ok(debug1) = debug.cast::<ID3D12Debug1>() {
                    debug1.SetEnableGPUBasedValidation(true);
                    tracing::info!("dx12_samples::gfx::d3d12: enabled gpu based validation");
                }
            }
        }
        else {
            tracing::warn!("dx12_samples::gfx::d3d12: debug layer requested but not installed");
        }
    }
}

impl Device {
    pub fn create(info: &DeviceInfo) -> Result<Device, Error> {
        unsafe {
            // debug layer must be enabled before the device is created
            let mut dxgi_factory_flags = DXGI_CREATE_FACTORY_FLAGS(0);
            if info.flags.contains(DeviceFlags::DEBUG_LAYER) {
                enable_debug_layer(info.flags);
                dxgi_factory_flags = DXGI_CREATE_FACTORY_DEBUG;
            }

            let dxgi_factory: IDXGIFactory4 = CreateDXGIFactory2(dxgi_factory_flags)?;
            let (_adapter, device, adapter_info) = get_hardware_adapter(&dxgi_factory, info.feature_level)?;
            tracing::info!("dx12_samples::gfx::d3d12: created device on {}", adapter_info);

            let command_queue: ID3D12CommandQueue = device.CreateCommandQueue(&D3D12_COMMAND_QUEUE_DESC {
                Type: D3D12_COMMAND_LIST_TYPE_DIRECT,
                Flags: D3D12_COMMAND_QUEUE_FLAG_NONE,
                ..Default::default()
            })?;

            Ok(Device {
                adapter_info,
                dxgi_factory,
                device,
                command_queue,
            })
        }
    }

    pub fn get_adapter_info(&self) -> &AdapterInfo {
        &self.adapter_info
    }

    pub fn create_swap_chain(&self, info: &SwapChainInfo, win: &win32::Window) -> Result<SwapChain, Error> {
        unsafe {
            let hwnd = win.get_native_handle();
            let swap_chain_desc = DXGI_SWAP_CHAIN_DESC1 {
                BufferCount: info.num_buffers,
                Width: info.width,
                Height: info.height,
                Format: DXGI_FORMAT_R8G8B8A8_UNORM,
                BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
                SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
                SampleDesc: DXGI_SAMPLE_DESC {
                    Count: 1,
                    ..Default::default()
                },
                ..Default::default()
            };

            let swap_chain: IDXGISwapChain3 = self.dxgi_factory
                .CreateSwapChainForHwnd(&self.command_queue, hwnd, &swap_chain_desc, None, None)?
                .cast()?;
            self.dxgi_factory.MakeWindowAssociation(hwnd, DXGI_MWA_NO_ALT_ENTER)?;

            // one render target view per back buffer
            let rtv_heap: ID3D12DescriptorHeap = self.device.CreateDescriptorHeap(&D3D12_DESCRIPTOR_HEAP_DESC {
                NumDescriptors: info.num_buffers,
                Type: D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
                Flags: D3D12_DESCRIPTOR_HEAP_FLAG_NONE,
                ..Default::default()
            })?;
            let rtv_descriptor_size = self.device.GetDescriptorHandleIncrementSize(
                D3D12_DESCRIPTOR_HEAP_TYPE_RTV) as usize;
            let rtv_start = rtv_heap.GetCPUDescriptorHandleForHeapStart();

            let mut rtv_handles = Vec::new();
            let mut render_targets = Vec::new();
            for i in 0..info.num_buffers {
                let render_target: ID3D12Resource = swap_chain.GetBuffer(i)?;
                let handle = D3D12_CPU_DESCRIPTOR_HANDLE {
                    ptr: rtv_start.ptr + i as usize * rtv_descriptor_size,
                };
                self.device.CreateRenderTargetView(&render_target, None, handle);
                rtv_handles.push(handle);
                render_targets.push(render_target);
            }

            tracing::info!(
                "dx12_samples::gfx::d3d12: created swap chain {}x{} with {} buffers",
                info.width, info.height, info.num_buffers);

            Ok(SwapChain {
                swap_chain,
                num_buffers: info.num_buffers,
                width: info.width,
                height: info.height,
                clear_colour: info.clear_colour,
                _rtv_heap: rtv_heap,
                rtv_handles,
                render_targets,
            })
        }
    }

    /// Creates a fence timeline on the direct queue and frame sync starting on the swap chain's
    /// current back buffer.
    pub fn create_frame_sync(&self, swap_chain: &SwapChain) -> Result<FrameSync<FenceTimeline>, Error> {
        let fence: ID3D12Fence = unsafe { self.device.CreateFence(0, D3D12_FENCE_FLAG_NONE)? };
        let fence_event = unsafe { CreateEventA(None, false, false, None)? };
        let timeline = FenceTimeline {
            command_queue: self.command_queue.clone(),
            fence,
            fence_event,
        };
        FrameSync::new(
            timeline,
            swap_chain.num_buffers as usize,
            swap_chain.get_backbuffer_index() as usize)
    }

    /// Creates one command allocator per buffered frame and a command list which is
    /// left open, recording on the allocator for `frame_index`.
    pub fn create_cmd_buf(
        &self,
        num_buffers: u32,
        frame_index: usize,
        pipeline: Option<&Pipeline>) -> Result<CmdBuf, Error> {
        unsafe {
            let mut command_allocators: Vec<ID3D12CommandAllocator> = Vec::new();
            for _ in 0..num_buffers {
                command_allocators.push(self.device.CreateCommandAllocator(D3D12_COMMAND_LIST_TYPE_DIRECT)?);
            }
            let allocator = command_allocators.get(frame_index).ok_or_else(|| Error {
                msg: format!("dx12_samples::gfx::d3d12: frame index {} out of range", frame_index)
            })?;

            let command_list: ID3D12GraphicsCommandList = match pipeline {
                Some(pipeline) => self.device.CreateCommandList(
                    0, D3D12_COMMAND_LIST_TYPE_DIRECT, allocator, &pipeline.pso)?,
                None => self.device.CreateCommandList(
                    0, D3D12_COMMAND_LIST_TYPE_DIRECT, allocator, None)?,
            };

            Ok(CmdBuf {
                frame_index,
                command_allocators,
                command_list,
            })
        }
    }

    /// Creates a buffer in the upload heap and copies `data` into it.
    pub fn create_buffer(&self, info: &BufferInfo, data: &[u8]) -> Result<Buffer, Error> {
        let resource = create_committed_resource(
            &self.device,
            D3D12_HEAP_TYPE_UPLOAD,
            &buffer_desc(data.len() as u64),
            D3D12_RESOURCE_STATE_GENERIC_READ)?;

        unsafe {
            let mut map_data = std::ptr::null_mut();
            let read_range = D3D12_RANGE { Begin: 0, End: 0 };
            resource.Map(0, Some(&read_range), Some(&mut map_data))?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), map_data as *mut u8, data.len());
            resource.Unmap(0, None);
        }

        let size = u32::try_from(data.len()).map_err(|_| Error {
            msg: format!("dx12_samples::gfx::d3d12: buffer of {} bytes exceeds a buffer view", data.len())
        })?;
        let stride = u32::try_from(info.stride).map_err(|_| Error {
            msg: format!("dx12_samples::gfx::d3d12: invalid buffer stride {}", info.stride)
        })?;

        let location = unsafe { resource.GetGPUVirtualAddress() };
        let (vbv, ibv) = match info.usage {
            BufferUsage::Vertex => (Some(D3D12_VERTEX_BUFFER_VIEW {
                BufferLocation: location,
                StrideInBytes: stride,
                SizeInBytes: size,
            }), None),
            BufferUsage::Index => (None, Some(D3D12_INDEX_BUFFER_VIEW {
                BufferLocation: location,
                SizeInBytes: size,
                Format: if stride == 2 { DXGI_FORMAT_R16_UINT } else { DXGI_FORMAT_R32_UINT },
            })),
        };

        tracing::debug!("dx12_samples::gfx::d3d12: created {:?} buffer of {} bytes", info.usage, data.len());

        Ok(Buffer {
            _resource: resource,
            vbv,
            ibv,
        })
    }

    pub fn create_shader_heap(&self, num_descriptors: usize) -> Result<ShaderHeap, Error> {
        let count = u32::try_from(num_descriptors).map_err(|_| Error {
            msg: format!("dx12_samples::gfx::d3d12: invalid shader heap size {}", num_descriptors)
        })?;
        unsafe {
            let heap: ID3D12DescriptorHeap = self.device.CreateDescriptorHeap(&D3D12_DESCRIPTOR_HEAP_DESC {
                Type: D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
                NumDescriptors: count,
                Flags: D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE,
                ..Default::default()
            })?;
            let increment_size = self.device.GetDescriptorHandleIncrementSize(
                D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV) as usize;
            Ok(ShaderHeap {
                heap,
                increment_size,
                capacity: num_descriptors,
                offset: 0,
            })
        }
    }

    /// Creates a texture in the default heap and records the copy from an upload buffer into `cmd`.
    /// The upload buffer lives on the texture until `Texture::release_upload` is called, which is only
    /// safe once the gpu has executed `cmd`.
    pub fn create_texture(&self, cmd: &CmdBuf, heap: &mut ShaderHeap, image: &ImageData) -> Result<Texture, Error> {
        let texture_desc = D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
            Width: image.width as u64,
            Height: image.height,
            DepthOrArraySize: 1,
            MipLevels: 1,
            Format: DXGI_FORMAT_R8G8B8A8_UNORM,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
            Flags: D3D12_RESOURCE_FLAG_NONE,
            ..Default::default()
        };

        let resource = create_committed_resource(
            &self.device,
            D3D12_HEAP_TYPE_DEFAULT,
            &texture_desc,
            D3D12_RESOURCE_STATE_COPY_DEST)?;

        // the upload buffer rows are aligned to the footprint row pitch
        let mut footprint = D3D12_PLACED_SUBRESOURCE_FOOTPRINT::default();
        let mut num_rows = 0u32;
        let mut row_size = 0u64;
        let mut upload_size = 0u64;
        unsafe {
            self.device.GetCopyableFootprints(
                &texture_desc,
                0,
                1,
                0,
                Some(&mut footprint),
                Some(&mut num_rows),
                Some(&mut row_size),
                Some(&mut upload_size));
        }

        let upload = create_committed_resource(
            &self.device,
            D3D12_HEAP_TYPE_UPLOAD,
            &buffer_desc(upload_size),
            D3D12_RESOURCE_STATE_GENERIC_READ)?;

        unsafe {
            let mut map_data = std::ptr::null_mut();
            upload.Map(0, None, Some(&mut map_data))?;
            let dst = std::slice::from_raw_parts_mut(map_data as *mut u8, upload_size as usize);
            let copied = crate::image::copy_rows(
                &image.data,
                row_size as usize,
                dst,
                footprint.Footprint.RowPitch as usize,
                num_rows as usize);
            upload.Unmap(0, None);
            copied?;

            let src_location = D3D12_TEXTURE_COPY_LOCATION {
                pResource: std::mem::transmute_copy(&upload),
                Type: D3D12_TEXTURE_COPY_TYPE_PLACED_FOOTPRINT,
                Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 {
                    PlacedFootprint: footprint,
                },
            };
            let dst_location = D3D12_TEXTURE_COPY_LOCATION {
                pResource: std::mem::transmute_copy(&resource),
                Type: D3D12_TEXTURE_COPY_TYPE_SUBRESOURCE_INDEX,
                Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 {
                    SubresourceIndex: 0,
                },
            };
            cmd.command_list.CopyTextureRegion(&dst_location, 0, 0, 0, &src_location, None);

            cmd.command_list.ResourceBarrier(&[transition_barrier(
                &resource,
                D3D12_RESOURCE_STATE_COPY_DEST,
                D3D12_RESOURCE_STATE_PIXEL_SHADER_RESOURCE,
            )]);
        }

        let srv_index = heap.allocate()?;
        let srv_desc = D3D12_SHADER_RESOURCE_VIEW_DESC {
            Format: DXGI_FORMAT_R8G8B8A8_UNORM,
            ViewDimension: D3D12_SRV_DIMENSION_TEXTURE2D,
            Shader4ComponentMapping: D3D12_DEFAULT_SHADER_4_COMPONENT_MAPPING,
            Anonymous: D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                Texture2D: D3D12_TEX2D_SRV {
                    MipLevels: 1,
                    ..Default::default()
                },
            },
        };
        unsafe {
            self.device.CreateShaderResourceView(&resource, Some(&srv_desc), heap.cpu_handle(srv_index));
        }

        tracing::debug!(
            "dx12_samples::gfx::d3d12: created texture {}x{} ({} byte upload, row pitch {})",
            image.width, image.height, upload_size, footprint.Footprint.RowPitch);

        Ok(Texture {
            _resource: resource,
            upload: Some(upload),
            srv_index,
        })
    }

    /// Highest root signature version the device supports, falling back to 1.0 if the query fails.
    fn root_signature_version(&self) -> RootSignatureVersion {
        let mut data = D3D12_FEATURE_DATA_ROOT_SIGNATURE {
            HighestVersion: D3D_ROOT_SIGNATURE_VERSION_1_1,
        };
        let query = unsafe {
            self.device.CheckFeatureSupport(
                D3D12_FEATURE_ROOT_SIGNATURE,
                &mut data as *mut _ as *mut c_void,
                std::mem::size_of::<D3D12_FEATURE_DATA_ROOT_SIGNATURE>() as u32)
        }
        .map(|()| {
            if data.HighestVersion == D3D_ROOT_SIGNATURE_VERSION_1_1 {
                RootSignatureVersion::Version1_1
            }
            else {
                RootSignatureVersion::Version1_0
            }
        });
        RootSignatureVersion::select(query)
    }

    fn create_root_signature(&self, info: RootSignatureInfo) -> Result<ID3D12RootSignature, Error> {
        let version = self.root_signature_version();
        let has_texture = info == RootSignatureInfo::SingleTexture;

        let sampler = D3D12_STATIC_SAMPLER_DESC {
            Filter: D3D12_FILTER_MIN_MAG_MIP_POINT,
            AddressU: D3D12_TEXTURE_ADDRESS_MODE_BORDER,
            AddressV: D3D12_TEXTURE_ADDRESS_MODE_BORDER,
            AddressW: D3D12_TEXTURE_ADDRESS_MODE_BORDER,
            MipLODBias: 0.0,
            MaxAnisotropy: 0,
            ComparisonFunc: D3D12_COMPARISON_FUNC_NEVER,
            BorderColor: D3D12_STATIC_BORDER_COLOR_TRANSPARENT_BLACK,
            MinLOD: 0.0,
            MaxLOD: D3D12_FLOAT32_MAX,
            ShaderRegister: 0,
            RegisterSpace: 0,
            ShaderVisibility: D3D12_SHADER_VISIBILITY_PIXEL,
        };
        let num_parameters = if has_texture { 1 } else { 0 };

        let range_1_1 = D3D12_DESCRIPTOR_RANGE1 {
            RangeType: D3D12_DESCRIPTOR_RANGE_TYPE_SRV,
            NumDescriptors: 1,
            BaseShaderRegister: 0,
            RegisterSpace: 0,
            Flags: D3D12_DESCRIPTOR_RANGE_FLAG_DATA_STATIC,
            OffsetInDescriptorsFromTableStart: D3D12_DESCRIPTOR_RANGE_OFFSET_APPEND,
        };
        let parameter_1_1 = D3D12_ROOT_PARAMETER1 {
            ParameterType: D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE,
            Anonymous: D3D12_ROOT_PARAMETER1_0 {
                DescriptorTable: D3D12_ROOT_DESCRIPTOR_TABLE1 {
                    NumDescriptorRanges: 1,
                    pDescriptorRanges: &range_1_1,
                },
            },
            ShaderVisibility: D3D12_SHADER_VISIBILITY_ALL,
        };

        let range_1_0 = D3D12_DESCRIPTOR_RANGE {
            RangeType: D3D12_DESCRIPTOR_RANGE_TYPE_SRV,
            NumDescriptors: 1,
            BaseShaderRegister: 0,
            RegisterSpace: 0,
            OffsetInDescriptorsFromTableStart: D3D12_DESCRIPTOR_RANGE_OFFSET_APPEND,
        };
        let parameter_1_0 = D3D12_ROOT_PARAMETER {
            ParameterType: D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE,
            Anonymous: D3D12_ROOT_PARAMETER_0 {
                DescriptorTable: D3D12_ROOT_DESCRIPTOR_TABLE {
                    NumDescriptorRanges: 1,
                    pDescriptorRanges: &range_1_0,
                },
            },
            ShaderVisibility: D3D12_SHADER_VISIBILITY_ALL,
        };

        let desc = match version {
            RootSignatureVersion::Version1_1 => D3D12_VERSIONED_ROOT_SIGNATURE_DESC {
                Version: D3D_ROOT_SIGNATURE_VERSION_1_1,
                Anonymous: D3D12_VERSIONED_ROOT_SIGNATURE_DESC_0 {
                    Desc_1_1: D3D12_ROOT_SIGNATURE_DESC1 {
                        NumParameters: num_parameters,
                        pParameters: &parameter_1_1,
                        NumStaticSamplers: num_parameters,
                        pStaticSamplers: &sampler,
                        Flags: D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT,
                    },
                },
            },
            RootSignatureVersion::Version1_0 => D3D12_VERSIONED_ROOT_SIGNATURE_DESC {
                Version: D3D_ROOT_SIGNATURE_VERSION_1_0,
                Anonymous: D3D12_VERSIONED_ROOT_SIGNATURE_DESC_0 {
                    Desc_1_0: D3D12_ROOT_SIGNATURE_DESC {
                        NumParameters: num_parameters,
                        pParameters: &parameter_1_0,
                        NumStaticSamplers: num_parameters,
                        pStaticSamplers: &sampler,
                        Flags: D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT,
                    },
                },
            },
        };

        let mut signature: Option<ID3DBlob> = None;
        let mut errors: Option<ID3DBlob> = None;
        let result = unsafe {
            D3D12SerializeVersionedRootSignature(&desc, &mut signature, Some(&mut errors as *mut _))
        };
        if let Err(err) = result {
            let message = errors.map(|blob| unsafe {
                let bytes = std::slice::from_raw_parts(
                    blob.GetBufferPointer() as *const u8, blob.GetBufferSize());
                String::from_utf8_lossy(bytes).to_string()
            }).unwrap_or_else(|| err.message().to_string());
            return Err(Error {
                msg: format!("dx12_samples::gfx::d3d12: failed to serialise root signature: {}", message)
            });
        }
        let signature = signature.ok_or_else(|| Error {
            msg: "dx12_samples::gfx::d3d12: root signature serialised to nothing".to_string()
        })?;

        tracing::debug!("dx12_samples::gfx::d3d12: root signature {:?} serialised as {:?}", info, version);

        unsafe {
            Ok(self.device.CreateRootSignature(
                0,
                std::slice::from_raw_parts(signature.GetBufferPointer() as *const u8, signature.GetBufferSize()),
            )?)
        }
    }

    pub fn create_pipeline(&self, info: &PipelineInfo) -> Result<Pipeline, Error> {
        let root_signature = self.create_root_signature(info.root_signature)?;

        // semantic names must outlive the create call
        let semantics: Vec<String> = info.input_layout.iter()
            .map(|element| element.semantic.to_string() + "\0")
            .collect();
        let input_element_descs: Vec<D3D12_INPUT_ELEMENT_DESC> = info.input_layout.iter()
            .zip(semantics.iter())
            .map(|(element, semantic)| D3D12_INPUT_ELEMENT_DESC {
                SemanticName: PCSTR(semantic.as_ptr()),
                SemanticIndex: element.index,
                Format: to_dxgi_format(element.format),
                InputSlot: element.input_slot,
                AlignedByteOffset: element.aligned_byte_offset,
                InputSlotClass: D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
                InstanceDataStepRate: 0,
            })
            .collect();

        let mut desc = D3D12_GRAPHICS_PIPELINE_STATE_DESC {
            InputLayout: D3D12_INPUT_LAYOUT_DESC {
                pInputElementDescs: input_element_descs.as_ptr(),
                NumElements: input_element_descs.len() as u32,
            },
            pRootSignature: unsafe { std::mem::transmute_copy(&root_signature) },
            VS: D3D12_SHADER_BYTECODE {
                pShaderBytecode: unsafe { info.vs.GetBufferPointer() },
                BytecodeLength: unsafe { info.vs.GetBufferSize() },
            },
            PS: D3D12_SHADER_BYTECODE {
                pShaderBytecode: unsafe { info.fs.GetBufferPointer() },
                BytecodeLength: unsafe { info.fs.GetBufferSize() },
            },
            RasterizerState: D3D12_RASTERIZER_DESC {
                FillMode: D3D12_FILL_MODE_SOLID,
                CullMode: D3D12_CULL_MODE_BACK,
                DepthClipEnable: true.into(),
                ..Default::default()
            },
            BlendState: D3D12_BLEND_DESC {
                AlphaToCoverageEnable: false.into(),
                IndependentBlendEnable: false.into(),
                RenderTarget: [
                    D3D12_RENDER_TARGET_BLEND_DESC {
                        BlendEnable: false.into(),
                        LogicOpEnable: false.into(),
                        SrcBlend: D3D12_BLEND_ONE,
                        DestBlend: D3D12_BLEND_ZERO,
                        BlendOp: D3D12_BLEND_OP_ADD,
                        SrcBlendAlpha: D3D12_BLEND_ONE,
                        DestBlendAlpha: D3D12_BLEND_ZERO,
                        BlendOpAlpha: D3D12_BLEND_OP_ADD,
                        LogicOp: D3D12_LOGIC_OP_NOOP,
                        RenderTargetWriteMask: D3D12_COLOR_WRITE_ENABLE_ALL.0 as u8,
                    },
                    D3D12_RENDER_TARGET_BLEND_DESC::default(),
                    D3D12_RENDER_TARGET_BLEND_DESC::default(),
                    D3D12_RENDER_TARGET_BLEND_DESC::default(),
                    D3D12_RENDER_TARGET_BLEND_DESC::default(),
                    D3D12_RENDER_TARGET_BLEND_DESC::default(),
                    D3D12_RENDER_TARGET_BLEND_DESC::default(),
                    D3D12_RENDER_TARGET_BLEND_DESC::default(),
                ],
            },
            DepthStencilState: D3D12_DEPTH_STENCIL_DESC::default(),
            SampleMask: u32::MAX,
            PrimitiveTopologyType: D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE,
            NumRenderTargets: 1,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        desc.RTVFormats[0] = DXGI_FORMAT_R8G8B8A8_UNORM;

        let pso: ID3D12PipelineState = unsafe { self.device.CreateGraphicsPipelineState(&desc)? };
        Ok(Pipeline {
            root_signature,
            pso,
        })
    }

    pub fn execute(&self, cmd: &CmdBuf) -> Result<(), Error> {
        let command_list: ID3D12CommandList = cmd.command_list.cast()?;
        unsafe {
            self.command_queue.ExecuteCommandLists(&[Some(command_list)]);
        }
        Ok(())
    }
}

impl SwapChain {
    /// Index of the back buffer which will be presented next.
    pub fn get_backbuffer_index(&self) -> u32 {
        unsafe { self.swap_chain.GetCurrentBackBufferIndex() }
    }

    pub fn get_num_buffers(&self) -> u32 {
        self.num_buffers
    }

    pub fn get_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn present(&self, sync_interval: u32) -> Result<(), Error> {
        unsafe {
            self.swap_chain.Present(sync_interval, DXGI_PRESENT(0)).ok()?;
        }
        Ok(())
    }
}

impl Timeline for FenceTimeline {
    fn signal(&mut self, value: u64) -> Result<(), Error> {
        unsafe {
            self.command_queue.Signal(&self.fence, value)?;
        }
        Ok(())
    }

    fn completed_value(&self) -> u64 {
        unsafe { self.fence.GetCompletedValue() }
    }

    fn wait(&self, value: u64) -> Result<(), Error> {
        if self.completed_value() >= value {
            return Ok(());
        }
        unsafe {
            self.fence.SetEventOnCompletion(value, self.fence_event)?;
            if WaitForSingleObject(self.fence_event, INFINITE) != WAIT_OBJECT_0 {
                return Err(Error {
                    msg: format!("dx12_samples::gfx::d3d12: failed waiting for fence value {}", value)
                });
            }
        }
        Ok(())
    }
}

impl Drop for FenceTimeline {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.fence_event);
        }
    }
}

impl ShaderHeap {
    fn allocate(&mut self) -> Result<usize, Error> {
        if self.offset >= self.capacity {
            return Err(Error {
                msg: format!("dx12_samples::gfx::d3d12: shader heap full ({} descriptors)", self.capacity)
            });
        }
        let index = self.offset;
        self.offset += 1;
        Ok(index)
    }

    fn cpu_handle(&self, index: usize) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        let start = unsafe { self.heap.GetCPUDescriptorHandleForHeapStart() };
        D3D12_CPU_DESCRIPTOR_HANDLE {
            ptr: start.ptr + index * self.increment_size,
        }
    }

    fn gpu_handle(&self, index: usize) -> D3D12_GPU_DESCRIPTOR_HANDLE {
        let start = unsafe { self.heap.GetGPUDescriptorHandleForHeapStart() };
        D3D12_GPU_DESCRIPTOR_HANDLE {
            ptr: start.ptr + (index * self.increment_size) as u64,
        }
    }
}

impl Texture {
    /// Drops the upload buffer, call once the gpu has finished the copy.
    pub fn release_upload(&mut self) {
        self.upload = None;
    }

    /// True until `release_upload` is called.
    pub fn has_pending_upload(&self) -> bool {
        self.upload.is_some()
    }
}

impl CmdBuf {
    /// Resets the allocator of `frame_index` and starts recording the command list on it.
    /// Only valid once the gpu has finished with that frame.
    pub fn reset(&mut self, frame_index: usize, pipeline: Option<&Pipeline>) -> Result<(), Error> {
        let allocator = self.command_allocators.get(frame_index).ok_or_else(|| Error {
            msg: format!("dx12_samples::gfx::d3d12: frame index {} out of range", frame_index)
        })?;
        unsafe {
            allocator.Reset()?;
            match pipeline {
                Some(pipeline) => self.command_list.Reset(allocator, &pipeline.pso)?,
                None => self.command_list.Reset(allocator, None)?,
            }
        }
        self.frame_index = frame_index;
        Ok(())
    }

    /// Transitions the current back buffer to a render target, binds and clears it.
    pub fn begin_backbuffer(&self, swap_chain: &SwapChain) {
        let bb = self.frame_index;
        unsafe {
            self.command_list.ResourceBarrier(&[transition_barrier(
                &swap_chain.render_targets[bb],
                D3D12_RESOURCE_STATE_PRESENT,
                D3D12_RESOURCE_STATE_RENDER_TARGET,
            )]);
            let rtv = swap_chain.rtv_handles[bb];
            let clear_colour = swap_chain.clear_colour.as_array();
            self.command_list.OMSetRenderTargets(1, Some(&rtv), false, None);
            self.command_list.ClearRenderTargetView(rtv, &clear_colour, None);
        }
    }

    /// Transitions the current back buffer back to present.
    pub fn end_backbuffer(&self, swap_chain: &SwapChain) {
        unsafe {
            self.command_list.ResourceBarrier(&[transition_barrier(
                &swap_chain.render_targets[self.frame_index],
                D3D12_RESOURCE_STATE_RENDER_TARGET,
                D3D12_RESOURCE_STATE_PRESENT,
            )]);
        }
    }

    pub fn set_viewport(&self, viewport: &Viewport) {
        let d3d12_vp = D3D12_VIEWPORT {
            TopLeftX: viewport.x,
            TopLeftY: viewport.y,
            Width: viewport.width,
            Height: viewport.height,
            MinDepth: viewport.min_depth,
            MaxDepth: viewport.max_depth,
        };
        unsafe {
            self.command_list.RSSetViewports(&[d3d12_vp]);
        }
    }

    pub fn set_scissor_rect(&self, scissor_rect: &ScissorRect) {
        let d3d12_sr = RECT {
            left: scissor_rect.left,
            top: scissor_rect.top,
            right: scissor_rect.right,
            bottom: scissor_rect.bottom,
        };
        unsafe {
            self.command_list.RSSetScissorRects(&[d3d12_sr]);
        }
    }

    pub fn set_pipeline(&self, pipeline: &Pipeline) {
        unsafe {
            self.command_list.SetGraphicsRootSignature(&pipeline.root_signature);
            self.command_list.SetPipelineState(&pipeline.pso);
            self.command_list.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
        }
    }

    /// Binds `heap` and points root parameter 0 at the descriptor of `texture`.
    pub fn set_texture(&self, heap: &ShaderHeap, texture: &Texture) {
        unsafe {
            self.command_list.SetDescriptorHeaps(&[Some(heap.heap.clone())]);
            self.command_list.SetGraphicsRootDescriptorTable(0, heap.gpu_handle(texture.srv_index));
        }
    }

    pub fn set_vertex_buffer(&self, buffer: &Buffer, slot: u32) {
        if let Some(vbv) = buffer.vbv {
            unsafe {
                self.command_list.IASetVertexBuffers(slot, Some(&[vbv]));
            }
        }
    }

    pub fn set_index_buffer(&self, buffer: &Buffer) {
        if let Some(ibv) = buffer.ibv {
            unsafe {
                self.command_list.IASetIndexBuffer(Some(&ibv));
            }
        }
    }

    pub fn draw_instanced(&self, vertex_count: u32, instance_count: u32, start_vertex: u32, start_instance: u32) {
        unsafe {
            self.command_list.DrawInstanced(vertex_count, instance_count, start_vertex, start_instance);
        }
    }

    pub fn draw_indexed_instanced(
        &self,
        index_count: u32,
        instance_count: u32,
        start_index: u32,
        base_vertex: i32,
        start_instance: u32) {
        unsafe {
            self.command_list.DrawIndexedInstanced(index_count, instance_count, start_index, base_vertex, start_instance);
        }
    }

    pub fn close(&self) -> Result<(), Error> {
        unsafe {
            self.command_list.Close()?;
        }
        Ok(())
    }
}
