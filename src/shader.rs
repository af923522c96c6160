use crate::Error;

/// Shader source files larger than this many bytes are rejected unless configured otherwise.
pub const DEFAULT_MAX_SHADER_SIZE: usize = 1024;

/// Pipeline stage a shader is compiled for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShaderType {
    Vertex,
    Fragment,
}

/// Entry point and stage to compile from a source file.
#[derive(Clone, Debug)]
pub struct ShaderInfo {
    pub shader_type: ShaderType,
    pub entry_point: String,
}

impl ShaderInfo {
    pub fn vertex(entry_point: &str) -> Self {
        ShaderInfo {
            shader_type: ShaderType::Vertex,
            entry_point: entry_point.to_string(),
        }
    }

    pub fn fragment(entry_point: &str) -> Self {
        ShaderInfo {
            shader_type: ShaderType::Fragment,
            entry_point: entry_point.to_string(),
        }
    }

    /// Shader model 5 compile target.
    pub fn target(&self) -> &'static str {
        match self.shader_type {
            ShaderType::Vertex => "vs_5_0",
            ShaderType::Fragment => "ps_5_0",
        }
    }
}

/// Reads hlsl source from `path`, files larger than `max_size` bytes are an error.
pub fn load_source(path: &std::path::Path, max_size: usize) -> Result<String, Error> {
    let meta = std::fs::metadata(path).map_err(|e| Error {
        msg: format!("dx12_samples::shader:: open shader file failed: {}: {}", path.display(), e)
    })?;
    if meta.len() > max_size as u64 {
        return Err(Error {
            msg: format!(
                "dx12_samples::shader:: the shader file is too large: {} ({} bytes, max {})",
                path.display(), meta.len(), max_size)
        });
    }
    let source = std::fs::read_to_string(path).map_err(|e| Error {
        msg: format!("dx12_samples::shader:: open shader file failed: {}: {}", path.display(), e)
    })?;
    tracing::debug!("dx12_samples::shader:: loaded {} ({} bytes)", path.display(), source.len());
    Ok(source)
}

/// Compiles hlsl `source` with fxc, `name` is used in compiler messages.
/// Debug builds compile with debug info and without optimisation.
#[cfg(target_os = "windows")]
pub fn compile(
    name: &str,
    source: &str,
    info: &ShaderInfo) -> Result<windows::Win32::Graphics::Direct3D::ID3DBlob, Error> {
    use windows::core::PCSTR;
    use windows::Win32::Graphics::Direct3D::Fxc::*;
    use windows::Win32::Graphics::Direct3D::ID3DBlob;

    let compile_flags = if cfg!(debug_assertions) {
        D3DCOMPILE_DEBUG | D3DCOMPILE_SKIP_OPTIMIZATION
    } else {
        0
    };

    let name = name.to_string() + "\0";
    let entry = info.entry_point.to_string() + "\0";
    let target = info.target().to_string() + "\0";

    let mut code: Option<ID3DBlob> = None;
    let mut errors: Option<ID3DBlob> = None;
    let result = unsafe {
        D3DCompile(
            source.as_ptr() as _,
            source.len(),
            PCSTR(name.as_ptr()),
            None,
            None,
            PCSTR(entry.as_ptr()),
            PCSTR(target.as_ptr()),
            compile_flags,
            0,
            &mut code,
            Some(&mut errors as *mut _),
        )
    };

    // the error blob carries warnings too, it is only fatal when compilation failed
    let message = errors.map(|errors| unsafe {
        let bytes = std::slice::from_raw_parts(
            errors.GetBufferPointer() as *const u8,
            errors.GetBufferSize());
        String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string()
    });
    match (result, message) {
        (Err(err), Some(message)) => {
            return Err(Error {
                msg: format!("dx12_samples::shader:: {}\n{}", err.message(), message)
            });
        }
        (Err(err), None) => return Err(err.into()),
        (Ok(()), Some(message)) => {
            tracing::warn!("dx12_samples::shader:: {}", message);
        }
        (Ok(()), None) => (),
    }

    code.ok_or_else(|| Error {
        msg: format!("dx12_samples::shader:: compiler returned no code for {}", info.entry_point)
    })
}

/// Loads and compiles a shader from file in one step.
#[cfg(target_os = "windows")]
pub fn compile_from_file(
    path: &std::path::Path,
    max_size: usize,
    info: &ShaderInfo) -> Result<windows::Win32::Graphics::Direct3D::ID3DBlob, Error> {
    let source = load_source(path, max_size)?;
    compile(&path.to_string_lossy(), &source, info)
}
