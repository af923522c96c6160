use std::fs;
use std::io::Read;

use crate::Error;

/// Bytes per pixel of all image data handled here (RGBA8).
pub const BYTES_PER_PIXEL: usize = 4;

/// Minimal image data, tightly packed RGBA8 rows.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ImageData {
    /// Size in bytes of one tightly packed row.
    pub fn row_pitch(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }
}

/// Generates a black and white checkerboard 8 cells across, cells where the column and row parity
/// match are black. Cell height is derived from the width so non square images get stretched cells.
pub fn checkerboard(width: u32, height: u32) -> ImageData {
    let row_pitch = width as usize * BYTES_PER_PIXEL;
    let cell_pitch = row_pitch >> 3;
    let cell_height = (width as usize >> 3).max(1);
    let size = row_pitch * height as usize;

    let mut data = vec![0u8; size];
    if cell_pitch == 0 {
        return ImageData { width, height, data };
    }

    for (n, pixel) in data.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
        let offset = n * BYTES_PER_PIXEL;
        let x = offset % row_pitch;
        let y = offset / row_pitch;
        let i = x / cell_pitch;
        let j = y / cell_height;
        let v = if i % 2 == j % 2 { 0x00 } else { 0xff };
        pixel.copy_from_slice(&[v, v, v, 0xff]);
    }

    ImageData { width, height, data }
}

/// Loads an image from file returning RGBA8 data, supported formats are (png, tga, bmp, jpg, gif).
pub fn load_from_file(filename: &str) -> Result<ImageData, Error> {
    let path = std::path::Path::new(filename);
    tracing::info!("dx12_samples::image:: loading: {}", path.display());

    let mut f = fs::File::open(path).map_err(|e| Error {
        msg: format!("dx12_samples::image:: failed to open {}: {}", filename, e)
    })?;
    let mut contents = vec![];
    f.read_to_end(&mut contents)?;

    let len = i32::try_from(contents.len()).map_err(|_| Error {
        msg: format!("dx12_samples::image:: {} is too large to decode ({} bytes)", filename, contents.len())
    })?;

    let mut x = 0;
    let mut y = 0;
    let mut comp = 0;

    unsafe {
        let img = stb_image_rust::stbi_load_from_memory(
            contents.as_mut_ptr(),
            len,
            &mut x,
            &mut y,
            &mut comp,
            stb_image_rust::STBI_rgb_alpha,
        );

        if img.is_null() {
            return Err(Error {
                msg: format!("dx12_samples::image:: failed to load image via stb_image: {}", filename)
            });
        }

        let size = x as usize * y as usize * BYTES_PER_PIXEL;
        let mut data = vec![0u8; size];
        std::ptr::copy_nonoverlapping(img, data.as_mut_ptr(), size);
        stb_image_rust::c_runtime::free(img);

        Ok(ImageData {
            width: x as u32,
            height: y as u32,
            data,
        })
    }
}

/// Copies `num_rows` tightly packed rows of `row_size` bytes from `src` into `dst`
/// where each row starts `dst_row_pitch` bytes after the previous one.
pub fn copy_rows(
    src: &[u8],
    row_size: usize,
    dst: &mut [u8],
    dst_row_pitch: usize,
    num_rows: usize) -> Result<(), Error> {
    if dst_row_pitch < row_size {
        return Err(Error {
            msg: format!(
                "dx12_samples::image:: destination row pitch {} is smaller than the row size {}",
                dst_row_pitch, row_size)
        });
    }
    if num_rows == 0 {
        return Ok(());
    }
    let src_required = row_size * num_rows;
    let dst_required = dst_row_pitch * (num_rows - 1) + row_size;
    if src.len() < src_required || dst.len() < dst_required {
        return Err(Error {
            msg: format!(
                "dx12_samples::image:: copy of {} rows needs {} source and {} destination bytes, got {} and {}",
                num_rows, src_required, dst_required, src.len(), dst.len())
        });
    }
    for row in 0..num_rows {
        let s = row * row_size;
        let d = row * dst_row_pitch;
        dst[d..d + row_size].copy_from_slice(&src[s..s + row_size]);
    }
    Ok(())
}
