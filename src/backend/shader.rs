// Shader loading
//
// Vulkan consumes SPIR-V bytecode. The two triangle shaders are read from disk
// whole, checked for the SPIR-V magic number and handed to the driver as-is.

use super::error::{GfxError, GfxResult};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Read a compiled SPIR-V binary into 4-byte words
pub fn load_spirv(path: &Path) -> GfxResult<Vec<u32>> {
    let mut file = File::open(path).map_err(|source| GfxError::ShaderNotFound {
        path: path.to_path_buf(),
        source,
    })?;

    // read_spv takes care of alignment and byte order
    let code = ash::util::read_spv(&mut file).map_err(|source| GfxError::InvalidShader {
        path: path.to_path_buf(),
        source,
    })?;

    if code.first() != Some(&SPIRV_MAGIC) {
        return Err(GfxError::InvalidShader {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, "missing SPIR-V magic number"),
        });
    }

    log::debug!("Loaded {:?} ({} bytes)", path, code.len() * 4);
    Ok(code)
}

/// Bytecode of the vertex and fragment stage
pub struct ShaderBinaries {
    pub vertex: Vec<u32>,
    pub fragment: Vec<u32>,
}

impl ShaderBinaries {
    pub fn load(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> GfxResult<Self> {
        Ok(Self {
            vertex: load_spirv(&vertex.into())?,
            fragment: load_spirv(&fragment.into())?,
        })
    }
}
