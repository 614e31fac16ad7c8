//! 蒙皮矩阵输出
//!
//! 顶点混合本身由渲染端完成，这里只提供每骨骼的蒙皮矩阵和法线矩阵。

mod view;

pub use view::SkinMatrixView;

use glam::{Mat3, Mat4};

use crate::{ArmatureError, Result};

/// 每个 Mat4 = 16 floats * 4 bytes
pub const MAT4_BYTES: usize = 64;
/// 每个 Mat3 = 9 floats * 4 bytes
pub const MAT3_BYTES: usize = 36;

/// 每帧上传到 GPU 的骨骼矩阵块，下标为骨骼 id
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkinPalette {
    /// 蒙皮矩阵（未动画的骨骼为单位矩阵）
    pub matrices: Vec<Mat4>,
    /// 法线矩阵（蒙皮矩阵左上 3x3 的逆转置）
    pub normals: Vec<Mat3>,
}

impl SkinPalette {
    pub fn bone_count(&self) -> usize {
        self.matrices.len()
    }

    /// 按列主序紧密写入蒙皮矩阵，返回写入的骨骼数
    pub fn write_matrices(&self, dst: &mut [u8]) -> Result<usize> {
        copy_into(bytemuck::cast_slice(&self.matrices), dst)?;
        Ok(self.matrices.len())
    }

    /// 按列主序紧密写入 3x3 法线矩阵，返回写入的骨骼数
    pub fn write_normals(&self, dst: &mut [u8]) -> Result<usize> {
        copy_into(bytemuck::cast_slice(&self.normals), dst)?;
        Ok(self.normals.len())
    }
}

fn copy_into(src: &[u8], dst: &mut [u8]) -> Result<()> {
    if dst.len() < src.len() {
        log::warn!("骨骼矩阵缓冲区容量不足: {} < {}", dst.len(), src.len());
        return Err(ArmatureError::BufferTooSmall {
            required: src.len(),
            capacity: dst.len(),
        });
    }
    dst[..src.len()].copy_from_slice(src);
    Ok(())
}
