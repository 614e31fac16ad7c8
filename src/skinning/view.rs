//! 蒙皮矩阵视图

use glam::{Mat3, Mat4};

use super::SkinPalette;
use crate::skeleton::{is_invertible3, BoneStore};
use crate::{ArmatureError, Result};

/// 只读视图，按需计算每骨骼蒙皮矩阵
///
/// 尚未写入动画姿势或绑定姿势的骨骼在这一层才替换为单位矩阵，
/// 避免未动画的骨骼把网格压缩成一个点。
#[derive(Clone, Copy, Debug)]
pub struct SkinMatrixView<'a> {
    store: &'a BoneStore,
    singular_epsilon: f32,
}

impl<'a> SkinMatrixView<'a> {
    pub fn new(store: &'a BoneStore, singular_epsilon: f32) -> Self {
        Self {
            store,
            singular_epsilon,
        }
    }

    /// 原始蒙皮矩阵，未写入时为 None
    pub fn try_skin_matrix(&self, bone_id: usize) -> Result<Option<Mat4>> {
        Ok(self.store.get_by_id(bone_id)?.skin_matrix())
    }

    /// 蒙皮矩阵 = 当前全局变换 * 逆绑定矩阵
    pub fn skin_matrix(&self, bone_id: usize) -> Result<Mat4> {
        Ok(self.try_skin_matrix(bone_id)?.unwrap_or(Mat4::IDENTITY))
    }

    /// 法线矩阵 = 蒙皮矩阵左上 3x3 的逆转置
    pub fn normal_matrix(&self, bone_id: usize) -> Result<Mat3> {
        match self.try_skin_matrix(bone_id)? {
            Some(skin) => self
                .normal_from_skin(skin)
                .ok_or(ArmatureError::SingularMatrix { bone: bone_id }),
            None => Ok(Mat3::IDENTITY),
        }
    }

    /// 全部蒙皮矩阵，下标为骨骼 id
    pub fn all_skin_matrices(&self) -> Result<Vec<Mat4>> {
        self.ensure_linked()?;
        Ok(self
            .store
            .iter()
            .map(|bone| bone.skin_matrix().unwrap_or(Mat4::IDENTITY))
            .collect())
    }

    /// 全部法线矩阵，下标为骨骼 id
    pub fn all_normal_matrices(&self) -> Result<Vec<Mat3>> {
        self.ensure_linked()?;
        self.store
            .iter()
            .map(|bone| self.normal_matrix(bone.id()))
            .collect()
    }

    /// 每帧上传用的矩阵块
    pub fn palette(&self) -> Result<SkinPalette> {
        Ok(SkinPalette {
            matrices: self.all_skin_matrices()?,
            normals: self.all_normal_matrices()?,
        })
    }

    /// 按名称获取骨骼当前世界变换（用于挂点）
    pub fn animated_world_by_name(&self, name: &str) -> Result<Option<Mat4>> {
        Ok(self.store.get_by_name(name)?.animated_world())
    }

    // 未 link 时 id 可能不连续，批量结果无法按 id 下标
    fn ensure_linked(&self) -> Result<()> {
        if self.store.is_linked() {
            Ok(())
        } else {
            Err(ArmatureError::InvalidState("hierarchy is not linked"))
        }
    }

    fn normal_from_skin(&self, skin: Mat4) -> Option<Mat3> {
        let upper = Mat3::from_mat4(skin);
        if !is_invertible3(upper, self.singular_epsilon) {
            return None;
        }
        let normal = upper.inverse().transpose();
        normal.is_finite().then_some(normal)
    }
}
