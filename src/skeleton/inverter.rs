//! 逆绑定矩阵

use glam::{Mat3, Mat4, Vec4};

use super::BoneStore;
use crate::{ArmatureError, Result};

/// 把每根骨骼的绑定姿势世界矩阵替换为其逆矩阵
///
/// 先全部求逆再统一写回，任何一根骨骼奇异时不修改存储。
/// 每个存储只能求逆一次。
#[derive(Clone, Copy, Debug)]
pub struct RestInverter {
    pub singular_epsilon: f32,
}

impl RestInverter {
    pub fn new(singular_epsilon: f32) -> Self {
        Self { singular_epsilon }
    }

    pub fn invert_all(&self, store: &mut BoneStore) -> Result<()> {
        if store.is_rest_bound() {
            return Err(ArmatureError::InvalidState("rest pose is already inverted"));
        }

        let mut inverses = Vec::with_capacity(store.size());
        for bone in store.iter() {
            let rest = bone
                .rest_world()
                .ok_or(ArmatureError::InvalidState("rest pose has not been composed"))?;
            let inverse =
                self.try_inverse(rest).ok_or(ArmatureError::SingularMatrix { bone: bone.id() })?;
            inverses.push(inverse);
        }

        for (bone, inverse) in store.iter_mut().zip(inverses) {
            bone.rest_world = Some(inverse);
        }
        store.mark_rest_bound();
        Ok(())
    }

    pub fn try_inverse(&self, matrix: Mat4) -> Option<Mat4> {
        if !is_invertible4(matrix, self.singular_epsilon) {
            return None;
        }
        let inverse = matrix.inverse();
        inverse.is_finite().then_some(inverse)
    }
}

/// 相对奇异判定：|det| 与各列长度乘积之比（Hadamard 上界，取值 0..=1）
///
/// 与整体缩放无关，只反映各轴是否退化或接近共线。
pub(crate) fn is_invertible3(matrix: Mat3, epsilon: f32) -> bool {
    let det = matrix.determinant();
    let bound = matrix.x_axis.length() * matrix.y_axis.length() * matrix.z_axis.length();
    det.is_finite() && det != 0.0 && bound.is_finite() && det.abs() > bound * epsilon
}

/// 仿射矩阵只看线性部分，平移不影响可逆性
pub(crate) fn is_invertible4(matrix: Mat4, epsilon: f32) -> bool {
    if matrix.row(3) == Vec4::W {
        return is_invertible3(Mat3::from_mat4(matrix), epsilon);
    }
    let det = matrix.determinant();
    let bound = matrix.x_axis.length()
        * matrix.y_axis.length()
        * matrix.z_axis.length()
        * matrix.w_axis.length();
    det.is_finite() && det != 0.0 && bound.is_finite() && det.abs() > bound * epsilon
}
