//! 骨骼系统：存储、层级、姿势合成与逆绑定

mod armature;
mod bone;
mod hierarchy;
mod inverter;
mod pose;
mod store;

pub use armature::{Armature, ArmatureState};
pub use bone::Bone;
pub use hierarchy::{link, Preorder};
pub use inverter::RestInverter;
pub(crate) use inverter::is_invertible3;
pub use pose::PoseComposer;
pub use store::BoneStore;

use glam::{Mat4, Quat, Vec3};

/// 根骨骼的父索引
pub const NO_PARENT: i32 = -1;

/// 场景描述提供的骨骼定义 (id, 父 id, 名称)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoneDef {
    pub id: i32,
    pub parent_id: i32,
    pub name: String,
}

impl BoneDef {
    pub fn new(id: i32, parent_id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            parent_id,
            name: name.into(),
        }
    }
}

impl<S: Into<String>> From<(i32, i32, S)> for BoneDef {
    fn from((id, parent_id, name): (i32, i32, S)) -> Self {
        Self::new(id, parent_id, name)
    }
}

/// 姿势合成写入的目标空间
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoseSpace {
    /// 绑定姿势，写入 rest_world
    Rest,
    /// 当前帧动画姿势，写入 animated_world
    Animated,
}

/// 骨骼局部变换（平移 / 旋转 / 缩放）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl LocalTransform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::default()
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl From<LocalTransform> for Mat4 {
    fn from(transform: LocalTransform) -> Self {
        transform.to_matrix()
    }
}
