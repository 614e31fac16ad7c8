//! Armature Engine - 骨骼动画核心
//!
//! 提供蒙皮网格所需的骨骼层级与矩阵计算：
//! - 骨骼存储（按 id 索引，按名称查找）
//! - 父子层级构建与校验
//! - 绑定姿势 / 动画姿势的层级合成
//! - 逆绑定矩阵（仅求逆一次）
//! - 每骨骼蒙皮矩阵与法线矩阵

pub mod config;
pub mod skeleton;
pub mod skinning;

pub use config::ArmatureConfig;
pub use skeleton::{Armature, ArmatureState, Bone, BoneDef, BoneStore, LocalTransform};
pub use skinning::{SkinMatrixView, SkinPalette};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArmatureError {
    #[error("duplicate bone id: {id}")]
    DuplicateId { id: usize },

    #[error("duplicate bone name: {name}")]
    DuplicateName { name: String },

    #[error("bone not found: {name}")]
    NotFound { name: String },

    #[error("bone id {id} out of range (size {size})")]
    OutOfRange { id: i64, size: usize },

    #[error("bone {bone} has invalid parent {parent}")]
    InvalidParent { bone: usize, parent: i32 },

    #[error("bones not reachable from root: {unreachable:?}")]
    CycleDetected { unreachable: Vec<usize> },

    #[error("bone id {id} is missing, ids must be dense")]
    MissingBone { id: usize },

    #[error("expected {expected} local matrices, got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("invalid armature state: {0}")]
    InvalidState(&'static str),

    #[error("matrix of bone {bone} is not invertible")]
    SingularMatrix { bone: usize },

    #[error("armature bone limit {limit} exceeded")]
    CapacityExceeded { limit: usize },

    #[error("upload buffer too small: {capacity} < {required}")]
    BufferTooSmall { required: usize, capacity: usize },
}

pub type Result<T> = std::result::Result<T, ArmatureError>;
