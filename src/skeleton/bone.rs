//! 骨骼节点

use glam::Mat4;

use super::NO_PARENT;

/// 骨骼节点
///
/// 只由 [`BoneStore`](super::BoneStore) 持有，其他地方通过 id 或名称引用。
#[derive(Clone, Debug)]
pub struct Bone {
    pub(crate) id: usize,
    pub(crate) parent_index: i32,
    pub(crate) name: String,

    // 子骨骼索引（反向引用，不表示所有权），由 link 构建
    pub(crate) children: Vec<usize>,

    // 绑定姿势世界变换；求逆之后为逆绑定矩阵
    pub(crate) rest_world: Option<Mat4>,
    // 当前帧世界变换
    pub(crate) animated_world: Option<Mat4>,
}

impl Bone {
    pub fn new(id: usize, parent_index: i32, name: String) -> Self {
        Self {
            id,
            parent_index,
            name,
            children: Vec::new(),
            rest_world: None,
            animated_world: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 原始父索引，根骨骼为 -1
    pub fn parent_index(&self) -> i32 {
        self.parent_index
    }

    pub fn parent(&self) -> Option<usize> {
        if self.parent_index == NO_PARENT {
            None
        } else {
            usize::try_from(self.parent_index).ok()
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_index == NO_PARENT
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// 绑定姿势矩阵。绑定完成后为逆绑定矩阵（骨架空间 → 骨骼空间）
    pub fn rest_world(&self) -> Option<Mat4> {
        self.rest_world
    }

    /// 当前帧世界变换（骨骼空间 → 骨架空间）
    pub fn animated_world(&self) -> Option<Mat4> {
        self.animated_world
    }

    /// 蒙皮矩阵 = 当前全局变换 * 逆绑定矩阵
    ///
    /// 任一矩阵尚未写入时返回 None，由调用方决定替代值。
    pub fn skin_matrix(&self) -> Option<Mat4> {
        match (self.animated_world, self.rest_world) {
            (Some(animated), Some(inverse_bind)) => Some(animated * inverse_bind),
            _ => None,
        }
    }
}
