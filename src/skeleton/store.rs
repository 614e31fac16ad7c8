//! 骨骼存储

use std::collections::HashMap;

use super::{Bone, NO_PARENT};
use crate::{ArmatureError, Result};

/// 骨骼存储
///
/// 以 id 为下标的连续数组，另建名称到 id 的映射。
/// 插入时不要求 id 有序，空洞在 link 时检查。
#[derive(Clone, Debug)]
pub struct BoneStore {
    slots: Vec<Option<Bone>>,
    name_to_index: HashMap<String, usize>,
    // link 成功后的先序遍历顺序，结构变化时清空
    order: Vec<usize>,
    // 逆绑定矩阵已写入，之后结构和绑定姿势都不能再改
    rest_bound: bool,
    count: usize,
    max_bones: usize,
}

impl BoneStore {
    pub fn new(max_bones: usize) -> Self {
        Self {
            slots: Vec::new(),
            name_to_index: HashMap::new(),
            order: Vec::new(),
            rest_bound: false,
            count: 0,
            max_bones,
        }
    }

    /// 以给定名称的根骨骼（id 0，父索引 -1）创建存储
    pub fn with_root(name: impl Into<String>, max_bones: usize) -> Self {
        let name = name.into();
        let mut store = Self::new(max_bones.max(1));
        store.name_to_index.insert(name.clone(), 0);
        store.slots.push(Some(Bone::new(0, NO_PARENT, name)));
        store.count = 1;
        // 只有根骨骼时层级已完整
        store.order.push(0);
        store
    }

    /// 添加骨骼
    pub fn add_bone(&mut self, id: i32, parent_index: i32, name: impl Into<String>) -> Result<()> {
        if self.rest_bound {
            return Err(ArmatureError::InvalidState(
                "bones cannot be added after the rest pose is bound",
            ));
        }
        let name = name.into();
        let index = usize::try_from(id).map_err(|_| ArmatureError::OutOfRange {
            id: i64::from(id),
            size: self.count,
        })?;

        if self.slots.get(index).is_some_and(Option::is_some) {
            return Err(ArmatureError::DuplicateId { id: index });
        }
        if self.name_to_index.contains_key(&name) {
            return Err(ArmatureError::DuplicateName { name });
        }
        if self.count >= self.max_bones || index >= self.max_bones {
            return Err(ArmatureError::CapacityExceeded {
                limit: self.max_bones,
            });
        }

        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.name_to_index.insert(name.clone(), index);
        self.slots[index] = Some(Bone::new(index, parent_index, name));
        self.count += 1;
        self.order.clear();
        Ok(())
    }

    /// 通过名称获取骨骼
    pub fn get_by_name(&self, name: &str) -> Result<&Bone> {
        self.name_to_index
            .get(name)
            .and_then(|&index| self.slot(index))
            .ok_or_else(|| ArmatureError::NotFound {
                name: name.to_string(),
            })
    }

    /// 通过 id 获取骨骼
    pub fn get_by_id(&self, id: usize) -> Result<&Bone> {
        self.slot(id).ok_or(ArmatureError::OutOfRange {
            id: id as i64,
            size: self.count,
        })
    }

    pub(crate) fn get_mut(&mut self, id: usize) -> Result<&mut Bone> {
        let size = self.count;
        self.slots
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(ArmatureError::OutOfRange { id: id as i64, size })
    }

    /// 通过名称查找骨骼 id
    pub fn find_bone_by_name(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// 骨骼数量（含根骨骼）
    pub fn size(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// 按 id 顺序遍历骨骼
    pub fn iter(&self) -> impl Iterator<Item = &Bone> {
        self.slots.iter().flatten()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Bone> {
        self.slots.iter_mut().flatten()
    }

    /// 父先于子的遍历顺序，未 link 时为空
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub(crate) fn set_order(&mut self, order: Vec<usize>) {
        self.order = order;
    }

    /// 层级已链接且覆盖全部骨骼
    pub fn is_linked(&self) -> bool {
        self.count > 0 && self.order.len() == self.count
    }

    /// 逆绑定矩阵是否已就绪
    pub fn is_rest_bound(&self) -> bool {
        self.rest_bound
    }

    pub(crate) fn mark_rest_bound(&mut self) {
        self.rest_bound = true;
    }

    /// 第一个空缺的 id；id 连续时返回 None
    pub(crate) fn first_missing(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    fn slot(&self, index: usize) -> Option<&Bone> {
        self.slots.get(index).and_then(Option::as_ref)
    }
}
