//! 骨骼层级构建

use super::{Bone, BoneStore, NO_PARENT};
use crate::{ArmatureError, Result};

/// 构建父子层级
///
/// 先校验全部父索引，再清空并重建所有子列表，重复调用结果一致。
/// 成功后缓存先序遍历顺序，供姿势合成使用。
pub fn link(store: &mut BoneStore) -> Result<()> {
    if let Some(id) = store.first_missing() {
        return Err(ArmatureError::MissingBone { id });
    }
    if store.is_empty() {
        return Err(ArmatureError::MissingBone { id: 0 });
    }

    for bone in store.iter() {
        validate_parent(bone)?;
    }

    for bone in store.iter_mut() {
        bone.children.clear();
    }
    let edges: Vec<(usize, usize)> = store
        .iter()
        .filter_map(|bone| bone.parent().map(|parent| (parent, bone.id)))
        .collect();
    for (parent, child) in edges {
        store.get_mut(parent)?.children.push(child);
    }

    // 从根骨骼出发必须能到达所有骨骼。
    // 父 id 严格小于子 id 且 id 连续时这一检查不会失败，环会先以 InvalidParent 报出；
    // 保留它是为了父索引规则放宽后仍能发现环和孤立骨骼
    let order: Vec<usize> = Preorder::new(store, 0).map(Bone::id).collect();
    if order.len() != store.size() {
        let mut reached = vec![false; store.size()];
        for &id in &order {
            reached[id] = true;
        }
        let unreachable = (0..reached.len()).filter(|&id| !reached[id]).collect();
        return Err(ArmatureError::CycleDetected { unreachable });
    }
    store.set_order(order);

    Ok(())
}

/// 父索引规则：只有 0 号骨骼是根，其余骨骼的父 id 必须严格小于自身 id
fn validate_parent(bone: &Bone) -> Result<()> {
    let valid = if bone.id == 0 {
        bone.parent_index == NO_PARENT
    } else {
        bone.parent().is_some_and(|parent| parent < bone.id)
    };

    if valid {
        Ok(())
    } else {
        Err(ArmatureError::InvalidParent {
            bone: bone.id,
            parent: bone.parent_index,
        })
    }
}

/// 深度优先先序遍历（显式栈），父骨骼总在子骨骼之前
pub struct Preorder<'a> {
    store: &'a BoneStore,
    stack: Vec<usize>,
}

impl<'a> Preorder<'a> {
    pub fn new(store: &'a BoneStore, start: usize) -> Self {
        Self {
            store,
            stack: vec![start],
        }
    }
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a Bone;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let index = self.stack.pop()?;
            if let Ok(bone) = self.store.get_by_id(index) {
                // 逆序压栈，保证按子列表顺序访问
                self.stack.extend(bone.children.iter().rev());
                return Some(bone);
            }
        }
    }
}
