//! 姿势合成

use glam::Mat4;

use super::{BoneStore, PoseSpace};
use crate::{ArmatureError, Result};

/// 姿势合成器
///
/// 按父先于子的顺序把局部矩阵逐级合成为骨架空间矩阵：
/// `world(b) = world(parent(b)) * local[b.id]`，根骨骼直接取 `local[0]`。
/// 每次都从局部矩阵重新计算，不在上一帧结果上累积。
///
/// 绑定姿势合成同时把结果写入 animated_world，第一帧动画之前
/// 挂点查询得到的就是绑定姿势，蒙皮矩阵为单位矩阵。
#[derive(Clone, Copy, Debug)]
pub struct PoseComposer {
    pub space: PoseSpace,
}

impl PoseComposer {
    pub fn new(space: PoseSpace) -> Self {
        Self { space }
    }

    pub fn compose(&self, store: &mut BoneStore, locals: &[Mat4]) -> Result<()> {
        if locals.len() != store.size() {
            return Err(ArmatureError::Arity {
                expected: store.size(),
                actual: locals.len(),
            });
        }
        if !store.is_linked() {
            return Err(ArmatureError::InvalidState("hierarchy is not linked"));
        }
        match self.space {
            PoseSpace::Rest if store.is_rest_bound() => {
                return Err(ArmatureError::InvalidState("rest pose is already bound"));
            }
            PoseSpace::Animated if !store.is_rest_bound() => {
                return Err(ArmatureError::InvalidState("rest pose has not been bound"));
            }
            _ => {}
        }

        let world = Self::accumulate(store, locals)?;

        for bone in store.iter_mut() {
            let matrix = world[bone.id];
            match self.space {
                PoseSpace::Rest => {
                    bone.rest_world = Some(matrix);
                    bone.animated_world = Some(matrix);
                }
                PoseSpace::Animated => bone.animated_world = Some(matrix),
            }
        }
        Ok(())
    }

    /// 沿缓存的先序顺序计算全部骨骼的世界矩阵
    fn accumulate(store: &BoneStore, locals: &[Mat4]) -> Result<Vec<Mat4>> {
        let mut world = vec![Mat4::IDENTITY; store.size()];
        for &index in store.order() {
            let local = locals[index];
            world[index] = match store.get_by_id(index)?.parent() {
                Some(parent) => world[parent] * local,
                None => local,
            };
        }
        Ok(world)
    }
}
