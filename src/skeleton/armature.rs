//! 骨架：串联存储、层级、姿势合成和逆绑定的生命周期

use glam::Mat4;

use super::{hierarchy, Bone, BoneDef, BoneStore, PoseComposer, PoseSpace, RestInverter, NO_PARENT};
use crate::config::{self, ArmatureConfig};
use crate::skinning::SkinMatrixView;
use crate::{ArmatureError, Result};

/// 骨架生命周期状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArmatureState {
    /// 有骨骼尚未链接进层级
    Unlinked,
    /// 层级已建立，等待绑定姿势
    Linked,
    /// 逆绑定矩阵已就绪，可以逐帧合成动画姿势
    Bound,
    /// 绑定姿势不可逆，该骨架不能再用于蒙皮
    Faulted,
}

/// 骨架
///
/// 一个蒙皮网格实例对应一个骨架。调用顺序：
/// `add_bone` → `link` → `compose_rest`（一次）→ `compose_animated`（每帧）。
#[derive(Clone, Debug)]
pub struct Armature {
    store: BoneStore,
    state: ArmatureState,
    config: ArmatureConfig,
}

impl Armature {
    /// 以根骨骼名称创建骨架，根骨骼 id 为 0、父索引为 -1
    pub fn new(root_name: impl Into<String>) -> Self {
        Self::with_config(root_name, config::get_config())
    }

    pub fn with_config(root_name: impl Into<String>, config: ArmatureConfig) -> Self {
        Self {
            store: BoneStore::with_root(root_name, config.max_bones),
            state: ArmatureState::Linked,
            config,
        }
    }

    /// 从 (id, 父 id, 名称) 列表创建并链接骨架，第一项必须是根骨骼
    pub fn from_definition(defs: &[BoneDef]) -> Result<Self> {
        Self::from_definition_with_config(defs, config::get_config())
    }

    pub fn from_definition_with_config(defs: &[BoneDef], config: ArmatureConfig) -> Result<Self> {
        let (root, rest) = defs
            .split_first()
            .ok_or(ArmatureError::MissingBone { id: 0 })?;
        if root.id != 0 {
            return Err(ArmatureError::MissingBone { id: 0 });
        }
        if root.parent_id != NO_PARENT {
            return Err(ArmatureError::InvalidParent {
                bone: 0,
                parent: root.parent_id,
            });
        }

        let mut armature = Self::with_config(root.name.clone(), config);
        for def in rest {
            armature.add_bone(def.id, def.parent_id, def.name.clone())?;
        }
        armature.link()?;
        Ok(armature)
    }

    /// 添加骨骼，之后需要重新 link
    pub fn add_bone(&mut self, id: i32, parent_id: i32, name: impl Into<String>) -> Result<()> {
        match self.state {
            ArmatureState::Bound | ArmatureState::Faulted => Err(ArmatureError::InvalidState(
                "bones cannot be added after the rest pose is bound",
            )),
            ArmatureState::Unlinked | ArmatureState::Linked => {
                self.store.add_bone(id, parent_id, name)?;
                self.state = ArmatureState::Unlinked;
                Ok(())
            }
        }
    }

    /// 构建骨骼层级，可重复调用
    pub fn link(&mut self) -> Result<()> {
        if self.state == ArmatureState::Faulted {
            return Err(ArmatureError::InvalidState("armature is faulted"));
        }
        hierarchy::link(&mut self.store)?;
        if self.state == ArmatureState::Unlinked {
            self.state = ArmatureState::Linked;
        }
        log::info!("骨骼层级构建完成: {} 个骨骼", self.store.size());
        Ok(())
    }

    /// 合成绑定姿势并求逆，得到逆绑定矩阵。每个骨架只能调用一次
    pub fn compose_rest(&mut self, locals: &[Mat4]) -> Result<()> {
        match self.state {
            ArmatureState::Unlinked => {
                return Err(ArmatureError::InvalidState("hierarchy is not linked"))
            }
            ArmatureState::Bound => {
                return Err(ArmatureError::InvalidState("rest pose is already bound"))
            }
            ArmatureState::Faulted => {
                return Err(ArmatureError::InvalidState("armature is faulted"))
            }
            ArmatureState::Linked => {}
        }

        PoseComposer::new(PoseSpace::Rest).compose(&mut self.store, locals)?;

        if let Err(err) = RestInverter::new(self.config.singular_epsilon).invert_all(&mut self.store) {
            log::error!("绑定姿势求逆失败: {}", err);
            self.state = ArmatureState::Faulted;
            return Err(err);
        }

        self.state = ArmatureState::Bound;
        log::info!("绑定姿势已就绪: {} 个骨骼", self.store.size());
        Ok(())
    }

    /// 合成当前帧动画姿势
    pub fn compose_animated(&mut self, locals: &[Mat4]) -> Result<()> {
        match self.state {
            ArmatureState::Bound => {}
            ArmatureState::Faulted => {
                return Err(ArmatureError::InvalidState("armature is faulted"))
            }
            ArmatureState::Unlinked | ArmatureState::Linked => {
                return Err(ArmatureError::InvalidState("rest pose has not been bound"))
            }
        }

        PoseComposer::new(PoseSpace::Animated).compose(&mut self.store, locals)?;

        if self.config.debug_log {
            log::debug!("动画姿势已更新: {} 个骨骼", self.store.size());
        }
        Ok(())
    }

    /// 蒙皮矩阵视图
    pub fn skin(&self) -> SkinMatrixView<'_> {
        SkinMatrixView::new(&self.store, self.config.singular_epsilon)
    }

    /// 获取骨骼数量（含根骨骼）
    pub fn size(&self) -> usize {
        self.store.size()
    }

    pub fn get_by_name(&self, name: &str) -> Result<&Bone> {
        self.store.get_by_name(name)
    }

    pub fn get_by_id(&self, id: usize) -> Result<&Bone> {
        self.store.get_by_id(id)
    }

    pub fn root(&self) -> Result<&Bone> {
        self.store.get_by_id(0)
    }

    /// 按 id 顺序遍历骨骼
    pub fn bones(&self) -> impl Iterator<Item = &Bone> {
        self.store.iter()
    }

    pub fn store(&self) -> &BoneStore {
        &self.store
    }

    pub fn state(&self) -> ArmatureState {
        self.state
    }

    pub fn config(&self) -> &ArmatureConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat3, Vec3};
    use std::f32::consts::FRAC_PI_2;

    fn hip_spine() -> Armature {
        let mut armature = Armature::with_config("hip", ArmatureConfig::default());
        armature.add_bone(1, 0, "spine").unwrap();
        armature.link().unwrap();
        armature
    }

    #[test]
    fn test_single_bone_bind_pose_is_identity() {
        let mut armature = Armature::with_config("root", ArmatureConfig::default());
        let m = Mat4::from_scale_rotation_translation(
            Vec3::new(1.0, 1.5, 1.0),
            glam::Quat::from_rotation_x(0.8),
            Vec3::new(4.0, 5.0, -6.0),
        );
        armature.compose_rest(&[m]).unwrap();
        armature.compose_animated(&[m]).unwrap();

        let skin = armature.skin().skin_matrix(0).unwrap();
        assert!(skin.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }

    #[test]
    fn test_hip_spine_scenario() {
        let mut armature = hip_spine();
        let translate_up = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
        armature
            .compose_rest(&[Mat4::IDENTITY, translate_up])
            .unwrap();
        assert_eq!(armature.state(), ArmatureState::Bound);

        let spine_rest = armature.get_by_name("spine").unwrap().rest_world().unwrap();
        let translate_down = Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0));
        assert!(spine_rest.abs_diff_eq(translate_down, 1e-6));

        let rotate = Mat4::from_rotation_y(FRAC_PI_2);
        armature
            .compose_animated(&[Mat4::IDENTITY, rotate])
            .unwrap();
        let spine = armature.get_by_id(1).unwrap();
        assert!(spine.animated_world().unwrap().abs_diff_eq(rotate, 1e-6));

        let skin = armature.skin().skin_matrix(1).unwrap();
        assert!(skin.abs_diff_eq(rotate * translate_down, 1e-6));

        // 绑定位置上的顶点被移回原点再旋转
        let p = skin.transform_point3(Vec3::new(1.0, 1.0, 0.0));
        assert!(p.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-5));
    }

    #[test]
    fn test_child_rest_is_inverse_of_composition() {
        let mut armature = hip_spine();
        let l_r = Mat4::from_rotation_z(0.25) * Mat4::from_translation(Vec3::X);
        let l_c = Mat4::from_scale(Vec3::new(1.0, 2.0, 1.0));
        armature.compose_rest(&[l_r, l_c]).unwrap();

        let rest = armature.get_by_id(1).unwrap().rest_world().unwrap();
        assert!(rest.abs_diff_eq((l_r * l_c).inverse(), 1e-5));
    }

    #[test]
    fn test_animate_before_rest_rejected() {
        let mut armature = hip_spine();
        let result = armature.compose_animated(&[Mat4::IDENTITY, Mat4::IDENTITY]);
        assert!(matches!(result, Err(ArmatureError::InvalidState(_))));
    }

    #[test]
    fn test_rest_inverted_only_once() {
        let mut armature = hip_spine();
        let locals = [Mat4::IDENTITY, Mat4::from_translation(Vec3::Y)];
        armature.compose_rest(&locals).unwrap();
        let bound = armature.get_by_id(1).unwrap().rest_world();

        assert!(matches!(
            armature.compose_rest(&locals),
            Err(ArmatureError::InvalidState(_))
        ));
        assert_eq!(armature.get_by_id(1).unwrap().rest_world(), bound);
    }

    #[test]
    fn test_rest_arity_keeps_state() {
        let mut armature = hip_spine();
        assert_eq!(
            armature.compose_rest(&[Mat4::IDENTITY]),
            Err(ArmatureError::Arity {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(armature.state(), ArmatureState::Linked);
        armature
            .compose_rest(&[Mat4::IDENTITY, Mat4::IDENTITY])
            .unwrap();
    }

    #[test]
    fn test_singular_bind_pose_faults_armature() {
        let mut armature = hip_spine();
        let result = armature.compose_rest(&[Mat4::IDENTITY, Mat4::ZERO]);
        assert_eq!(result, Err(ArmatureError::SingularMatrix { bone: 1 }));
        assert_eq!(armature.state(), ArmatureState::Faulted);
        assert!(armature
            .compose_animated(&[Mat4::IDENTITY, Mat4::IDENTITY])
            .is_err());
        assert!(armature.link().is_err());
    }

    #[test]
    fn test_invalid_parent_blocks_composition() {
        let mut armature = Armature::with_config("hip", ArmatureConfig::default());
        armature.add_bone(1, 0, "spine").unwrap();
        armature.add_bone(2, 9, "head").unwrap();
        assert_eq!(
            armature.link(),
            Err(ArmatureError::InvalidParent { bone: 2, parent: 9 })
        );
        assert_eq!(armature.state(), ArmatureState::Unlinked);
        assert!(matches!(
            armature.compose_rest(&[Mat4::IDENTITY; 3]),
            Err(ArmatureError::InvalidState(_))
        ));
    }

    #[test]
    fn test_add_bone_requires_relink() {
        let mut armature = hip_spine();
        armature.add_bone(2, 1, "head").unwrap();
        assert_eq!(armature.state(), ArmatureState::Unlinked);
        armature.link().unwrap();
        armature.link().unwrap();
        assert_eq!(armature.get_by_id(1).unwrap().children(), &[2]);
        assert_eq!(armature.root().unwrap().children(), &[1]);

        armature.compose_rest(&[Mat4::IDENTITY; 3]).unwrap();
        assert!(matches!(
            armature.add_bone(3, 0, "tail"),
            Err(ArmatureError::InvalidState(_))
        ));
    }

    #[test]
    fn test_from_definition() {
        let defs: Vec<BoneDef> = vec![
            (0, -1, "hip").into(),
            (2, 1, "head").into(),
            (1, 0, "spine").into(),
        ];
        let armature = Armature::from_definition_with_config(&defs, ArmatureConfig::default())
            .unwrap();
        assert_eq!(armature.size(), 3);
        assert_eq!(armature.state(), ArmatureState::Linked);
        for bone in armature.bones() {
            assert_eq!(armature.get_by_name(bone.name()).unwrap().id(), bone.id());
        }
    }

    #[test]
    fn test_from_definition_requires_root_first() {
        let defs = vec![BoneDef::new(0, 3, "hip")];
        assert_eq!(
            Armature::from_definition_with_config(&defs, ArmatureConfig::default()).err(),
            Some(ArmatureError::InvalidParent { bone: 0, parent: 3 })
        );
        assert_eq!(
            Armature::from_definition_with_config(&[], ArmatureConfig::default()).err(),
            Some(ArmatureError::MissingBone { id: 0 })
        );
    }

    #[test]
    fn test_cloned_armatures_are_independent() {
        let mut first = hip_spine();
        first
            .compose_rest(&[Mat4::IDENTITY, Mat4::IDENTITY])
            .unwrap();
        let mut second = first.clone();

        first
            .compose_animated(&[Mat4::IDENTITY, Mat4::from_rotation_x(1.0)])
            .unwrap();
        second
            .compose_animated(&[Mat4::IDENTITY, Mat4::IDENTITY])
            .unwrap();

        assert_ne!(
            first.skin().skin_matrix(1).unwrap(),
            second.skin().skin_matrix(1).unwrap()
        );
    }

    #[test]
    fn test_palette_for_upload() {
        let mut armature = hip_spine();
        armature
            .compose_rest(&[Mat4::IDENTITY, Mat4::from_translation(Vec3::Y)])
            .unwrap();
        // 动画前全部为单位矩阵
        let palette = armature.skin().palette().unwrap();
        assert_eq!(palette.bone_count(), 2);
        for (skin, normal) in palette.matrices.iter().zip(&palette.normals) {
            assert!(skin.abs_diff_eq(Mat4::IDENTITY, 1e-6));
            assert!(normal.abs_diff_eq(Mat3::IDENTITY, 1e-6));
        }

        armature
            .compose_animated(&[Mat4::from_translation(Vec3::X), Mat4::from_translation(Vec3::Y)])
            .unwrap();
        let palette = armature.skin().palette().unwrap();
        assert_eq!(palette.bone_count(), 2);
        assert!(palette.matrices[1].abs_diff_eq(Mat4::from_translation(Vec3::X), 1e-6));
        assert!(palette.normals[1].abs_diff_eq(Mat3::IDENTITY, 1e-6));

        let hand = armature.skin().animated_world_by_name("spine").unwrap().unwrap();
        assert!(hand.abs_diff_eq(Mat4::from_translation(Vec3::new(1.0, 1.0, 0.0)), 1e-6));
    }

    #[test]
    fn test_attachment_available_after_rest() {
        let mut armature = hip_spine();
        let translate_up = Mat4::from_translation(Vec3::Y);
        armature
            .compose_rest(&[Mat4::IDENTITY, translate_up])
            .unwrap();

        let hand = armature.skin().animated_world_by_name("spine").unwrap();
        assert_eq!(hand, Some(translate_up));
        let skin = armature.skin().skin_matrix(1).unwrap();
        assert!(skin.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn test_small_scale_bind_pose() {
        let mut armature = hip_spine();
        let tiny = Mat4::from_scale(Vec3::splat(1.0e-4));
        armature
            .compose_rest(&[tiny, Mat4::from_translation(Vec3::new(0.0, 500.0, 0.0))])
            .unwrap();
        assert_eq!(armature.state(), ArmatureState::Bound);

        armature
            .compose_animated(&[tiny, Mat4::from_translation(Vec3::new(0.0, 500.0, 0.0))])
            .unwrap();
        let palette = armature.skin().palette().unwrap();
        assert!(palette.matrices[1].abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    // 唯一修改全局配置的测试，其余测试都显式传入配置
    #[test]
    fn test_global_config_applies_to_new_armatures() {
        let before = Armature::new("hip");
        config::set_config(ArmatureConfig {
            max_bones: 2,
            debug_log: true,
            ..ArmatureConfig::default()
        });

        let mut after = Armature::new("hip");
        assert_eq!(after.config().max_bones, 2);
        assert!(after.config().debug_log);
        after.add_bone(1, 0, "spine").unwrap();
        assert_eq!(
            after.add_bone(2, 1, "head"),
            Err(ArmatureError::CapacityExceeded { limit: 2 })
        );
        // 已创建的骨架保留自己的副本
        assert_eq!(before.config(), &ArmatureConfig::default());

        config::reset_config();
        assert_eq!(config::get_config(), ArmatureConfig::default());
        assert_eq!(Armature::new("hip").config().max_bones, 1024);
    }
}
