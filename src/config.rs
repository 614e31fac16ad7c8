//! 骨架配置
//!
//! 全局配置只作为新骨架的默认值，每个骨架在创建时复制一份，之后互不影响。

use once_cell::sync::Lazy;
use std::sync::RwLock;

/// 骨架配置（扁平化，不嵌套）
#[derive(Debug, Clone, PartialEq)]
pub struct ArmatureConfig {
    /// 奇异判定阈值，默认 1.0e-6
    /// 比较的是 |det| 与各列长度乘积之比，与骨架整体缩放无关
    pub singular_epsilon: f32,
    /// 单个骨架允许的最大骨骼数，默认 1024
    /// 对应着色器中骨骼矩阵 uniform 数组的长度
    pub max_bones: usize,
    /// 是否输出每帧调试日志，默认 false
    pub debug_log: bool,
}

impl Default for ArmatureConfig {
    fn default() -> Self {
        Self {
            // 比值落在 0..=1，只有缩放为 0 或轴接近共线才会低于此值
            singular_epsilon: 1.0e-6,

            max_bones: 1024,

            debug_log: false,
        }
    }
}

/// 全局默认配置
static ARMATURE_CONFIG: Lazy<RwLock<ArmatureConfig>> =
    Lazy::new(|| RwLock::new(ArmatureConfig::default()));

/// 获取当前默认配置（只读）
pub fn get_config() -> ArmatureConfig {
    match ARMATURE_CONFIG.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// 设置默认配置，只影响之后创建的骨架
pub fn set_config(config: ArmatureConfig) {
    match ARMATURE_CONFIG.write() {
        Ok(mut guard) => *guard = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

/// 重置为默认配置
pub fn reset_config() {
    set_config(ArmatureConfig::default());
}
