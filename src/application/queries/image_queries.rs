//! Image Prompt Queries

use uuid::Uuid;

/// 角色图片提示词查询
#[derive(Debug, Clone)]
pub struct CharacterImagePrompt {
    pub character_id: Uuid,
    /// 姿态/动作修饰
    pub modifier: Option<String>,
}

/// 场景图片提示词查询（每个出场角色一条）
#[derive(Debug, Clone)]
pub struct ScenePrompts {
    pub scene_id: Uuid,
}
