//! 提示词渲染
//!
//! 上下文按固定顺序渲染：故事 → 分部 → 章节 → 场景 → 角色 → 地点，
//! 之后是层级指令。已有的兄弟产物全部列出，不做截断。

use std::fmt::Write;

use super::context::GenerationContext;
use crate::application::ports::{
    ChapterRecord, CharacterRecord, SceneRecord, SettingRecord, StoryRecord,
};
use crate::domain::story::{GenerationLevel, Tone};
use crate::domain::text_metrics::CategoricalTag;

fn render_story(out: &mut String, story: &StoryRecord) {
    let _ = writeln!(out, "# Story: {}", story.title);
    let _ = writeln!(out, "Genre: {}", story.genre);
    let _ = writeln!(out, "Tone: {}", story.tone.as_str());
    let _ = writeln!(out, "Premise: {}", story.premise);
    if !story.structure.parts.is_empty() {
        let _ = writeln!(out, "Planned structure:");
        for (i, plan) in story.structure.parts.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. {} ({:.0}% of words)",
                i + 1,
                plan.name,
                plan.word_share * 100.0
            );
        }
    }
    out.push('\n');
}

fn render_chapter(out: &mut String, chapter: &ChapterRecord) {
    let _ = writeln!(out, "Chapter {}: {}", chapter.ordinal_index, chapter.title);
    let _ = writeln!(out, "  POV: {}", chapter.pov_character);
    let _ = writeln!(out, "  Summary: {}", chapter.summary);
    let _ = writeln!(
        out,
        "  Acts: setup: {} | confrontation: {} | resolution: {}",
        chapter.act.setup, chapter.act.confrontation, chapter.act.resolution
    );
}

fn render_scene(out: &mut String, scene: &SceneRecord) {
    let _ = writeln!(
        out,
        "Scene {}: {} [{}]",
        scene.ordinal_index,
        scene.title,
        scene.cycle_phase.as_str()
    );
    let _ = writeln!(out, "  Summary: {}", scene.summary);
    let _ = writeln!(
        out,
        "  Goal: {} | Obstacle: {} | Outcome: {}",
        scene.goal, scene.obstacle, scene.outcome
    );
}

fn render_character(out: &mut String, character: &CharacterRecord) {
    let _ = writeln!(
        out,
        "- {} ({}): {} Voice: {}",
        character.name, character.role, character.summary, character.voice
    );
}

fn render_setting(out: &mut String, setting: &SettingRecord) {
    let _ = writeln!(out, "- {}: {}", setting.name, setting.description);
}

/// 渲染完整的上游上下文
pub fn render_context(ctx: &GenerationContext) -> String {
    let mut out = String::new();
    render_story(&mut out, &ctx.story);

    if !ctx.parts.is_empty() {
        out.push_str("## Parts\n");
        for part in &ctx.parts {
            let _ = writeln!(out, "Part {}: {}", part.ordinal_index, part.title);
            let _ = writeln!(
                out,
                "  Goal: {} | Conflict: {} | Outcome: {}",
                part.goal, part.conflict, part.outcome
            );
            let _ = writeln!(out, "  Summary: {}", part.summary);
        }
        out.push('\n');
    }

    if let Some(part) = &ctx.part {
        let _ = writeln!(out, "## Current part: Part {} {}\n", part.ordinal_index, part.title);
    }

    if !ctx.prior_chapters.is_empty() {
        out.push_str("## Previous chapters\n");
        for chapter in &ctx.prior_chapters {
            render_chapter(&mut out, chapter);
        }
        out.push('\n');
    }

    if let Some(chapter) = &ctx.chapter {
        out.push_str("## Current chapter\n");
        render_chapter(&mut out, chapter);
        out.push('\n');
    }

    if !ctx.prior_scenes.is_empty() {
        out.push_str("## Previous scenes\n");
        for scene in &ctx.prior_scenes {
            render_scene(&mut out, scene);
        }
        out.push('\n');
    }

    if !ctx.characters.is_empty() {
        out.push_str("## Characters\n");
        for character in &ctx.characters {
            render_character(&mut out, character);
        }
        out.push('\n');
    }

    if !ctx.settings.is_empty() {
        out.push_str("## Settings\n");
        for setting in &ctx.settings {
            render_setting(&mut out, setting);
        }
        out.push('\n');
    }

    out
}

fn level_instructions(ctx: &GenerationContext, ordinal: u32) -> String {
    match ctx.level {
        GenerationLevel::Part => {
            let plan = ctx
                .story
                .structure
                .plan_for(ordinal as usize)
                .map(|p| format!(" It should follow the planned part \"{}\".", p.name))
                .unwrap_or_default();
            format!(
                "Write part {} of the story: a title, its goal, central conflict, outcome and a summary.{}",
                ordinal, plan
            )
        }
        GenerationLevel::Chapter => format!(
            "Write chapter {} so it continues directly from the previous chapters: title, summary, \
             point-of-view character and a three-act structure (setup, confrontation, resolution).",
            ordinal
        ),
        GenerationLevel::SceneSummary => format!(
            "Plan scene {} of the current chapter: title, summary, cycle phase, time, place, POV, \
             the setting name, the names of the characters present (only from the list above), \
             goal, obstacle, outcome and ordered beats with optional shot types.",
            ordinal
        ),
        GenerationLevel::Character => format!(
            "Create character {} for this story, distinct from the existing characters: name, role, \
             summary, physical attributes and a speaking voice.",
            ordinal
        ),
        GenerationLevel::Setting => format!(
            "Create setting {} for this story, distinct from the existing settings: name, description \
             and a sensory palette (sight, sound, smell, touch, taste).",
            ordinal
        ),
    }
}

/// 层级生成提示词
pub fn render_generation_prompt(ctx: &GenerationContext, ordinal: u32) -> String {
    let mut out = render_context(ctx);
    out.push_str("## Task\n");
    out.push_str(&level_instructions(ctx, ordinal));
    out.push_str("\nRespond with JSON matching the provided schema.\n");
    out
}

/// 故事生成提示词
pub fn render_story_prompt(user_prompt: &str, tone: Option<Tone>, part_count: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Request\n{}\n", user_prompt.trim());
    out.push_str("## Task\nCreate a story: title, premise, genre, tone");
    if let Some(tone) = tone {
        let _ = write!(out, " (the tone must be \"{}\")", tone.as_str());
    }
    let _ = writeln!(
        out,
        " and a structure of {} parts whose word shares sum to 1.0.",
        part_count
    );
    out.push_str("Respond with JSON matching the provided schema.\n");
    out
}

/// 场景正文输入
pub struct SceneProseInput<'a> {
    pub story: &'a StoryRecord,
    pub chapter: &'a ChapterRecord,
    pub scene: &'a SceneRecord,
    pub characters: &'a [CharacterRecord],
    pub setting: Option<&'a SettingRecord>,
    pub previous_content: Option<&'a str>,
    pub target_words: (usize, usize),
}

/// 场景正文提示词
pub fn render_scene_prose_prompt(input: &SceneProseInput<'_>) -> String {
    let mut out = String::new();
    render_story(&mut out, input.story);
    out.push_str("## Chapter\n");
    render_chapter(&mut out, input.chapter);
    out.push_str("\n## Scene\n");
    render_scene(&mut out, input.scene);
    let _ = writeln!(out, "  Time: {} | Place: {} | POV: {}", input.scene.time, input.scene.place, input.scene.pov);
    for (i, beat) in input.scene.beats.iter().enumerate() {
        let _ = writeln!(out, "  Beat {}: {}", i + 1, beat.description);
    }
    if !input.characters.is_empty() {
        out.push_str("\n## Characters\n");
        for character in input.characters {
            render_character(&mut out, character);
        }
    }
    if let Some(setting) = input.setting {
        out.push_str("\n## Setting\n");
        render_setting(&mut out, setting);
        let s = &setting.sensory;
        let _ = writeln!(
            out,
            "  Sight: {} | Sound: {} | Smell: {} | Touch: {} | Taste: {}",
            s.sight, s.sound, s.smell, s.touch, s.taste
        );
    }
    if let Some(previous) = input.previous_content.filter(|p| !p.trim().is_empty()) {
        let _ = writeln!(out, "\n## Previous scene\n{}", previous);
    }
    let _ = writeln!(
        out,
        "\n## Task\nWrite the prose of this scene in {} to {} words. Put each line of dialogue \
         in its own paragraph and keep each line under 150 characters. No markdown emphasis.",
        input.target_words.0, input.target_words.1
    );
    out.push_str("Respond with JSON matching the provided schema.\n");
    out
}

/// 评审用的上游上下文（深度评估）
pub fn render_review_context(
    story: &StoryRecord,
    chapter: Option<&ChapterRecord>,
    characters: &[CharacterRecord],
    settings: &[SettingRecord],
) -> String {
    let mut out = String::new();
    render_story(&mut out, story);
    if let Some(chapter) = chapter {
        out.push_str("## Chapter\n");
        render_chapter(&mut out, chapter);
        out.push('\n');
    }
    if !characters.is_empty() {
        out.push_str("## Characters\n");
        for character in characters {
            render_character(&mut out, character);
        }
        out.push('\n');
    }
    if !settings.is_empty() {
        out.push_str("## Settings\n");
        for setting in settings {
            render_setting(&mut out, setting);
        }
        out.push('\n');
    }
    out
}

/// 评审提示词
pub fn render_critic_prompt(artifact_kind: &str, content: &str, context: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(context) = context {
        out.push_str(context);
        out.push('\n');
    }
    let _ = writeln!(out, "## {} under review\n{}\n", artifact_kind, content);
    out.push_str(
        "## Task\nScore the text from 1 to 5 on plot, character, pacing, prose and world_building, \
         and give short feedback for any category below 3.\n",
    );
    out.push_str("Respond with JSON matching the provided schema.\n");
    out
}
