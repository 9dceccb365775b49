//! 文本格式规范化
//!
//! 有序、相互依赖的规则列表，每条规则都是独立可测的函数：
//! 0. 统一换行符（CRLF → LF）
//! 1. 去掉加粗标记，再去掉斜体标记
//! 2. 以 `, ! ? .` 结尾的引号后同行紧跟文字时，插入空行
//! 3. 以 `. ! ?` 结尾的叙述后同行紧跟开引号时，插入空行
//! 4. 以逗号结尾的说话人提示后同行紧跟开引号时，插入空行
//! 5. 连续 3 个以上空行压缩为 1 个
//! 6. 以开引号开头的行，如果上一行非空，则在其前插入空行
//!
//! `format_text` 反复执行规则直到输出不再变化，保证幂等。
//! `validate_dialogue_spacing` 使用同一组模式重新扫描，只报告不报错。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 最大迭代轮数
const MAX_PASSES: usize = 10;

/// 违规片段的最大展示长度
const SNIPPET_CHARS: usize = 60;

// ============================================================================
// Regex Patterns
// ============================================================================

static BOLD_STAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^\n]+?)\*\*").expect("Failed to compile bold pattern"));

static BOLD_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__([^\n]+?)__").expect("Failed to compile bold pattern"));

static ITALIC_STAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\n]+?)\*").expect("Failed to compile italic pattern"));

/// `_x_` 仅在两侧为非单词字符时视为斜体，避免误伤 snake_case
static ITALIC_UNDERSCORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)(^|[^\w])_([^_\n]+?)_([^\w]|$)").expect("Failed to compile italic pattern")
});

static DIALOGUE_THEN_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([,!?.]["\u{201D}])[ \t]+(\w)"#).expect("Failed to compile dialogue pattern")
});

static NARRATIVE_THEN_QUOTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([.!?])[ \t]+(["\u{201C}])"#).expect("Failed to compile narrative pattern")
});

static ATTRIBUTION_THEN_QUOTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#",[ \t]+(["\u{201C}])"#).expect("Failed to compile attribution pattern")
});

static EXCESS_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){3,}").expect("Failed to compile blank-line pattern"));

// ============================================================================
// Rules
// ============================================================================

/// 规则 0：统一换行符
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}

fn replace_until_stable(text: &str, pattern: &Regex, replacement: &str) -> String {
    let mut current = text.to_string();
    while pattern.is_match(&current) {
        current = pattern.replace_all(&current, replacement).into_owned();
    }
    current
}

/// 规则 1a：去掉加粗标记
pub fn strip_bold(text: &str) -> String {
    let text = replace_until_stable(text, &BOLD_STAR, "$1");
    replace_until_stable(&text, &BOLD_UNDERSCORE, "$1")
}

/// 规则 1b：去掉斜体标记
pub fn strip_italic(text: &str) -> String {
    let text = replace_until_stable(text, &ITALIC_STAR, "$1");
    replace_until_stable(&text, &ITALIC_UNDERSCORE, "$1$2$3")
}

/// 规则 2：对白结束后同行的文字另起一段
pub fn separate_dialogue_from_trailing_text(text: &str) -> String {
    DIALOGUE_THEN_TEXT
        .replace_all(text, "$1\n\n$2")
        .into_owned()
}

/// 规则 3：叙述句结束后同行的开引号另起一段
pub fn separate_narrative_from_dialogue(text: &str) -> String {
    NARRATIVE_THEN_QUOTE
        .replace_all(text, "$1\n\n$2")
        .into_owned()
}

/// 规则 4：逗号结尾的说话人提示与随后的开引号分段
pub fn separate_attribution_from_dialogue(text: &str) -> String {
    ATTRIBUTION_THEN_QUOTE
        .replace_all(text, ",\n\n$1")
        .into_owned()
}

/// 规则 5：压缩多余空行
pub fn collapse_blank_lines(text: &str) -> String {
    EXCESS_BLANK_LINES.replace_all(text, "\n\n").into_owned()
}

#[inline]
fn starts_with_opening_quote(line: &str) -> bool {
    line
        .trim_start()
        .starts_with(|c: char| c == '"' || c == '\u{201C}')
}

/// 规则 6：以开引号开头的行前必须是空行
pub fn ensure_blank_line_before_dialogue(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.split('\n') {
        if starts_with_opening_quote(line) {
            if let Some(prev) = lines.last() {
                if !prev.trim().is_empty() {
                    lines.push("");
                }
            }
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// 执行一轮全部规则（顺序固定）
fn apply_rules(text: &str) -> String {
    let text = normalize_line_endings(text);
    let text = strip_bold(&text);
    let text = strip_italic(&text);
    let text = separate_dialogue_from_trailing_text(&text);
    let text = separate_narrative_from_dialogue(&text);
    let text = separate_attribution_from_dialogue(&text);
    let text = collapse_blank_lines(&text);
    ensure_blank_line_before_dialogue(&text)
}

/// 规范化文本格式
///
/// 重复执行规则直到输出稳定，因此 `format_text(format_text(x)) == format_text(x)`
pub fn format_text(text: &str) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_PASSES {
        let next = apply_rules(&current);
        if next == current {
            return next;
        }
        current = next;
    }
    tracing::warn!(
        text_len = current.len(),
        "Formatting did not stabilize within pass limit"
    );
    current
}

// ============================================================================
// Validator
// ============================================================================

/// 违规类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    EmphasisMarker,
    DialogueFollowedByText,
    NarrativeBeforeDialogue,
    AttributionBeforeDialogue,
    ExcessBlankLines,
    MissingBlankLineBeforeDialogue,
}

/// 单条违规
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattingViolation {
    pub kind: ViolationKind,
    pub snippet: String,
}

/// 格式检查结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattingReport {
    pub violations: Vec<FormattingViolation>,
}

impl FormattingReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn count_of(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }
}

fn snippet(s: &str) -> String {
    s.chars().take(SNIPPET_CHARS).collect()
}

fn collect_matches(
    text: &str,
    pattern: &Regex,
    kind: ViolationKind,
    out: &mut Vec<FormattingViolation>,
) {
    out.extend(pattern.find_iter(text).map(|m| FormattingViolation {
        kind,
        snippet: snippet(m.as_str()),
    }));
}

/// 检查文本中残留的格式问题
///
/// 只报告 (类型, 片段)，不会返回错误；作为质量门槛使用
pub fn validate_dialogue_spacing(text: &str) -> FormattingReport {
    let mut violations = Vec::new();

    for pattern in [&*BOLD_STAR, &*BOLD_UNDERSCORE, &*ITALIC_STAR, &*ITALIC_UNDERSCORE] {
        collect_matches(text, pattern, ViolationKind::EmphasisMarker, &mut violations);
    }
    collect_matches(
        text,
        &DIALOGUE_THEN_TEXT,
        ViolationKind::DialogueFollowedByText,
        &mut violations,
    );
    collect_matches(
        text,
        &NARRATIVE_THEN_QUOTE,
        ViolationKind::NarrativeBeforeDialogue,
        &mut violations,
    );
    collect_matches(
        text,
        &ATTRIBUTION_THEN_QUOTE,
        ViolationKind::AttributionBeforeDialogue,
        &mut violations,
    );
    collect_matches(
        text,
        &EXCESS_BLANK_LINES,
        ViolationKind::ExcessBlankLines,
        &mut violations,
    );

    let lines: Vec<&str> = text.split('\n').collect();
    for pair in lines.windows(2) {
        if starts_with_opening_quote(pair[1]) && !pair[0].trim().is_empty() {
            violations.push(FormattingViolation {
                kind: ViolationKind::MissingBlankLineBeforeDialogue,
                snippet: snippet(pair[1]),
            });
        }
    }

    FormattingReport { violations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strip_bold_then_italic() {
        assert_eq!(strip_bold("a **bold** word"), "a bold word");
        assert_eq!(strip_bold("__strong__ start"), "strong start");
        assert_eq!(strip_italic("an *italic* word"), "an italic word");
        assert_eq!(strip_italic("an _italic_ word"), "an italic word");
        assert_eq!(strip_italic("keep snake_case_names"), "keep snake_case_names");
        assert_eq!(strip_italic(&strip_bold("***both***")), "both");
    }

    #[test]
    fn test_dialogue_followed_by_text() {
        assert_eq!(
            separate_dialogue_from_trailing_text("\"Hello,\" she said."),
            "\"Hello,\"\n\nshe said."
        );
        assert_eq!(
            separate_dialogue_from_trailing_text("\u{201C}Go!\u{201D} He ran."),
            "\u{201C}Go!\u{201D}\n\nHe ran."
        );
    }

    #[test]
    fn test_narrative_before_dialogue() {
        assert_eq!(
            separate_narrative_from_dialogue("He stopped. \"Wait.\""),
            "He stopped.\n\n\"Wait.\""
        );
    }

    #[test]
    fn test_attribution_before_dialogue() {
        assert_eq!(
            separate_attribution_from_dialogue("Then she said, \"No.\""),
            "Then she said,\n\n\"No.\""
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\n\nb"), "a\n\n\nb");
        assert_eq!(collapse_blank_lines("a\n \n\t\n \n\nb"), "a\n\nb");
    }

    #[test]
    fn test_blank_line_before_dialogue_line() {
        assert_eq!(
            ensure_blank_line_before_dialogue("The door opened.\n\"Who's there?\""),
            "The door opened.\n\n\"Who's there?\""
        );
        assert_eq!(
            ensure_blank_line_before_dialogue("\"First line.\""),
            "\"First line.\""
        );
    }

    #[test]
    fn test_scenario_two_dialogue_blocks() {
        let formatted = format_text("\"Hello,\" she said. \"Wait!\" He turned.");
        let blocks: Vec<&str> = formatted.split("\n\n").collect();
        assert_eq!(
            blocks,
            vec!["\"Hello,\"", "she said.", "\"Wait!\"", "He turned."]
        );

        let dialogue_blocks: Vec<&&str> =
            blocks.iter().filter(|b| b.starts_with('"')).collect();
        assert_eq!(dialogue_blocks.len(), 2);
        for block in dialogue_blocks {
            assert!(block.ends_with('"'), "trailing text in {:?}", block);
        }
        assert!(validate_dialogue_spacing(&formatted).is_valid());
    }

    #[test]
    fn test_validator_reports_without_failing() {
        let report = validate_dialogue_spacing("**Loud** words. \"Hi,\" he said.\nNext\n\"Yo.\"");
        assert!(!report.is_valid());
        assert!(report.count_of(ViolationKind::EmphasisMarker) >= 1);
        assert_eq!(report.count_of(ViolationKind::NarrativeBeforeDialogue), 1);
        assert_eq!(report.count_of(ViolationKind::DialogueFollowedByText), 1);
        assert_eq!(
            report.count_of(ViolationKind::MissingBlankLineBeforeDialogue),
            1
        );
    }

    #[test]
    fn test_crlf_normalized() {
        assert_eq!(format_text("a\r\nb"), "a\nb");
    }

    #[test]
    fn test_plain_text_untouched() {
        let text = "The wind rose over the hills.\n\nNobody spoke.";
        assert_eq!(format_text(text), text);
    }

    proptest! {
        #[test]
        fn prop_format_is_idempotent(
            text in "[a-zA-Z ,.!?\"\u{201C}\u{201D}*_\n\t]{0,80}"
        ) {
            let once = format_text(&text);
            let twice = format_text(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_formatted_text_validates(
            text in "[a-zA-Z ,.!?\"\u{201C}\u{201D}*_\n\t]{0,80}"
        ) {
            let report = validate_dialogue_spacing(&format_text(&text));
            prop_assert!(report.is_valid(), "{:?}", report);
        }

        #[test]
        fn prop_format_any_text_is_idempotent(text in "\\PC{0,60}") {
            let once = format_text(&text);
            prop_assert_eq!(format_text(&once), once);
        }
    }
}
