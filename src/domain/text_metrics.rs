//! 文本指标提取
//!
//! 纯函数：字数、段落数、叙述/内心独白/对白占比、对白长度合规、
//! 分类标签直方图、感官关键词覆盖、篇幅合规。
//! 不做任何 I/O，不引入随机性，同样的输入总是得到同样的输出。

use serde::{Deserialize, Serialize};

/// 单条对白允许的最大字符数
pub const MAX_DIALOGUE_CHARS: usize = 150;

/// 固定取值集合的分类标签（用于直方图）
pub trait CategoricalTag: Copy + PartialEq + 'static {
    /// 全部取值，决定直方图的键顺序
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;
}

/// 统计字数（至少包含一个字母或数字的空白分隔单元）
pub fn count_words(text: &str) -> usize {
    text.split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count()
}

/// 统计段落数（以空行分隔的非空行块）
pub fn count_paragraphs(text: &str) -> usize {
    let mut count = 0;
    let mut in_paragraph = false;
    for line in text.lines() {
        if line.trim().is_empty() {
            in_paragraph = false;
        } else if !in_paragraph {
            in_paragraph = true;
            count += 1;
        }
    }
    count
}

#[inline]
fn is_opening_quote(ch: char) -> bool {
    ch == '\u{201C}'
}

#[inline]
fn is_closing_quote(ch: char) -> bool {
    ch == '\u{201D}'
}

/// 文本中的一段：对白或叙述
#[derive(Debug, Clone, PartialEq, Eq)]
enum Span {
    Dialogue(String),
    Narration(String),
}

/// 按引号切分一行文本
///
/// 直引号切换状态，弯引号分别表示开/闭；引号本身计入对白。
/// 行尾未闭合的对白视为到行尾结束。
fn split_spans(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;

    for ch in line.chars() {
        let toggles = ch == '"'
            || (is_opening_quote(ch) && !in_quote)
            || (is_closing_quote(ch) && in_quote);

        if toggles && !in_quote {
            if !current.is_empty() {
                spans.push(Span::Narration(std::mem::take(&mut current)));
            }
            current.push(ch);
            in_quote = true;
        } else if toggles {
            current.push(ch);
            spans.push(Span::Dialogue(std::mem::take(&mut current)));
            in_quote = false;
        } else {
            current.push(ch);
        }
    }

    if !current.is_empty() {
        if in_quote {
            spans.push(Span::Dialogue(current));
        } else {
            spans.push(Span::Narration(current));
        }
    }
    spans
}

/// 内心独白的标志词
const THOUGHT_MARKERS: &[&str] = &[
    "thought", "wondered", "realized", "realised", "mused", "pondered", "reckoned",
];

/// 内心独白的标志短语
const THOUGHT_PHRASES: &[&str] = &[
    "told herself",
    "told himself",
    "told themselves",
    "told myself",
    "asked herself",
    "asked himself",
    "asked themselves",
    "asked myself",
];

fn normalize_token(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

fn is_monologue_sentence(sentence: &str) -> bool {
    let lowered = sentence.to_lowercase();
    if THOUGHT_PHRASES.iter().any(|p| lowered.contains(p)) {
        return true;
    }
    sentence
        .split_whitespace()
        .map(normalize_token)
        .any(|t| THOUGHT_MARKERS.contains(&t.as_str()))
}

fn visible_chars(s: &str) -> usize {
    s.chars().filter(|c| !c.is_whitespace()).count()
}

/// 叙述 / 内心独白 / 对白 占比（百分比，按非空白字符计）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceDistribution {
    pub narration_pct: f64,
    pub monologue_pct: f64,
    pub dialogue_pct: f64,
}

impl VoiceDistribution {
    fn from_counts(narration: usize, monologue: usize, dialogue: usize) -> Self {
        let total = narration + monologue + dialogue;
        if total == 0 {
            return Self {
                narration_pct: 0.0,
                monologue_pct: 0.0,
                dialogue_pct: 0.0,
            };
        }
        let pct = |n: usize| n as f64 * 100.0 / total as f64;
        Self {
            narration_pct: pct(narration),
            monologue_pct: pct(monologue),
            dialogue_pct: pct(dialogue),
        }
    }
}

/// 计算叙述/内心独白/对白占比
///
/// 空文本返回全 0（不会出现 NaN）
pub fn voice_distribution(text: &str) -> VoiceDistribution {
    let mut narration = 0;
    let mut monologue = 0;
    let mut dialogue = 0;

    for line in text.lines() {
        for span in split_spans(line) {
            match span {
                Span::Dialogue(s) => dialogue += visible_chars(&s),
                Span::Narration(s) => {
                    for sentence in s.split_inclusive(|c: char| matches!(c, '.' | '!' | '?')) {
                        let n = visible_chars(sentence);
                        if is_monologue_sentence(sentence) {
                            monologue += n;
                        } else {
                            narration += n;
                        }
                    }
                }
            }
        }
    }

    VoiceDistribution::from_counts(narration, monologue, dialogue)
}

/// 提取全部对白单元（去掉引号）
pub fn dialogue_units(text: &str) -> Vec<String> {
    text.lines()
        .flat_map(split_spans)
        .filter_map(|span| match span {
            Span::Dialogue(s) => {
                let inner = s
                    .trim_matches(|c: char| c == '"' || is_opening_quote(c) || is_closing_quote(c))
                    .trim()
                    .to_string();
                if inner.is_empty() {
                    None
                } else {
                    Some(inner)
                }
            }
            Span::Narration(_) => None,
        })
        .collect()
}

/// 对白长度合规
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DialogueCompliance {
    pub units: usize,
    pub compliant: usize,
    pub max_chars: usize,
    /// 合规比例；没有对白时为 1.0
    pub ratio: f64,
}

/// 逐条检查对白是否超过字符上限
pub fn dialogue_compliance(text: &str, max_chars: usize) -> DialogueCompliance {
    let units = dialogue_units(text);
    let compliant = units
        .iter()
        .filter(|u| u.chars().count() <= max_chars)
        .count();
    let ratio = if units.is_empty() {
        1.0
    } else {
        compliant as f64 / units.len() as f64
    };
    DialogueCompliance {
        units: units.len(),
        compliant,
        max_chars,
        ratio,
    }
}

/// 直方图中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// 分类标签直方图（键顺序固定为标签定义顺序）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagHistogram {
    pub counts: Vec<TagCount>,
    /// 未标注的单元数
    pub untagged: usize,
    pub total: usize,
}

impl TagHistogram {
    pub fn count_of(&self, tag: &str) -> usize {
        self.counts
            .iter()
            .find(|c| c.tag == tag)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    /// 出现过的不同标签数
    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|c| c.count > 0).count()
    }
}

/// 按有序子单元统计标签分布
pub fn tag_histogram<T, I>(tags: I) -> TagHistogram
where
    T: CategoricalTag,
    I: IntoIterator<Item = Option<T>>,
{
    let mut counts: Vec<TagCount> = T::ALL
        .iter()
        .map(|t| TagCount {
            tag: t.as_str().to_string(),
            count: 0,
        })
        .collect();
    let mut untagged = 0;
    let mut total = 0;

    for tag in tags {
        total += 1;
        match tag.and_then(|t| T::ALL.iter().position(|a| *a == t)) {
            Some(pos) => counts[pos].count += 1,
            None => untagged += 1,
        }
    }

    TagHistogram {
        counts,
        untagged,
        total,
    }
}

/// 五种感官
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    Sight,
    Sound,
    Smell,
    Touch,
    Taste,
}

impl CategoricalTag for Sense {
    const ALL: &'static [Self] = &[
        Sense::Sight,
        Sense::Sound,
        Sense::Smell,
        Sense::Touch,
        Sense::Taste,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Sense::Sight => "sight",
            Sense::Sound => "sound",
            Sense::Smell => "smell",
            Sense::Touch => "touch",
            Sense::Taste => "taste",
        }
    }
}

impl Sense {
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Sense::Sight => &[
                "see", "saw", "seen", "look", "looked", "glance", "glanced", "glimpse",
                "gleam", "glow", "glowed", "shadow", "shadows", "bright", "dim", "color",
                "colour", "light", "flicker", "flickered", "stare", "stared", "watch",
                "watched",
            ],
            Sense::Sound => &[
                "hear", "heard", "sound", "whisper", "whispered", "echo", "echoed", "roar",
                "hum", "hummed", "creak", "creaked", "silence", "loud", "quiet", "ring",
                "rang", "crack", "thud",
            ],
            Sense::Smell => &[
                "smell", "smelled", "scent", "odor", "odour", "aroma", "stench",
                "fragrance", "perfume", "smoke", "musty", "reek", "whiff",
            ],
            Sense::Touch => &[
                "touch", "touched", "rough", "smooth", "cold", "warm", "heat", "chill",
                "soft", "sharp", "texture", "brush", "brushed", "grip", "gripped",
                "pressed",
            ],
            Sense::Taste => &[
                "taste", "tasted", "bitter", "sweet", "sour", "salty", "savory", "flavor",
                "flavour", "tongue", "metallic", "honey",
            ],
        }
    }
}

/// 单个感官的命中数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenseCount {
    pub sense: Sense,
    pub hits: usize,
}

/// 感官关键词覆盖
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensoryCoverage {
    pub counts: Vec<SenseCount>,
    pub senses_covered: usize,
    /// senses_covered / 5
    pub coverage: f64,
}

/// 统计感官关键词覆盖情况
pub fn sensory_coverage(text: &str) -> SensoryCoverage {
    let tokens: Vec<String> = text.split_whitespace().map(normalize_token).collect();

    let counts: Vec<SenseCount> = Sense::ALL
        .iter()
        .map(|sense| {
            let keywords = sense.keywords();
            let hits = tokens
                .iter()
                .filter(|t| keywords.contains(&t.as_str()))
                .count();
            SenseCount { sense: *sense, hits }
        })
        .collect();

    let senses_covered = counts.iter().filter(|c| c.hits > 0).count();
    SensoryCoverage {
        coverage: senses_covered as f64 / Sense::ALL.len() as f64,
        counts,
        senses_covered,
    }
}

/// 目标字数区间（闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRange {
    pub min: usize,
    pub max: usize,
}

impl WordRange {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, words: usize) -> bool {
        words >= self.min && words <= self.max
    }
}

/// 篇幅合规
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LengthCompliance {
    pub word_count: usize,
    pub paragraph_count: usize,
    pub target: WordRange,
    pub within_target: bool,
    /// 每段平均字数；没有段落时为 0
    pub avg_words_per_paragraph: f64,
}

/// 计算篇幅合规
pub fn length_compliance(text: &str, target: WordRange) -> LengthCompliance {
    let word_count = count_words(text);
    let paragraph_count = count_paragraphs(text);
    let avg_words_per_paragraph = if paragraph_count == 0 {
        0.0
    } else {
        word_count as f64 / paragraph_count as f64
    };
    LengthCompliance {
        word_count,
        paragraph_count,
        target,
        within_target: target.contains(word_count),
        avg_words_per_paragraph,
    }
}
