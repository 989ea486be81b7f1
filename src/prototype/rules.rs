// Keyword rule tables
// Ordered (keywords, label) rules evaluated against a cleaned cluster summary


use std::sync::LazyLock;

use fancy_regex::Regex;

pub const MAX_KEY_PHRASES: usize = 10;
pub const MAX_CATEGORIES: usize = 10;
const MIN_DISTINCT_PHRASES: usize = 5;
const TAGS_FOR_CATEGORIES: usize = 10;
const TAGS_FOR_STRATEGY: usize = 5;
const HIGH_TRAFFIC_SIZE: usize = 200;
const MEDIUM_TRAFFIC_SIZE: usize = 100;

/// A label that applies when the text contains any of the keywords.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub keywords: &'static [&'static str],
    /// Extra keyword that must also be present, if any.
    pub requires: Option<&'static str>,
    pub label: &'static str,
}

impl Rule {
    const fn any(keywords: &'static [&'static str], label: &'static str) -> Self {
        Self {
            keywords,
            requires: None,
            label,
        }
    }

    /// `text` is expected to be lower-cased already.
    #[inline]
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k))
            && self.requires.is_none_or(|k| text.contains(k))
    }
}

const ORDER: &[&str] = &["订单", "order", "tracking"];

/// First match wins.
pub const BEHAVIOR_RULES: &[Rule] = &[
    Rule {
        keywords: ORDER,
        requires: Some("查询"),
        label: "order query and tracking needs",
    },
    Rule::any(ORDER, "order management intent"),
    Rule::any(
        &["账户", "account", "login", "登录"],
        "account management and login needs",
    ),
    Rule::any(
        &["互动", "interactive", "心跳", "heartbeat"],
        "interactive feature exploration",
    ),
    Rule::any(&["收藏", "collectible"], "collectible value oriented"),
    Rule::any(&["配件", "accessories"], "clear accessory needs"),
    Rule::any(&["搜索", "查询", "search"], "active search behavior"),
    Rule::any(&["购买", "buy", "purchase"], "clear purchase intent"),
];
pub const DEFAULT_BEHAVIOR: &str = "information gathering stage";

pub const CATEGORY_RULES: &[Rule] = &[
    Rule::any(&["硅胶", "silicone"], "silicone baby dolls"),
    Rule::any(&["重生", "reborn"], "reborn baby dolls"),
    Rule::any(&["收藏", "collectible"], "collectible dolls"),
    Rule::any(&["配件", "accessories"], "doll accessories"),
];
const CATEGORY_TAG_KEYWORDS: &[&str] = &["doll", "baby", "toy", "collectible"];

pub const ATTRIBUTE_RULES: &[Rule] = &[
    Rule::any(&["尺寸", "size", "12", "16", "20", "inch"], "size"),
    Rule::any(
        &["材质", "material", "硅胶", "silicone", "vinyl", "cloth"],
        "material",
    ),
    Rule::any(
        &[
            "心跳", "heartbeat", "呼吸", "breath", "声音", "sound", "互动", "interactive",
        ],
        "features",
    ),
    Rule::any(
        &["眼睛", "eye", "头发", "hair", "肤色", "skin"],
        "appearance",
    ),
    Rule::any(&["性别", "gender", "boy", "girl", "男孩", "女孩"], "gender"),
];

pub const AUDIENCE_RULES: &[Rule] = &[
    Rule::any(&["收藏", "collector"], "collectors"),
    Rule::any(&["儿童", "kids", "children"], "parents of children"),
    Rule::any(&["礼物", "gift"], "gift buyers"),
    Rule::any(&["账户", "订单", "account", "order"], "existing customers"),
];
pub const DEFAULT_AUDIENCE: &str = "consumers interested in realistic baby dolls";

pub const CONTENT_RULES: &[Rule] = &[
    Rule::any(
        &["搜索", "查询", "search"],
        "optimize SEO keywords to match search intent",
    ),
    Rule::any(
        &["细节", "特征", "detail"],
        "high-quality content highlighting product details and features",
    ),
    Rule::any(
        &["互动", "功能", "interactive"],
        "videos and images showing interactive features",
    ),
    Rule::any(
        &["收藏", "collectible"],
        "emphasize collectible value and limited editions",
    ),
];

pub const CONVERSION_RULES: &[Rule] = &[
    Rule::any(
        &["购买", "订单", "buy", "order"],
        "clear purchase intent, offer a fast checkout path",
    ),
    Rule::any(
        &["详情", "规格", "detail", "specification"],
        "strong information needs, provide detailed product pages",
    ),
    Rule::any(
        &["比较", "对比", "compare"],
        "comparison needs, provide product comparison tools",
    ),
];
const HIGH_TRAFFIC_OPPORTUNITY: &str = "high-traffic intent, suited for ads and promotions";

/// Keywords that tell clusters apart, tried first.
const DISTINCT_KEYWORDS: &[&str] = &[
    "订单", "账户", "登录", "追踪", "心跳", "呼吸", "声音", "互动", "收藏", "配件", "尺寸",
    "性别", "眼睛", "头发", "材质", "全身硅胶", "布身", "乙烯基", "重生", "写实", "仿真",
    "order", "account", "login", "tracking", "heartbeat", "breathing", "sound", "interactive",
    "collectible", "accessories", "size", "gender", "eyes", "hair", "material", "vinyl",
    "reborn",
];

/// Keywords shared by nearly every cluster, only used to pad a short list.
const COMMON_KEYWORDS: &[&str] = &[
    "逼真", "婴儿", "娃娃", "硅胶", "doll", "baby", "lifelike", "silicone",
];

static BOLD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));
static QUOTED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["“”]([^"“”]+)["“”]"#).expect("valid regex"));

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|existing| existing == value) {
        list.push(value.to_string());
    }
}

fn labels(rules: &[Rule], text: &str) -> Vec<String> {
    rules
        .iter()
        .filter(|rule| rule.matches(text))
        .map(|rule| rule.label.to_string())
        .collect()
}

/// Emphasized phrases followed by distinguishing keywords, deduplicated in order.
///
/// `marked_text` may still contain `**bold**` markup; keyword matching is
/// case-insensitive.
#[inline]
pub fn key_phrases(marked_text: &str) -> Vec<String> {
    let mut phrases = Vec::new();

    for pattern in [&*BOLD_PATTERN, &*QUOTED_PATTERN] {
        for captures in pattern.captures_iter(marked_text).flatten() {
            if let Some(phrase) = captures.get(1) {
                let phrase = phrase.as_str().trim();
                if !phrase.is_empty() {
                    push_unique(&mut phrases, phrase);
                }
            }
        }
    }

    let lower = marked_text.to_lowercase();
    for keyword in DISTINCT_KEYWORDS {
        if lower.contains(keyword) {
            push_unique(&mut phrases, keyword);
        }
    }

    if phrases.len() < MIN_DISTINCT_PHRASES {
        for keyword in COMMON_KEYWORDS {
            if phrases.len() >= MAX_KEY_PHRASES {
                break;
            }
            if lower.contains(keyword) {
                push_unique(&mut phrases, keyword);
            }
        }
    }

    phrases.truncate(MAX_KEY_PHRASES);
    phrases
}

/// The first matching behavior label plus a traffic tier.
#[inline]
pub fn behavior_patterns(summary: &str, size: usize) -> Vec<String> {
    let lower = summary.to_lowercase();
    let behavior = BEHAVIOR_RULES
        .iter()
        .find(|rule| rule.matches(&lower))
        .map_or(DEFAULT_BEHAVIOR, |rule| rule.label);

    let tier = if size > HIGH_TRAFFIC_SIZE {
        "high-traffic intent group"
    } else if size > MEDIUM_TRAFFIC_SIZE {
        "medium-traffic intent group"
    } else {
        "niche intent group"
    };

    vec![behavior.to_string(), tier.to_string()]
}

#[inline]
pub fn product_categories(summary: &str, tags: &[String]) -> Vec<String> {
    let lower = summary.to_lowercase();
    let mut categories = Vec::new();
    for label in labels(CATEGORY_RULES, &lower) {
        push_unique(&mut categories, &label);
    }

    for tag in tags.iter().take(TAGS_FOR_CATEGORIES) {
        let tag_lower = tag.to_lowercase();
        if CATEGORY_TAG_KEYWORDS.iter().any(|k| tag_lower.contains(k)) {
            push_unique(&mut categories, tag);
        }
    }

    categories.truncate(MAX_CATEGORIES);
    categories
}

#[inline]
pub fn product_attributes(summary: &str) -> Vec<String> {
    labels(ATTRIBUTE_RULES, &summary.to_lowercase())
}

#[inline]
pub fn target_audience(summary: &str) -> Vec<String> {
    let audience = labels(AUDIENCE_RULES, &summary.to_lowercase());
    if audience.is_empty() {
        vec![DEFAULT_AUDIENCE.to_string()]
    } else {
        audience
    }
}

#[inline]
pub fn content_strategy(summary: &str, tags: &[String]) -> Vec<String> {
    let mut strategies = labels(CONTENT_RULES, &summary.to_lowercase());
    if !tags.is_empty() {
        let shown: Vec<&str> = tags
            .iter()
            .take(TAGS_FOR_STRATEGY)
            .map(String::as_str)
            .collect();
        strategies.push(format!("use relevant tags: {}", shown.join(", ")));
    }
    strategies
}

#[inline]
pub fn conversion_opportunities(summary: &str, size: usize) -> Vec<String> {
    let mut opportunities = Vec::new();
    if size > MEDIUM_TRAFFIC_SIZE {
        opportunities.push(HIGH_TRAFFIC_OPPORTUNITY.to_string());
    }
    opportunities.extend(labels(CONVERSION_RULES, &summary.to_lowercase()));
    opportunities
}
