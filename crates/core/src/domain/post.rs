use crate::domain::draft::GeneratedDraft;
use crate::time::clock::display_date;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const IMAGE_URL_PREFIX: &str = "https://picsum.photos/seed";
const IMAGE_SIZE: &str = "800/400";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Forex,
    Crypto,
    Stocks,
    #[serde(rename = "Technical Analysis")]
    TechnicalAnalysis,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Forex,
        Category::Crypto,
        Category::Stocks,
        Category::TechnicalAnalysis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Forex => "Forex",
            Category::Crypto => "Crypto",
            Category::Stocks => "Stocks",
            Category::TechnicalAnalysis => "Technical Analysis",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow::anyhow!("unknown category: {s}"))
    }
}

/// A published article. Stored newest-first; never edited after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    /// Markdown body.
    pub content: String,
    pub author: String,
    pub date: String,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
    pub category: Category,
    pub tags: Vec<String>,
    pub image_url: String,
    #[serde(default)]
    pub youtube_promo: bool,
}

/// Fallbacks applied when a draft leaves a field out.
#[derive(Debug, Clone, Copy)]
pub struct PostDefaults {
    pub author: &'static str,
    pub title: &'static str,
    pub category: Category,
}

impl PostDefaults {
    /// Scheduled tick.
    pub const AUTO: PostDefaults = PostDefaults {
        author: "TradeNexus AutoBot",
        title: "Market Update",
        category: Category::Forex,
    };

    /// Operator-forced auto-blog run.
    pub const AUTO_FORCED: PostDefaults = PostDefaults {
        author: "TradeNexus AutoBot",
        title: "Auto Update",
        category: Category::TechnicalAnalysis,
    };

    /// Operator generation for a chosen topic.
    pub const MANUAL: PostDefaults = PostDefaults {
        author: "AI Analyst (Admin)",
        title: "Untitled",
        category: Category::Forex,
    };
}

impl BlogPost {
    pub fn from_draft(
        draft: GeneratedDraft,
        defaults: PostDefaults,
        timestamp: i64,
        image_seed: u64,
    ) -> Self {
        let category = draft
            .category
            .as_deref()
            .and_then(|c| c.parse::<Category>().ok())
            .unwrap_or(defaults.category);

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: draft
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| defaults.title.to_string()),
            excerpt: draft.excerpt.unwrap_or_default(),
            content: draft.content.unwrap_or_default(),
            author: defaults.author.to_string(),
            date: display_date(timestamp),
            timestamp,
            category,
            tags: draft.tags.unwrap_or_default(),
            image_url: image_url(&image_seed.to_string()),
            youtube_promo: true,
        }
    }
}

pub fn image_url(seed: &str) -> String {
    format!("{IMAGE_URL_PREFIX}/{seed}/{IMAGE_SIZE}")
}

const DAY_MILLIS: i64 = 86_400_000;

/// Example posts written on first access to an empty store.
pub fn seed_posts(now_millis: i64) -> Vec<BlogPost> {
    let yesterday = now_millis - DAY_MILLIS;
    vec![
        BlogPost {
            id: "1".to_string(),
            title: "EUR/USD Technical Analysis: Breaking the 1.10 Resistance".to_string(),
            excerpt: "Deep dive into the Euro strength against the Dollar with support levels and pivot points analysis.".to_string(),
            content: [
                "# EUR/USD Market Outlook",
                "",
                "The Euro has shown significant resilience against the US Dollar this week. Our technical analysis suggests a bullish momentum if the pair can sustain above the 1.0950 level.",
                "",
                "## Key Technical Levels",
                "* **Support:** 1.0880",
                "* **Resistance:** 1.1020",
                "",
                "## Trade Setup",
                "Traders should watch for a breakout above 1.1020 for a long entry targeting 1.1150. Conversely, a rejection here could see a retest of 1.0880.",
                "",
                "> **Trade Maven Tip:** Always manage your risk. Watch our latest video on \"Risk Management Strategies\" on the [Trade Maven YouTube Channel](https://youtube.com) for more insights.",
            ]
            .join("\n"),
            author: "AI Analyst".to_string(),
            date: display_date(now_millis),
            timestamp: now_millis,
            category: Category::Forex,
            tags: vec!["EURUSD".into(), "Forex".into(), "Technical Analysis".into()],
            image_url: image_url("eurusd"),
            youtube_promo: true,
        },
        BlogPost {
            id: "2".to_string(),
            title: "Bitcoin (BTC) Price Action: Is the Bull Run Over?".to_string(),
            excerpt: "Analyzing the recent crypto market correction and what it means for altcoins.".to_string(),
            content: [
                "# Bitcoin Market Update",
                "",
                "Bitcoin faced a sharp rejection at $68,000, leading to a broader market correction. However, on-chain data suggests accumulation by whales is continuing.",
                "",
                "## Support Zones",
                "The $60,000 psychological level remains critical. A daily close below this could trigger further downside to $52,000.",
                "",
                "## Market Sentiment",
                "Fear and Greed index has dropped to Neutral, suggesting the market is resetting before the next leg up.",
                "",
                "For real-time updates and live trading sessions, subscribe to **Trade Maven** on YouTube.",
            ]
            .join("\n"),
            author: "AI Analyst".to_string(),
            date: display_date(yesterday),
            timestamp: yesterday,
            category: Category::Crypto,
            tags: vec!["Bitcoin".into(), "Crypto".into(), "BTC".into()],
            image_url: image_url("bitcoin"),
            youtube_promo: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_uses_display_names_on_the_wire() {
        let v = serde_json::to_value(Category::TechnicalAnalysis).unwrap();
        assert_eq!(v, json!("Technical Analysis"));
        let c: Category = serde_json::from_value(json!("Crypto")).unwrap();
        assert_eq!(c, Category::Crypto);
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!("technical analysis".parse::<Category>().unwrap(), Category::TechnicalAnalysis);
        assert!("Commodities".parse::<Category>().is_err());
    }

    #[test]
    fn post_serializes_with_camel_case_keys() {
        let post = &seed_posts(1_700_000_000_000)[0];
        let v = serde_json::to_value(post).unwrap();
        assert_eq!(v["imageUrl"], json!("https://picsum.photos/seed/eurusd/800/400"));
        assert_eq!(v["youtubePromo"], json!(true));
        assert_eq!(v["timestamp"], json!(1_700_000_000_000i64));
    }

    #[test]
    fn missing_promo_flag_reads_as_false() {
        let v = json!({
            "id": "x",
            "title": "t",
            "excerpt": "",
            "content": "",
            "author": "a",
            "date": "1/1/2026",
            "timestamp": 0,
            "category": "Stocks",
            "tags": [],
            "imageUrl": "u",
        });
        let post: BlogPost = serde_json::from_value(v).unwrap();
        assert!(!post.youtube_promo);
    }

    #[test]
    fn from_draft_applies_defaults() {
        let post = BlogPost::from_draft(GeneratedDraft::default(), PostDefaults::AUTO, 0, 42);
        assert_eq!(post.title, "Market Update");
        assert_eq!(post.author, "TradeNexus AutoBot");
        assert_eq!(post.category, Category::Forex);
        assert_eq!(post.image_url, "https://picsum.photos/seed/42/800/400");
        assert!(post.tags.is_empty());
        assert!(post.youtube_promo);
        assert_eq!(post.date, "1/1/1970");
    }

    #[test]
    fn from_draft_keeps_generated_fields() {
        let draft = GeneratedDraft {
            title: Some("Gold Breaks Out".into()),
            excerpt: Some("Short.".into()),
            content: Some("# Gold".into()),
            tags: Some(vec!["XAUUSD".into()]),
            category: Some("Stocks".into()),
        };
        let post = BlogPost::from_draft(draft, PostDefaults::MANUAL, 5, 1);
        assert_eq!(post.title, "Gold Breaks Out");
        assert_eq!(post.content, "# Gold");
        assert_eq!(post.category, Category::Stocks);
        assert_eq!(post.tags, vec!["XAUUSD".to_string()]);
        assert_eq!(post.author, "AI Analyst (Admin)");
    }

    #[test]
    fn unknown_category_falls_back() {
        let draft = GeneratedDraft {
            category: Some("Commodities".into()),
            ..Default::default()
        };
        let post = BlogPost::from_draft(draft, PostDefaults::AUTO_FORCED, 0, 0);
        assert_eq!(post.category, Category::TechnicalAnalysis);
        assert_eq!(post.title, "Auto Update");
    }

    #[test]
    fn seed_posts_are_newest_first() {
        let posts = seed_posts(1_700_000_000_000);
        assert_eq!(posts.len(), 2);
        assert!(posts[0].timestamp > posts[1].timestamp);
        assert_eq!(posts[1].category, Category::Crypto);
    }
}
