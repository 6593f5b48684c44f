// Client for the site's JSON content endpoints.
// Every section degrades to the bundled demo content on any failure, so a
// page built from this never shows an error, only older text.
use std::fmt;
use std::sync::Arc;

use log::{error, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::feed::CancelToken;
use crate::fixtures;
use crate::transport::{Request, Transport};

/// Numeric or string id; the API uses both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Num(i64),
    Text(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Num(n) => write!(f, "{n}"),
            Id::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DummyPost {
    pub id: String,
    pub category: String,
    pub title: String,
    pub dek: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicItem {
    pub id: Id,
    #[serde(default)]
    pub slug: Option<String>,
    pub title: String,
    #[serde(default)]
    pub dek: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub thumb: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicBlock {
    pub key: String,
    pub title: String,
    #[serde(rename = "moreHref", default)]
    pub more_href: Option<String>,
    pub items: Vec<TopicItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyTweetItem {
    pub id: Id,
    #[serde(default)]
    pub title: String,
    /// Plain-text summary.
    pub text: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    /// Absolute or site-relative image URL.
    #[serde(default)]
    pub thumb: Option<String>,
}

/// A post as the featured endpoint returns it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DbPost {
    pub id: i64,
    pub slug: String,
    pub badge: String,
    pub category: String,
    pub date: String,
    pub title: String,
    pub dek: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub hits: Option<u64>,
}

impl From<DbPost> for DummyPost {
    fn from(p: DbPost) -> Self {
        DummyPost {
            id: p.id.to_string(),
            category: p.category,
            title: p.title,
            dek: p.dek,
            date: p.date,
            badge: Some(p.badge),
            slug: Some(p.slug),
            thumb: p.image,
        }
    }
}

/// Which posts the featured block shows; `pick_ids` is comma separated.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct FeaturedConfig {
    pub lead_id: String,
    pub pick_ids: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Featured {
    pub lead: DummyPost,
    pub picks: Vec<DummyPost>,
}

#[derive(Deserialize)]
struct Items<T> {
    items: Vec<T>,
}

#[derive(Deserialize)]
struct Topics {
    topics: Vec<TopicBlock>,
}

#[derive(Deserialize)]
struct FeaturedEnvelope {
    #[serde(rename = "featuredLead")]
    featured_lead: DbPost,
    picks: Vec<DbPost>,
}

#[derive(Deserialize)]
struct FeaturedConfigFile {
    featured: FeaturedConfig,
}

/// `application/x-www-form-urlencoded` query string, as browsers build it.
pub fn encode_query(pairs: &[(&str, &str)]) -> String {
    fn encode(out: &mut String, s: &str) {
        for b in s.bytes() {
            match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'*' | b'-' | b'.' | b'_' => out.push(b as char),
                b' ' => out.push('+'),
                _ => out.push_str(&format!("%{b:02X}")),
            }
        }
    }

    let mut out = String::new();
    for (i, (k, v)) in pairs.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        encode(&mut out, k);
        out.push('=');
        encode(&mut out, v);
    }
    out
}

pub mod endpoints {
    use super::{FeaturedConfig, encode_query};

    pub const INSPIRATION: &str = "/api/news/inspiration/";
    pub const PORTFOLIO: &str = "/api/news/portfolio/";
    pub const FEATURED_CONFIG: &str = "/media/a14u/config.json";
    pub const GENERATED_IMAGES: &str = "/api/generated-images";

    pub fn daily_tweets(limit: usize) -> String {
        format!("/api/news/daily-tweets/?limit={limit}")
    }

    pub fn topics(limit: usize) -> String {
        format!("/api/news/topics/?limit={limit}")
    }

    pub fn featured(config: &FeaturedConfig) -> String {
        let query = encode_query(&[("lead_id", &config.lead_id), ("pick_ids", &config.pick_ids)]);
        format!("/api/news/featured/?{query}")
    }
}

/// GET `path` and decode a JSON body. Non-2xx is `Error::Transport`,
/// an unexpected body is `Error::Json`.
pub(crate) fn get_json<T: DeserializeOwned>(transport: &dyn Transport, path: &str) -> Result<T> {
    let body = transport.get(&Request::json(path))?.into_body(path)?;
    Ok(serde_json::from_slice(&body)?)
}

fn or_demo<T>(section: &str, fetched: Result<T>, demo: impl FnOnce() -> T) -> T {
    fetched.unwrap_or_else(|e| {
        error!("{section} API failed, using demo data: {e}");
        demo()
    })
}

/// Everything the front page shows below the hero.
#[derive(Clone, Debug, PartialEq)]
pub struct FrontPage {
    pub featured: Featured,
    pub daily_tweets: Vec<DailyTweetItem>,
    pub topics: Vec<TopicBlock>,
    pub inspiration: Vec<DummyPost>,
    pub latest: Vec<DummyPost>,
    pub portfolio: Vec<DummyPost>,
}

/// Section limit the front page asks for.
pub const FRONT_PAGE_LIMIT: usize = 12;

#[derive(Clone)]
pub struct ContentClient {
    transport: Arc<dyn Transport>,
}

impl ContentClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn try_daily_tweets(&self, limit: usize) -> Result<Vec<DailyTweetItem>> {
        get_json::<Items<_>>(self.transport.as_ref(), &endpoints::daily_tweets(limit)).map(|e| e.items)
    }

    pub fn try_topics(&self, limit: usize) -> Result<Vec<TopicBlock>> {
        get_json::<Topics>(self.transport.as_ref(), &endpoints::topics(limit)).map(|e| e.topics)
    }

    pub fn try_inspiration(&self) -> Result<Vec<DummyPost>> {
        get_json::<Items<_>>(self.transport.as_ref(), endpoints::INSPIRATION).map(|e| e.items)
    }

    pub fn try_portfolio(&self) -> Result<Vec<DummyPost>> {
        get_json::<Items<_>>(self.transport.as_ref(), endpoints::PORTFOLIO).map(|e| e.items)
    }

    /// Reads the selection from the site config file, then asks for it.
    pub fn try_featured(&self) -> Result<Featured> {
        let file: FeaturedConfigFile = get_json(self.transport.as_ref(), endpoints::FEATURED_CONFIG)?;
        let envelope: FeaturedEnvelope = get_json(self.transport.as_ref(), &endpoints::featured(&file.featured))?;
        Ok(Featured {
            lead: envelope.featured_lead.into(),
            picks: envelope.picks.into_iter().map(Into::into).collect(),
        })
    }

    pub fn daily_tweets(&self, limit: usize) -> Vec<DailyTweetItem> {
        or_demo("daily tweets", self.try_daily_tweets(limit), fixtures::daily_tweets)
    }

    pub fn topics(&self, limit: usize) -> Vec<TopicBlock> {
        or_demo("topics", self.try_topics(limit), fixtures::topics)
    }

    pub fn inspiration(&self) -> Vec<DummyPost> {
        or_demo("inspiration", self.try_inspiration(), fixtures::inspiration)
    }

    pub fn portfolio(&self) -> Vec<DummyPost> {
        or_demo("portfolio", self.try_portfolio(), fixtures::portfolio)
    }

    pub fn featured(&self) -> Featured {
        or_demo("featured", self.try_featured(), fixtures::featured)
    }

    /// Fetch every section. Sections are requested one after another and
    /// the token is checked between them; once cancelled, nothing fetched
    /// so far is returned.
    pub fn load_front_page(&self, cancel: &CancelToken) -> Result<FrontPage> {
        cancel.check()?;
        let featured = self.featured();
        cancel.check()?;
        let daily_tweets = self.daily_tweets(FRONT_PAGE_LIMIT);
        cancel.check()?;
        let topics = self.topics(FRONT_PAGE_LIMIT);
        cancel.check()?;
        let inspiration = self.inspiration();
        cancel.check()?;
        let portfolio = self.portfolio();
        cancel.check()?;

        info!("front page loaded: {} tweets, {} topic blocks", daily_tweets.len(), topics.len());
        Ok(FrontPage { featured, daily_tweets, topics, inspiration, latest: fixtures::latest(), portfolio })
    }
}
