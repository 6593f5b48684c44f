// Bundled demo content, served whenever a content endpoint can't be reached.
use crate::content::{DailyTweetItem, DummyPost, Featured, Id, TopicBlock, TopicItem};

const CATEGORIES: [&str; 8] = [
    "Daily Tweet",
    "CV_Portfolio",
    "Dr. CK's Pick",
    "Inspiration",
    "Reading Design",
    "Vibe Coding w AI",
    "Research Projects",
    "Playing with AI",
];

fn post(id: &str, category: &str, title: &str, dek: &str, date: &str, badge: Option<&str>) -> DummyPost {
    DummyPost {
        id: id.to_string(),
        category: category.to_string(),
        title: title.to_string(),
        dek: dek.to_string(),
        date: date.to_string(),
        badge: badge.map(str::to_string),
        slug: None,
        thumb: None,
    }
}

pub fn featured() -> Featured {
    let lead = post(
        "lead-1",
        "Dr. CK's Pick",
        "Aesthetic Intelligence: how taste becomes knowledge",
        "One lead story fixes the direction of the page; the cards after it open the paths to explore.",
        "2025-12-27",
        Some("Editor's Lead"),
    );
    let picks = vec![
        post(
            "pick-1",
            "Research Projects",
            "Inclusive Futures research notes #12",
            "Grouping research projects like a serial on the front page builds trust.",
            "2025-12-25",
            Some("Pick"),
        ),
        post(
            "pick-2",
            "Reading Design",
            "Design Reading: when the problem statement is the answer",
            "One or two lines of dek are enough to read as a magazine rather than a feed.",
            "2025-12-24",
            Some("Pick"),
        ),
        post(
            "pick-3",
            "Vibe Coding w AI",
            "Designing scroll context for a Vite + Django site",
            "The hero takes the full viewport, everything below scrolls with the body.",
            "2025-12-23",
            Some("Pick"),
        ),
        post(
            "pick-4",
            "Playing with AI",
            "Prompt experiments: a gallery as a visual essay",
            "Treating generated images as a collection keeps the tone coherent.",
            "2025-12-22",
            Some("Pick"),
        ),
    ];
    Featured { lead, picks }
}

pub fn daily_tweets() -> Vec<DailyTweetItem> {
    [
        "Note of the day: a magazine is edited, not sorted.",
        "The hero makes the impression, the body sets the rhythm.",
        "Two lines of dek change the whole card.",
        "Whitespace between sections is the quality.",
        "Topic blocks live or die by their \"more\" link.",
    ]
    .iter()
    .enumerate()
    .map(|(i, text)| DailyTweetItem {
        id: Id::Text(format!("dt-demo-{}", i + 1)),
        title: String::new(),
        text: text.to_string(),
        date: None,
        slug: None,
        thumb: None,
    })
    .collect()
}

fn topic_items(category: &str, seed: usize) -> Vec<TopicItem> {
    (0..6)
        .map(|i| TopicItem {
            id: Id::Text(format!("{category}-item-{}", i + 1)),
            slug: None,
            title: format!("{category}: Story #{}", i + 1),
            dek: Some("Show four to six stories per topic and send the rest through \"more\".".to_string()),
            category: Some(category.to_string()),
            date: Some(format!("2025-12-{:02}", 12 + (seed + i) % 10)),
            thumb: None,
        })
        .collect()
}

pub fn topics() -> Vec<TopicBlock> {
    [("play", "Playing with AI", 10), ("vibe", "Vibe Coding w AI", 20), ("research", "Research Projects", 30), ("read", "Reading", 40)]
        .into_iter()
        .map(|(key, title, seed)| TopicBlock {
            key: key.to_string(),
            title: title.to_string(),
            more_href: None,
            items: topic_items(title, seed),
        })
        .collect()
}

pub fn inspiration() -> Vec<DummyPost> {
    (0..10)
        .map(|i| {
            post(
                &format!("insp-{}", i + 1),
                "Inspiration",
                &format!("Inspiration: Visual Note #{}", i + 1),
                "Varying card spans in the mosaic makes the section feel edited.",
                &format!("2025-12-{:02}", 1 + i % 9),
                None,
            )
        })
        .collect()
}

pub fn latest() -> Vec<DummyPost> {
    (0..12)
        .map(|i| {
            post(
                &format!("latest-{}", i + 1),
                CATEGORIES[i % CATEGORIES.len()],
                &format!("Latest Story #{}: Magazine layout experiment", i + 1),
                "A grid reads like a magazine when it varies, not when it is uniform.",
                &format!("2025-12-{:02}", 20 + i % 7),
                None,
            )
        })
        .collect()
}

pub fn portfolio() -> Vec<DummyPost> {
    [
        ("pf-1", "Aesthetic Intelligence Research Institute: Overview", "2025-11-10"),
        ("pf-2", "Design Concerto: Travel Narrative System", "2025-10-18"),
        ("pf-3", "AI + Design Education: Curriculum Kit", "2025-09-02"),
        ("pf-4", "Web3D Hero Prototype: Interaction Study", "2025-08-21"),
        ("pf-5", "Coffee Education Platform: Piubarista", "2025-07-07"),
        ("pf-6", "Inclusive Futures: Prototype Archive", "2025-06-12"),
    ]
    .into_iter()
    .map(|(id, title, date)| post(id, "CV_Portfolio", title, "Selected work, pinned.", date, Some("Pinned")))
    .collect()
}
