use tracing::debug;

/// User agent fragments of link-preview bots and crawlers. Matching is
/// case-insensitive substring search.
const PREVIEW_BOT_PATTERNS: &[&str] = &[
    // Messaging apps
    "WhatsApp",
    "facebookexternalhit",
    "FacebookBot",
    "Twitterbot",
    "Twitter",
    "TelegramBot",
    "Slackbot",
    "LinkedInBot",
    "DiscordBot",
    "SkypeUriPreview",
    // Social media crawlers
    "Pinterest",
    "Instagram",
    // Search engines
    "Googlebot",
    "Bingbot",
    "Slurp",
    "DuckDuckBot",
    "Baiduspider",
    "YandexBot",
    // Other crawlers
    "Embedly",
    "Applebot",
    "redditbot",
    "Tumblr",
    "bitlybot",
    "vkShare",
    "quora link preview",
    "developers.google.com/+/web/snippet",
    "rogerbot",
    "showyoubot",
    "outbrain",
    "Lighthouse",
    // Generic indicators
    "crawler",
    "spider",
    "bot",
    "preview",
    "scraper",
    "http",
    "axios",
    "curl",
    "wget",
];

/// Whether a request comes from a link-preview bot or crawler.
/// A missing user agent counts as a bot.
pub fn is_preview_bot(user_agent: Option<&str>) -> bool {
    let Some(user_agent) = user_agent else {
        return true;
    };

    let lower = user_agent.to_lowercase();
    PREVIEW_BOT_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

/// Classifies a user agent, logging the result when `verbose` is set
pub fn classify(user_agent: Option<&str>, verbose: bool) -> bool {
    let is_bot = is_preview_bot(user_agent);
    if verbose {
        let truncated: Option<String> = user_agent.map(|ua| ua.chars().take(100).collect());
        debug!(user_agent = ?truncated, is_bot, "Bot detection");
    }
    is_bot
}
