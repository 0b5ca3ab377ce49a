use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot
/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: tusabot.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "tusabot.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: tusabot.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "tusabot.log".to_string()));

/// Admin configuration
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    fn parse_admin_ids(raw: &str) -> Vec<i64> {
        raw.split([',', ' ', '\n', '\t'])
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect()
    }

    /// Admin user IDs (comma-separated)
    /// Read from ADMIN_IDS environment variable
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .ok()
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default()
    });

    /// Primary admin user ID for direct notifications (startup, broadcast reports)
    /// Read from ADMIN_USER_ID or fallback to first ADMIN_IDS entry
    /// Defaults to 0 if not set (no admin notifications)
    pub static ADMIN_USER_ID: Lazy<i64> = Lazy::new(|| {
        env::var("ADMIN_USER_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .or_else(|| ADMIN_IDS.first().copied())
            .unwrap_or(0)
    });

    /// Returns true if the given Telegram user id belongs to an admin.
    pub fn is_admin(user_id: i64) -> bool {
        ADMIN_IDS.contains(&user_id)
    }

}

/// Telegram channel configuration
pub mod channels {
    use once_cell::sync::Lazy;
    use std::env;

    /// Normalizes a channel reference from env into something the Bot API accepts:
    /// numeric chat ids (including -100...) stay as-is, t.me links and bare
    /// usernames become "@username".
    pub fn normalize_channel(raw: &str) -> String {
        let trimmed = raw.trim();
        let trimmed = trimmed
            .strip_prefix("https://t.me/")
            .or_else(|| trimmed.strip_prefix("http://t.me/"))
            .or_else(|| trimmed.strip_prefix("t.me/"))
            .unwrap_or(trimmed);

        if trimmed.parse::<i64>().is_ok() {
            return trimmed.to_string();
        }
        if let Some(stripped) = trimmed.strip_prefix('@') {
            return format!("@{}", stripped);
        }
        format!("@{}", trimmed)
    }

    /// Primary channel whose membership is required
    /// Read from CHANNEL_USERNAME environment variable
    pub static CHANNEL_USERNAME: Lazy<String> = Lazy::new(|| {
        normalize_channel(&env::var("CHANNEL_USERNAME").unwrap_or_else(|_| "@largentmsk".to_string()))
    });

    /// Secondary channel whose membership is required
    /// Read from CHANNEL_USERNAME_2 environment variable
    /// Set to empty string to disable the second check
    pub static CHANNEL_USERNAME_2: Lazy<Option<String>> = Lazy::new(|| {
        match env::var("CHANNEL_USERNAME_2") {
            Ok(raw) if raw.trim().is_empty() => None,
            Ok(raw) => Some(normalize_channel(&raw)),
            Err(_) => Some("@idnrecords".to_string()),
        }
    });

    /// All configured channels, in check order.
    pub fn configured() -> Vec<String> {
        let mut list = vec![CHANNEL_USERNAME.clone()];
        if let Some(second) = CHANNEL_USERNAME_2.as_ref() {
            list.push(second.clone());
        }
        list
    }

    /// Public https://t.me/ link for a "@username" channel reference.
    /// Numeric ids have no public link; returns None for those.
    pub fn public_link(channel: &str) -> Option<String> {
        channel
            .strip_prefix('@')
            .map(|name| format!("https://t.me/{}", name))
    }

    #[cfg(test)]
    mod tests {
        use super::normalize_channel;

        #[test]
        fn strips_tme_prefix() {
            assert_eq!(normalize_channel("https://t.me/largentmsk"), "@largentmsk");
            assert_eq!(normalize_channel("t.me/idnrecords"), "@idnrecords");
        }

        #[test]
        fn keeps_numeric_ids() {
            assert_eq!(normalize_channel("-1001234567890"), "-1001234567890");
        }

        #[test]
        fn adds_at_prefix() {
            assert_eq!(normalize_channel("largentmsk"), "@largentmsk");
            assert_eq!(normalize_channel("@largentmsk"), "@largentmsk");
        }
    }
}

/// VK integration configuration
pub mod vk {
    use once_cell::sync::Lazy;
    use std::env;

    /// VK API access token; the whole integration is off when unset
    /// Read from VK_TOKEN environment variable
    pub static VK_TOKEN: Lazy<Option<String>> = Lazy::new(|| {
        env::var("VK_TOKEN")
            .ok()
            .and_then(|s| if s.trim().is_empty() { None } else { Some(s) })
    });

    /// VK group screen name (domain) used for membership checks and cross-posting
    /// Read from VK_GROUP_DOMAIN environment variable
    pub static VK_GROUP_DOMAIN: Lazy<String> =
        Lazy::new(|| env::var("VK_GROUP_DOMAIN").unwrap_or_else(|_| "largent.tusa".to_string()));

    /// VK API version sent with every request
    pub const API_VERSION: &str = "5.131";

    /// Default VK API base URL (overridable per-client in tests)
    pub const API_BASE: &str = "https://api.vk.com";

    /// Returns true when the VK integration is configured.
    pub fn enabled() -> bool {
        VK_TOKEN.is_some()
    }
}

/// Weekly schedule configuration
pub mod schedule {
    use once_cell::sync::Lazy;
    use std::env;

    fn env_u32(name: &str, default: u32) -> u32 {
        env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
    }

    /// Weekday of the weekly tick, 0=Mon..6=Sun
    /// Read from WEEKLY_DAY environment variable, default Friday
    pub static WEEKLY_DAY: Lazy<u32> = Lazy::new(|| env_u32("WEEKLY_DAY", 4) % 7);

    /// Local hour of the weekly tick
    /// Read from WEEKLY_HOUR environment variable
    pub static WEEKLY_HOUR: Lazy<u32> = Lazy::new(|| env_u32("WEEKLY_HOUR", 12) % 24);

    /// Minute of the weekly tick
    /// Read from WEEKLY_MINUTE environment variable
    pub static WEEKLY_MINUTE: Lazy<u32> = Lazy::new(|| env_u32("WEEKLY_MINUTE", 0) % 60);

    /// Fixed UTC offset of the reference timezone, in hours
    /// Read from TZ_OFFSET_HOURS environment variable, default UTC+3 (MSK)
    pub static TZ_OFFSET_HOURS: Lazy<i64> = Lazy::new(|| {
        env::var("TZ_OFFSET_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3)
    });

    /// Consecutive missed weeks after which re-engagement messages start
    pub const MISS_THRESHOLD: i64 = 2;

    /// Weekly hour converted to UTC.
    pub fn hour_utc() -> u32 {
        (*WEEKLY_HOUR as i64 - *TZ_OFFSET_HOURS).rem_euclid(24) as u32
    }
}

/// Broadcast fan-out configuration
pub mod broadcast {
    use once_cell::sync::Lazy;
    use std::env;

    /// Maximum number of concurrent sends during a broadcast
    /// Read from BROADCAST_CONCURRENCY environment variable
    /// Default: 8, safely under Telegram's bot-wide rate ceiling
    pub static MAX_CONCURRENT_SENDS: Lazy<usize> = Lazy::new(|| {
        env::var("BROADCAST_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(8)
    });
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Telegram and VK HTTP requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}
