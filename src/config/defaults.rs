/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Source fetching defaults
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 25;
pub const DEFAULT_FETCH_MAX_RETRIES: u32 = 1;
pub const DEFAULT_FETCH_RETRY_BACKOFF_SECS: u64 = 1;

// Liveness probe defaults
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_PROBE_MAX_CONCURRENT: usize = 150;
pub const DEFAULT_PROBE_BATCH_SIZE: usize = 200;
pub const DEFAULT_PROBE_MAX_LATENCY_MS: u64 = 3400;
pub const DEFAULT_PROGRESS_LOG_EVERY_BATCHES: usize = 5;
pub const DEFAULT_ACCEPTED_STATUSES: &[&str] = &["200", "206", "301", "302", "303", "307", "308"];

// Filter defaults
pub const DEFAULT_FILTER_MAX_LATENCY_MS: u64 = 3400;
pub const DEFAULT_EXCELLENT_LATENCY_MS: u64 = 1500;
pub const DEFAULT_GOOD_LATENCY_MS: u64 = 2500;

// HTTP transport defaults
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 20;

// Output defaults
pub const DEFAULT_OUTPUT_PATH: &str = "playlist.m3u";
pub const DEFAULT_OUTPUT_TITLE: &str = "Optimized Playlist";

// Run defaults
pub const DEFAULT_OVERALL_BUDGET_SECS: u64 = 20 * 60;

// Classification defaults
pub const DEFAULT_BLOCKED_REGIONS: &[&str] = &[
    "bangladesh", "bd", "bangla",
    "belarus", "by",
    "costa rica", "cr",
    "india", "indian", "in",
    "mexico", "mx", "spanish",
    "lao", "laos", "la",
];

/// Ordered keyword -> country code table; the first keyword found wins
pub const DEFAULT_COUNTRIES: &[(&str, &str)] = &[
    ("usa", "USA"), ("us", "USA"), ("united states", "USA"),
    ("uk", "UK"), ("united kingdom", "UK"), ("britain", "UK"),
    ("canada", "CA"), ("canadian", "CA"),
    ("australia", "AU"), ("aussie", "AU"),
    ("france", "FR"), ("french", "FR"),
    ("germany", "DE"), ("german", "DE"),
    ("spain", "ES"), ("spanish", "ES"),
    ("italy", "IT"), ("italian", "IT"),
    ("netherlands", "NL"), ("dutch", "NL"),
    ("portugal", "PT"), ("portuguese", "PT"),
];

pub const DEFAULT_UHD_TOKENS: &[&str] = &["4k", "uhd", "2160", "2160p"];
pub const DEFAULT_FHD_TOKENS: &[&str] = &[
    "1080", "1080p", "1080i", "fhd", "full hd", "1920", "1920x1080",
];
pub const DEFAULT_LOW_QUALITY_TOKENS: &[&str] = &[
    "720", "720p", "hd", "480", "480p", "sd", "360", "360p", "240", "240p",
];
pub const DEFAULT_CODEC_TOKENS: &[&str] = &["hevc", "h265", "h.265", "x265"];
pub const DEFAULT_SERVICE_TOKENS: &[&str] = &[
    "hd", "fhd", "uhd", "4k", "1080p", "720p", "sd", "live", "tv", "channel",
];

pub const DEFAULT_TV_SOURCES: &[&str] = &[
    "https://raw.githubusercontent.com/dishiptv/dish/main/stream.m3u",
    "https://raw.githubusercontent.com/Free-TV/IPTV/master/playlist.m3u8",
    "https://raw.githubusercontent.com/LS-Station/streamecho/main/StreamEcho.m3u8",
    "https://iptv-org.github.io/iptv/index.m3u",
    "https://raw.githubusercontent.com/binhex/iptv/main/eng.m3u",
    "https://raw.githubusercontent.com/serdartas/iptv-playlist/main/refined.m3u",
    "https://raw.githubusercontent.com/ipstreet312/freeiptv/master/all.m3u",
    "https://raw.githubusercontent.com/sultanarabi161/filoox-bdix/main/playlist.m3u",
    "https://raw.githubusercontent.com/Miraz6755/Iptv.m3u/main/DaddyLive.m3u",
    "https://raw.githubusercontent.com/AAAAAEXQOSyIpN2JZ0ehUQ/iPTV-FREE-LIST/master/iPTV-Free-List_TV.m3u",
    "https://raw.githubusercontent.com/dp247/IPTV/master/playlists/playlist_usa.m3u8",
    "https://raw.githubusercontent.com/dp247/IPTV/master/playlists/playlist_uk.m3u8",
    "https://raw.githubusercontent.com/HabibSay/free_iptv_m3u8/refs/heads/main/all_channels.m3u",
];

pub const DEFAULT_MOVIE_SOURCES: &[&str] = &[
    "https://aymrgknetzpucldhpkwm.supabase.co/storage/v1/object/public/tmdb/top-movies.m3u",
    "https://aymrgknetzpucldhpkwm.supabase.co/storage/v1/object/public/tmdb/action-movies.m3u",
    "https://aymrgknetzpucldhpkwm.supabase.co/storage/v1/object/public/tmdb/comedy-movies.m3u",
    "https://aymrgknetzpucldhpkwm.supabase.co/storage/v1/object/public/tmdb/horror-movies.m3u",
];
