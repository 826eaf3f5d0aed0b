//! Best-effort operating system detection from a `User-Agent` string

use regex::Regex;
use std::sync::OnceLock;

static PLATFORMS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();

// Order matters: phone agents also mention the desktop kernel they derive from.
const PLATFORM_PATTERNS: &[(&str, &str)] = &[
    (r"Windows Phone(?: OS)? ?([\d.]+)?", "Windows Phone"),
    (r"Windows NT (\d+\.\d+)", "Windows NT"),
    (r"Android ?([\d.]+)?", "Android"),
    (r"(?:iPhone|iPad|iPod).*? OS ([\d_]+)", "iOS"),
    (r"Mac OS X ?([\d_.]+)?", "Mac OS X"),
    (r"CrOS", "ChromeOS"),
    (r"Ubuntu", "Ubuntu"),
    (r"FreeBSD", "FreeBSD"),
    (r"Linux", "Linux"),
];

fn windows_name(version: &str) -> String {
    let name = match version {
        "10.0" => "Windows 10",
        "6.3" => "Windows 8.1",
        "6.2" => "Windows 8",
        "6.1" => "Windows 7",
        "6.0" => "Windows Vista",
        "5.2" => "Windows Server 2003",
        "5.1" => "Windows XP",
        other => return format!("Windows NT {}", other),
    };
    name.to_string()
}

/// Detect the operating system named by a user agent
///
/// Returns `None` when no known platform token is present.
pub fn detect_os(user_agent: &str) -> Option<String> {
    let platforms = PLATFORMS.get_or_init(|| {
        PLATFORM_PATTERNS
            .iter()
            .filter_map(|(pattern, name)| Regex::new(pattern).ok().map(|re| (re, *name)))
            .collect()
    });

    platforms.iter().find_map(|(regex, name)| {
        regex.captures(user_agent).map(|caps| {
            let version = caps.get(1).map(|v| v.as_str().replace('_', "."));
            match (*name, version) {
                ("Windows NT", Some(version)) => windows_name(&version),
                (name, Some(version)) => format!("{} {}", name, version),
                (name, None) => name.to_string(),
            }
        })
    })
}
