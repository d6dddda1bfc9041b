//! Runtime environment detection

/// Whether this browser suspends audio that isn't backed by a DOM element
///
/// True for Safari (desktop and iOS WebKit). Chrome, Chromium-based
/// browsers, Chrome on iOS and Android webviews all report "Safari" in
/// their user agent too and are excluded.
pub fn suspends_detached_audio(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    if !ua.contains("safari") {
        return false;
    }
    !["chrome", "chromium", "crios", "android"]
        .iter()
        .any(|marker| ua.contains(marker))
}
