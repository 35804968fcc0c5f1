const DICEBEAR_URL: &str = "https://api.dicebear.com/9.x";

/// Robot-style avatar used for agents in chat.
pub fn bot_avatar_url(seed: &str) -> String {
    format!(
        "{DICEBEAR_URL}/bottts-neutral/svg?seed={}",
        urlencoding::encode(seed)
    )
}
