//! The chat flows the app offers. The server pairs each one with its system
//! instruction; the browser uses the rest to bootstrap the conversation.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatFlow {
    pub slug: &'static str,
    pub name: &'static str,
    /// Sent as the first user turn so the model opens the session.
    pub greeting: &'static str,
}

impl ChatFlow {
    pub fn endpoint(&self) -> String {
        format!("/api/{}", self.slug)
    }
}

pub const VISION_NAVI: ChatFlow = ChatFlow {
    slug: "vision-navi",
    name: "無限ビジョンナビ",
    greeting: "こんにちは。初めまして。ビジョンナビゲーションを始めましょう。",
};

pub const LIMIT_DETECTOR: ChatFlow = ChatFlow {
    slug: "limit-detector",
    name: "リミットディテクター",
    greeting: "こんにちは。リミットディテクターのセッションを始めましょう。",
};

pub static CHAT_FLOWS: [ChatFlow; 2] = [VISION_NAVI, LIMIT_DETECTOR];

pub fn by_slug(slug: &str) -> Option<&'static ChatFlow> {
    CHAT_FLOWS.iter().find(|flow| flow.slug == slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_per_flow() {
        assert_eq!(VISION_NAVI.endpoint(), "/api/vision-navi");
        assert_eq!(by_slug("limit-detector"), Some(&LIMIT_DETECTOR));
        assert_eq!(by_slug("nope"), None);
    }
}
