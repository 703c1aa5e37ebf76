//! The bot's command grammar.

use slipbot_core::entitlement::PaidTier;

/// What an inbound message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    AcceptRules,
    QueryFreeTips,
    QueryPaidTips,
    QueryPremiumTips,
    Menu,
    Subscribe(PaidTier),
    /// Free text for the answer provider.
    Fallback,
}

impl Intent {
    /// Classify raw message text. Matching is on the normalised form.
    pub fn classify(text: &str) -> Self {
        let msg = normalize(text);
        match msg.as_str() {
            "" => Self::Menu,
            "accept" => Self::AcceptRules,
            "todays safe tips" | "todays free tips" => Self::QueryFreeTips,
            "todays paid tips" | "todays normal tips" => Self::QueryPaidTips,
            "todays premium tips" => Self::QueryPremiumTips,
            "menu" | "help" | "start" | "hi" | "hello" => Self::Menu,
            // Anything mentioning "subscribe" that does not name Normal is a
            // Premium request.
            m if m.contains("subscribe") => {
                if m.contains("normal") {
                    Self::Subscribe(PaidTier::Normal)
                } else {
                    Self::Subscribe(PaidTier::Premium)
                }
            }
            _ => Self::Fallback,
        }
    }
}

/// Trim, lowercase, drop apostrophes, and collapse inner whitespace.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .replace(['\'', '\u{2019}'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Today's   SAFE tips \n"), "todays safe tips");
        assert_eq!(normalize("Today\u{2019}s paid tips"), "todays paid tips");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_tip_queries() {
        assert_eq!(Intent::classify("todays safe tips"), Intent::QueryFreeTips);
        assert_eq!(Intent::classify("Today's free tips"), Intent::QueryFreeTips);
        assert_eq!(Intent::classify("TODAYS PAID TIPS"), Intent::QueryPaidTips);
        assert_eq!(Intent::classify("todays normal tips"), Intent::QueryPaidTips);
        assert_eq!(Intent::classify("todays premium tips"), Intent::QueryPremiumTips);
    }

    #[test]
    fn test_tip_queries_are_exact() {
        assert_eq!(Intent::classify("send todays paid tips"), Intent::Fallback);
    }

    #[test]
    fn test_accept_and_menu() {
        assert_eq!(Intent::classify(" Accept "), Intent::AcceptRules);
        assert_eq!(Intent::classify("accept the rules"), Intent::Fallback);
        for m in ["menu", "Help", "start", "hi", "Hello", ""] {
            assert_eq!(Intent::classify(m), Intent::Menu, "{m:?}");
        }
    }

    #[test]
    fn test_subscribe() {
        assert_eq!(
            Intent::classify("subscribe normal"),
            Intent::Subscribe(PaidTier::Normal)
        );
        assert_eq!(
            Intent::classify("I want to SUBSCRIBE to normal please"),
            Intent::Subscribe(PaidTier::Normal)
        );
        assert_eq!(
            Intent::classify("subscribe premium"),
            Intent::Subscribe(PaidTier::Premium)
        );
        // Unspecified tier falls to Premium.
        assert_eq!(
            Intent::classify("subscribe"),
            Intent::Subscribe(PaidTier::Premium)
        );
        assert_eq!(
            Intent::classify("unsubscribe me"),
            Intent::Subscribe(PaidTier::Premium)
        );
    }

    #[test]
    fn test_fallback() {
        assert_eq!(Intent::classify("who wins arsenal vs chelsea?"), Intent::Fallback);
    }
}
