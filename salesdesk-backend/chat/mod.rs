pub mod client;
pub mod conversation;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// One-click questions offered next to the chat input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestedPrompt {
    KeyTrends,
    Improve,
    Concerns,
}

impl SuggestedPrompt {
    pub const ALL: [SuggestedPrompt; 3] = [
        SuggestedPrompt::KeyTrends,
        SuggestedPrompt::Improve,
        SuggestedPrompt::Concerns,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            SuggestedPrompt::KeyTrends => "key-trends",
            SuggestedPrompt::Improve => "improve",
            SuggestedPrompt::Concerns => "concerns",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SuggestedPrompt::KeyTrends => "What are the key trends?",
            SuggestedPrompt::Improve => "How to improve?",
            SuggestedPrompt::Concerns => "Any concerns?",
        }
    }

    pub fn question(self) -> &'static str {
        match self {
            SuggestedPrompt::KeyTrends => "What are the key trends in this sales data?",
            SuggestedPrompt::Improve => {
                "What specific actions can we take to improve our sales performance?"
            }
            SuggestedPrompt::Concerns => {
                "Are there any concerning patterns or red flags in this data?"
            }
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.slug() == slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let turn = ConversationTurn {
            role: Role::Assistant,
            content: "hi".into(),
        };
        assert_eq!(
            serde_json::to_value(&turn).unwrap(),
            serde_json::json!({ "role": "assistant", "content": "hi" })
        );
    }

    #[test]
    fn test_suggested_prompt_slugs_round_trip() {
        for prompt in SuggestedPrompt::ALL {
            assert_eq!(SuggestedPrompt::from_slug(prompt.slug()), Some(prompt));
        }
        assert_eq!(SuggestedPrompt::from_slug("weather"), None);
    }
}
