//! Conversation UI components for the chat panel

pub mod composer;
pub mod history;
pub mod manager;
pub mod notice;

pub use composer::{ComposerResult, ConversationComposer};
pub use history::ConversationHistory;
pub use manager::{ConversationAction, ConversationManager};
pub use notice::Notices;
