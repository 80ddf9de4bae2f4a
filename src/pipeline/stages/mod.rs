//! Pipeline stage implementations
//!
//! Stages run in this order after probing: filtering reduces the channel
//! arena, generation renders the survivors and publish writes the document.

pub mod filtering;
pub mod generation;
pub mod publish_content;

pub use filtering::{FilteringStage, StageCount};
pub use generation::PlaylistRenderer;
pub use publish_content::PublishContentStage;
