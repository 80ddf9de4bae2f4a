pub mod classifier;
pub mod stream_prober;

pub use classifier::ChannelClassifier;
pub use stream_prober::LivenessProber;
