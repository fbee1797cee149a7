//! 具体渠道实现

pub mod webhook;

pub use webhook::{WebhookChannel, WebhookChannelConfig};
