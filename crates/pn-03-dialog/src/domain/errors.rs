use shared_types::Identity;
use thiserror::Error;

use super::channel::ChannelKey;

/// Errors from dialog establishment and dialog requests.
///
/// The type is `Clone` because rejections travel back to the consumer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DialogError {
    /// The peer is not on the service's allow-list.
    #[error("identity {0} is not allowed")]
    IdentityNotAllowed(Identity),

    /// Another waiter already listens on the channel.
    #[error("channel {0} already has a listener")]
    ChannelBusy(ChannelKey),

    /// Nobody listens on the channel.
    #[error("no listener on channel {0}")]
    NoListener(ChannelKey),

    /// The waiter is already serving.
    #[error("dialog waiter on {0} is already serving")]
    AlreadyServing(ChannelKey),

    /// The other side went away.
    #[error("dialog transport closed")]
    TransportClosed,

    /// The provider failed to process a request.
    #[error("request failed: {0}")]
    RequestFailed(String),
}
