//! Length prefixed framing over async streams.
//!
//! Every frame is a big-endian `u64` body length followed by the body. What goes in the body is
//! up to the `Serialize`/`Deserialize` implementations, `msg` holds the messages processes
//! exchange.

mod deserialize;
pub mod msg;
mod receiver;
mod sender;
mod serialize;

use tokio::io::{AsyncRead, AsyncWrite};

pub use deserialize::Deserialize;
pub use receiver::OnoReceiver;
pub use sender::OnoSender;
pub use serialize::Serialize;

type LenType = u64;
const LEN_TYPE_SIZE: usize = size_of::<LenType>();

/// Largest frame body either end accepts.
pub const MAX_FRAME_LEN: usize = 1 << 30;

/// Wraps a reader and a writer into both ends of a framed channel.
///
/// # Arguments
/// * `rx` - An async readable.
/// * `tx` - An async writable.
///
/// # Returns
/// The receiving and sending halves.
pub fn channel<R, W>(rx: R, tx: W) -> (OnoReceiver<R>, OnoSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (OnoReceiver::new(rx), OnoSender::new(tx))
}
