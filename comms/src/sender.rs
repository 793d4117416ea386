//! The sending end of the frame protocol.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{LEN_TYPE_SIZE, LenType, MAX_FRAME_LEN, Serialize};

/// The sending half of a framed channel.
pub struct OnoSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    // length prefix plus the owned part of the body, reused across sends
    head: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> OnoSender<W> {
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            head: Vec::new(),
        }
    }

    /// Sends `msg` as a single frame.
    ///
    /// Borrowed payloads are written straight from the message, only the owned part of the body
    /// goes through the internal buffer.
    ///
    /// # Returns
    /// An io error if writing fails or the frame is larger than `MAX_FRAME_LEN`.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        let Self { tx, head } = self;

        head.clear();
        head.resize(LEN_TYPE_SIZE, 0);

        let tail = msg.serialize(head).unwrap_or_default();
        let len = head.len() - LEN_TYPE_SIZE + tail.len();
        if len > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame of {len} bytes exceeds the {MAX_FRAME_LEN} bytes limit"),
            ));
        }

        head[..LEN_TYPE_SIZE].copy_from_slice(&(len as LenType).to_be_bytes());
        tx.write_all(head).await?;
        if !tail.is_empty() {
            tx.write_all(tail).await?;
        }

        tx.flush().await
    }
}
