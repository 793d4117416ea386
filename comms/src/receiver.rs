//! The receiving end of the frame protocol.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Deserialize, LEN_TYPE_SIZE, LenType, MAX_FRAME_LEN};

/// The receiving half of a framed channel.
///
/// Frames are read into a buffer the receiver owns, a received message borrows it until the
/// next call to `recv`.
pub struct OnoReceiver<R: AsyncRead + Unpin> {
    rx: R,
    // whole words keep the body 4 bytes aligned, numeric payloads are viewed in place
    buf: Vec<u32>,
}

impl<R: AsyncRead + Unpin> OnoReceiver<R> {
    pub(super) fn new(rx: R) -> Self {
        Self {
            rx,
            buf: Vec::new(),
        }
    }

    /// Waits for the next frame and deserializes its body.
    ///
    /// # Returns
    /// The message or an io error if the stream ended, the frame is larger than
    /// `MAX_FRAME_LEN` or its body is malformed.
    pub async fn recv<'a, T: Deserialize<'a>>(&'a mut self) -> io::Result<T> {
        let mut len_buf = [0; LEN_TYPE_SIZE];
        self.rx.read_exact(&mut len_buf).await?;

        let len = LenType::from_be_bytes(len_buf);
        let len = usize::try_from(len)
            .ok()
            .filter(|&len| len <= MAX_FRAME_LEN)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("frame of {len} bytes exceeds the {MAX_FRAME_LEN} bytes limit"),
                )
            })?;

        self.buf.clear();
        self.buf.resize(len.div_ceil(size_of::<u32>()), 0);

        let body = &mut bytemuck::cast_slice_mut::<u32, u8>(&mut self.buf)[..len];
        self.rx.read_exact(body).await?;

        T::deserialize(body)
    }
}
