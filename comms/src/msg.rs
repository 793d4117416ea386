use std::{borrow::Cow, io};

use crate::{Deserialize, Serialize};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

const KIND_ERR: Header = 0;
const KIND_CONTROL: Header = 1;
const KIND_FLOATS: Header = 2;
const KIND_COUNTS: Header = 3;

/// The payload data for the `Data` variant of the `Msg` enum.
///
/// `Floats` borrows straight from the receive buffer, `Counts` is copied out
/// since the frame body is only guaranteed to be 4 bytes aligned.
#[derive(Debug)]
pub enum Payload<'a> {
    Floats(&'a mut [f32]),
    Counts(Cow<'a, [u64]>),
}

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// First message a process sends to the coordinator.
    Hello { process_index: usize },
    /// A process reached the named barrier.
    Barrier { name: String },
    /// Every process reached the named barrier.
    Release { name: String },
}

/// The application layer message for the process group.
#[derive(Debug)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload<'a>),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    /// Returns a short name of the variant, used when reporting protocol violations.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Control(Command::Hello { .. }) => "hello",
            Msg::Control(Command::Barrier { .. }) => "barrier",
            Msg::Control(Command::Release { .. }) => "release",
            Msg::Data(Payload::Floats(_)) => "floats",
            Msg::Data(Payload::Counts(_)) => "counts",
            Msg::Err(_) => "err",
        }
    }

    fn buf_is_too_small<T>(size: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {HEADER_SIZE} bytes"),
        ))
    }

    fn invalid_kind_byte<T>(kind: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind header {kind}"),
        ))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        match self {
            Msg::Err(e) => {
                buf.extend_from_slice(&KIND_ERR.to_be_bytes());
                Some(e.as_bytes())
            }
            Msg::Control(cmd) => {
                buf.extend_from_slice(&KIND_CONTROL.to_be_bytes());

                // SAFETY: Serialize impl for `Command` is derived and not implemented
                //         by hand. Nor has a non string-key map inside.
                serde_json::to_writer(buf, cmd).unwrap();
                None
            }
            Msg::Data(Payload::Floats(nums)) => {
                buf.extend_from_slice(&KIND_FLOATS.to_be_bytes());
                Some(bytemuck::cast_slice::<f32, u8>(nums))
            }
            Msg::Data(Payload::Counts(counts)) => {
                buf.extend_from_slice(&KIND_COUNTS.to_be_bytes());
                Some(bytemuck::cast_slice::<u64, u8>(counts))
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a mut [u8]) -> io::Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Self::buf_is_too_small(buf.len());
        }

        let (kind_buf, rest) = buf.split_at_mut(HEADER_SIZE);
        let mut kind = [0; HEADER_SIZE];
        kind.copy_from_slice(kind_buf);

        match Header::from_be_bytes(kind) {
            KIND_ERR => {
                let string = str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(string)))
            }
            KIND_CONTROL => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            KIND_FLOATS => {
                let nums = bytemuck::try_cast_slice_mut(rest).map_err(|err| {
                    io::Error::new(io::ErrorKind::InvalidData, format!("{err:?}"))
                })?;

                Ok(Self::Data(Payload::Floats(nums)))
            }
            KIND_COUNTS => {
                if rest.len() % size_of::<u64>() != 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("counts payload of {} bytes is not a multiple of 8", rest.len()),
                    ));
                }

                let counts = bytemuck::pod_collect_to_vec(rest);
                Ok(Self::Data(Payload::Counts(Cow::Owned(counts))))
            }
            kind => Self::invalid_kind_byte(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_body(msg: &Msg) -> Vec<u8> {
        let mut buf = Vec::new();
        let tail = msg.serialize(&mut buf);
        buf.extend_from_slice(tail.unwrap_or_default());
        buf
    }

    #[test]
    fn control_messages_survive_a_trip() {
        let msg = Msg::Control(Command::Barrier {
            name: "epoch_1_done".into(),
        });

        let mut body = frame_body(&msg);
        let Msg::Control(cmd) = Msg::deserialize(&mut body).unwrap() else {
            panic!("expected a control message");
        };

        assert_eq!(
            cmd,
            Command::Barrier {
                name: "epoch_1_done".into()
            }
        );
    }

    #[test]
    fn counts_are_copied_out_of_unaligned_bodies() {
        let msg = Msg::Data(Payload::Counts(Cow::Owned(vec![7, 1 << 40])));
        let mut body = frame_body(&msg);

        let Msg::Data(Payload::Counts(counts)) = Msg::deserialize(&mut body).unwrap() else {
            panic!("expected counts");
        };

        assert_eq!(&*counts, &[7, 1 << 40]);
    }

    #[test]
    fn unknown_kinds_are_rejected() {
        let mut body = 9u32.to_be_bytes().to_vec();
        assert!(Msg::deserialize(&mut body).is_err());
    }

    #[test]
    fn short_bodies_are_rejected() {
        let mut body = vec![0, 1];
        assert!(Msg::deserialize(&mut body).is_err());
    }
}
