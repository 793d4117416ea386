use std::{borrow::Cow, io, net, time::Duration};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
};
use log::{debug, info, warn};
use tokio::{
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    runtime::{Builder, Runtime},
    time,
};

use super::ProcessGroup;
use crate::{DistErr, Result};

const CONNECT_ATTEMPTS: usize = 100;
const CONNECT_BACKOFF: Duration = Duration::from_millis(100);

/// One end of a connection between the coordinator and another process.
struct Link {
    rx: OnoReceiver<OwnedReadHalf>,
    tx: OnoSender<OwnedWriteHalf>,
}

impl Link {
    fn new(stream: TcpStream) -> Self {
        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);

        Self { rx, tx }
    }

    async fn send(&mut self, msg: &Msg<'_>) -> io::Result<()> {
        self.tx.send(msg).await
    }

    /// Receives the next message, turning errors reported by the peer into `DistErr::Remote`.
    async fn recv(&mut self) -> Result<Msg<'_>> {
        match self.rx.recv().await? {
            Msg::Err(e) => Err(DistErr::Remote(e.into_owned())),
            msg => Ok(msg),
        }
    }

    async fn recv_floats_into(&mut self, out: &mut [f32], accumulate: bool) -> Result<()> {
        match self.recv().await? {
            Msg::Data(Payload::Floats(nums)) => {
                check_len(nums.len(), out.len())?;
                if accumulate {
                    out.iter_mut().zip(nums.iter()).for_each(|(o, &x)| *o += x);
                } else {
                    out.copy_from_slice(nums);
                }
                Ok(())
            }
            other => Err(DistErr::UnexpectedMessage {
                expected: "floats",
                got: other.kind(),
            }),
        }
    }

    async fn recv_counts_into(&mut self, out: &mut [u64], accumulate: bool) -> Result<()> {
        match self.recv().await? {
            Msg::Data(Payload::Counts(counts)) => {
                check_len(counts.len(), out.len())?;
                if accumulate {
                    out.iter_mut().zip(counts.iter()).for_each(|(o, &x)| *o += x);
                } else {
                    out.copy_from_slice(&counts);
                }
                Ok(())
            }
            other => Err(DistErr::UnexpectedMessage {
                expected: "counts",
                got: other.kind(),
            }),
        }
    }

    async fn recv_command(&mut self) -> Result<Command> {
        match self.recv().await? {
            Msg::Control(cmd) => Ok(cmd),
            other => Err(DistErr::UnexpectedMessage {
                expected: "control",
                got: other.kind(),
            }),
        }
    }
}

fn check_len(got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(DistErr::LengthMismatch { got, expected });
    }

    Ok(())
}

enum Role {
    /// Process 0, connected to every other process ordered by index.
    Coordinator { peers: Vec<Link> },
    Follower { coordinator: Link },
}

/// A group of processes talking over TCP in a star around process 0.
///
/// Process 0 accepts a connection from every other process. Reductions are gathered and summed
/// there in process order, then sent back. Barriers work the same way with control messages.
pub struct TcpGroup {
    runtime: Runtime,
    index: usize,
    count: usize,
    role: Role,
}

impl TcpGroup {
    /// Creates the coordinator end of the group, waiting for every other process to join.
    ///
    /// # Arguments
    /// * `listener` - A listener bound to the coordinator address.
    /// * `count` - The amount of processes in the job, including this one.
    ///
    /// # Returns
    /// The connected group or an error if a process failed to join.
    pub fn coordinator(listener: net::TcpListener, count: usize) -> Result<Self> {
        let runtime = runtime()?;
        listener.set_nonblocking(true)?;

        let peers = runtime.block_on(async {
            let listener = TcpListener::from_std(listener)?;
            let mut joined: Vec<Option<Link>> = (1..count).map(|_| None).collect();

            for _ in 1..count {
                let (stream, addr) = listener.accept().await?;
                stream.set_nodelay(true)?;
                let mut link = Link::new(stream);

                let index = match link.recv_command().await? {
                    Command::Hello { process_index } => process_index,
                    _ => {
                        return Err(DistErr::UnexpectedMessage {
                            expected: "hello",
                            got: "control",
                        });
                    }
                };

                let slot = index
                    .checked_sub(1)
                    .and_then(|i| joined.get_mut(i))
                    .filter(|slot| slot.is_none())
                    .ok_or_else(|| {
                        DistErr::InvalidTopology(format!(
                            "process {index} from {addr} can't join a group of {count}"
                        ))
                    })?;

                info!("process {index} joined from {addr}");
                *slot = Some(link);
            }

            Ok::<_, DistErr>(joined.into_iter().flatten().collect())
        })?;

        Ok(Self {
            runtime,
            index: 0,
            count,
            role: Role::Coordinator { peers },
        })
    }

    /// Creates a follower end of the group, connecting to the coordinator.
    ///
    /// Connecting is retried for a while, the coordinator may not be listening yet.
    ///
    /// # Arguments
    /// * `addr` - The coordinator address.
    /// * `index` - The index of this process, in `1..count`.
    /// * `count` - The amount of processes in the job.
    pub fn follower(addr: &str, index: usize, count: usize) -> Result<Self> {
        if index == 0 || index >= count {
            return Err(DistErr::InvalidTopology(format!(
                "process {index} can't follow in a group of {count}"
            )));
        }

        let runtime = runtime()?;

        let coordinator = runtime.block_on(async {
            let mut attempt = 0;
            let stream = loop {
                match TcpStream::connect(addr).await {
                    Ok(stream) => break stream,
                    Err(e) if attempt + 1 < CONNECT_ATTEMPTS => {
                        debug!(attempt = attempt; "coordinator at {addr} not reachable yet: {e}");
                        attempt += 1;
                        time::sleep(CONNECT_BACKOFF).await;
                    }
                    Err(e) => return Err(DistErr::Io(e)),
                }
            };

            stream.set_nodelay(true)?;
            let mut link = Link::new(stream);
            link.send(&Msg::Control(Command::Hello {
                process_index: index,
            }))
            .await?;

            info!("connected to coordinator at {addr}");
            Ok::<_, DistErr>(link)
        })?;

        Ok(Self {
            runtime,
            index,
            count,
            role: Role::Follower { coordinator },
        })
    }
}

fn runtime() -> Result<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

/// Tells every peer about `err` before giving up on it.
async fn broadcast_err(peers: &mut [Link], err: DistErr) -> DistErr {
    let text = err.to_string();
    for peer in peers {
        if let Err(e) = peer.send(&Msg::Err(Cow::Borrowed(&text))).await {
            warn!("failed to report an error to a peer: {e}");
        }
    }

    err
}

impl Role {
    async fn all_reduce_sum(&mut self, buf: &mut [f32]) -> Result<()> {
        match self {
            Role::Coordinator { peers } => {
                for i in 0..peers.len() {
                    let res = peers[i].recv_floats_into(buf, true).await;
                    if let Err(e) = res {
                        return Err(broadcast_err(peers, e).await);
                    }
                }

                for peer in peers.iter_mut() {
                    peer.send(&Msg::Data(Payload::Floats(&mut *buf))).await?;
                }
            }
            Role::Follower { coordinator } => {
                coordinator
                    .send(&Msg::Data(Payload::Floats(&mut *buf)))
                    .await?;
                coordinator.recv_floats_into(buf, false).await?;
            }
        }

        Ok(())
    }

    async fn all_reduce_sum_counts(&mut self, buf: &mut [u64]) -> Result<()> {
        match self {
            Role::Coordinator { peers } => {
                for i in 0..peers.len() {
                    let res = peers[i].recv_counts_into(buf, true).await;
                    if let Err(e) = res {
                        return Err(broadcast_err(peers, e).await);
                    }
                }

                for peer in peers.iter_mut() {
                    peer.send(&Msg::Data(Payload::Counts(Cow::Borrowed(&*buf))))
                        .await?;
                }
            }
            Role::Follower { coordinator } => {
                coordinator
                    .send(&Msg::Data(Payload::Counts(Cow::Borrowed(&*buf))))
                    .await?;
                coordinator.recv_counts_into(buf, false).await?;
            }
        }

        Ok(())
    }

    async fn barrier(&mut self, name: &str) -> Result<()> {
        match self {
            Role::Coordinator { peers } => {
                for i in 0..peers.len() {
                    let res = match peers[i].recv_command().await {
                        Ok(Command::Barrier { name: got }) if got == name => Ok(()),
                        Ok(Command::Barrier { name: got }) => Err(DistErr::BarrierMismatch {
                            expected: name.to_string(),
                            got,
                        }),
                        Ok(_) => Err(DistErr::UnexpectedMessage {
                            expected: "barrier",
                            got: "control",
                        }),
                        Err(e) => Err(e),
                    };

                    if let Err(e) = res {
                        return Err(broadcast_err(peers, e).await);
                    }
                }

                let release = Msg::Control(Command::Release { name: name.into() });
                for peer in peers.iter_mut() {
                    peer.send(&release).await?;
                }
            }
            Role::Follower { coordinator } => {
                let barrier = Msg::Control(Command::Barrier { name: name.into() });
                coordinator.send(&barrier).await?;

                match coordinator.recv_command().await? {
                    Command::Release { name: got } if got == name => {}
                    Command::Release { name: got } => {
                        return Err(DistErr::BarrierMismatch {
                            expected: name.to_string(),
                            got,
                        });
                    }
                    _ => {
                        return Err(DistErr::UnexpectedMessage {
                            expected: "release",
                            got: "control",
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

impl ProcessGroup for TcpGroup {
    fn process_index(&self) -> usize {
        self.index
    }

    fn process_count(&self) -> usize {
        self.count
    }

    fn all_reduce_sum(&mut self, buf: &mut [f32]) -> Result<()> {
        self.runtime.block_on(self.role.all_reduce_sum(buf))
    }

    fn all_reduce_sum_counts(&mut self, buf: &mut [u64]) -> Result<()> {
        self.runtime.block_on(self.role.all_reduce_sum_counts(buf))
    }

    fn barrier(&mut self, name: &str) -> Result<()> {
        self.runtime.block_on(self.role.barrier(name))?;
        debug!(name = name; "barrier released");
        Ok(())
    }
}
