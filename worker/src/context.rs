use distributed::{DeviceMesh, ProcessGroup};

/// Everything a run needs to know about where it executes: the local devices and the other
/// processes of the job.
pub struct Context<M> {
    pub mesh: M,
    pub group: Box<dyn ProcessGroup>,
}

impl<M: DeviceMesh> Context<M> {
    pub fn new(mesh: M, group: Box<dyn ProcessGroup>) -> Self {
        Self { mesh, group }
    }

    pub fn local_device_count(&self) -> usize {
        self.mesh.local_device_count()
    }

    pub fn process_index(&self) -> usize {
        self.group.process_index()
    }

    pub fn process_count(&self) -> usize {
        self.group.process_count()
    }

    pub fn global_device_count(&self) -> usize {
        self.local_device_count() * self.process_count()
    }

    /// Whether this process reports progress.
    pub fn is_leader(&self) -> bool {
        self.group.is_leader()
    }
}
