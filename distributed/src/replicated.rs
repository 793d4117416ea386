/// A value held once per local device.
///
/// Replicas are created from a single value and only ever replaced as a whole, so as long as
/// every device applies the same update they stay identical.
#[derive(Clone, Debug, PartialEq)]
pub struct Replicated<T> {
    replicas: Vec<T>,
}

impl<T: Clone> Replicated<T> {
    /// Copies `value` into `devices` replicas.
    pub fn new(value: T, devices: usize) -> Self {
        let mut replicas = Vec::with_capacity(devices);
        if devices > 0 {
            replicas.resize(devices - 1, value.clone());
            replicas.push(value);
        }

        Self { replicas }
    }
}

impl<T> Replicated<T> {
    /// Wraps already replicated values, ordered by device.
    pub fn from_replicas(replicas: Vec<T>) -> Self {
        Self { replicas }
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.replicas.iter()
    }

    /// Returns the replica of the first device.
    pub fn first(&self) -> Option<&T> {
        self.replicas.first()
    }

    /// Returns the replicas, ordered by device.
    pub fn into_inner(self) -> Vec<T> {
        self.replicas
    }

    /// Keeps the replica of the first device only.
    pub fn unreplicate(self) -> Option<T> {
        self.replicas.into_iter().next()
    }
}
