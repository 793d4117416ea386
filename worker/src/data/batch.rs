use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::{DataErr, IMAGE_SIZE, SplitData};

/// A preprocessed batch: images scaled to `[0, 1]` and flattened, labels as class ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    images: Array2<f32>,
    labels: Array1<u32>,
}

impl Batch {
    /// Gathers and preprocesses the examples of `split` at `indices`, in that order.
    pub fn gather(split: &SplitData, indices: &[usize]) -> Self {
        let mut images = Array2::zeros((indices.len(), IMAGE_SIZE));
        for (mut row, &i) in images.axis_iter_mut(Axis(0)).zip(indices) {
            row.iter_mut()
                .zip(split.image(i))
                .for_each(|(x, &px)| *x = px as f32 / 255.);
        }

        let labels = indices.iter().map(|&i| split.label(i) as u32).collect();
        Self { images, labels }
    }

    /// Creates a `Batch` from already preprocessed arrays.
    ///
    /// # Panics
    /// If `images` and `labels` hold a different amount of examples.
    pub fn new(images: Array2<f32>, labels: Array1<u32>) -> Self {
        assert_eq!(images.nrows(), labels.len(), "one label per image");
        Self { images, labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn images(&self) -> ArrayView2<'_, f32> {
        self.images.view()
    }

    pub fn labels(&self) -> ArrayView1<'_, u32> {
        self.labels.view()
    }

    /// Splits the batch into `devices` contiguous shards of equal size, one per local device.
    ///
    /// # Returns
    /// The shards ordered by device, or an error if the batch doesn't split evenly.
    pub fn shard(&self, devices: usize) -> Result<Vec<Batch>, DataErr> {
        if devices == 0 || self.len() % devices != 0 {
            return Err(DataErr::Indivisible {
                batch_size: self.len(),
                devices,
            });
        }

        let per_device = self.len() / devices;
        if per_device == 0 {
            return Ok(vec![self.clone(); devices]);
        }

        let shards = self
            .images
            .axis_chunks_iter(Axis(0), per_device)
            .zip(self.labels.axis_chunks_iter(Axis(0), per_device))
            .map(|(images, labels)| Batch {
                images: images.to_owned(),
                labels: labels.to_owned(),
            })
            .collect();

        Ok(shards)
    }
}
