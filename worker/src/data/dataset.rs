use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use log::info;

use super::{DataErr, IMAGE_SIZE, NUM_CLASSES, idx};

/// Which half of the dataset to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

/// The raw examples of a split: flattened `u8` images and their digit labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitData {
    images: Vec<u8>,
    labels: Vec<u8>,
}

impl SplitData {
    /// Creates a new `SplitData`.
    ///
    /// # Returns
    /// An error if the amount of images and labels differ or a label isn't a digit.
    pub fn new(images: Vec<u8>, labels: Vec<u8>) -> Result<Self, DataErr> {
        if images.len() % IMAGE_SIZE != 0 || images.len() / IMAGE_SIZE != labels.len() {
            return Err(DataErr::CountMismatch {
                images: images.len() / IMAGE_SIZE,
                labels: labels.len(),
            });
        }

        if let Some(&label) = labels.iter().find(|&&l| l as usize >= NUM_CLASSES) {
            return Err(DataErr::LabelOutOfRange(label));
        }

        Ok(Self { images, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns the pixels of the `i`-th image (panics if out of bounds).
    #[inline]
    pub fn image(&self, i: usize) -> &[u8] {
        &self.images[i * IMAGE_SIZE..(i + 1) * IMAGE_SIZE]
    }

    /// Returns the label of the `i`-th image (panics if out of bounds).
    #[inline]
    pub fn label(&self, i: usize) -> u8 {
        self.labels[i]
    }
}

/// Both splits of MNIST, loaded once and shared by every provider built from them.
#[derive(Debug, Clone)]
pub struct DataSource {
    train: Arc<SplitData>,
    test: Arc<SplitData>,
}

const TRAIN_FILES: [&str; 2] = ["train-images-idx3-ubyte", "train-labels-idx1-ubyte"];
const TEST_FILES: [&str; 2] = ["t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte"];

/// Resolves `name` inside `dir`, also accepting the `train-images.idx3-ubyte` spelling.
fn locate(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    if path.exists() {
        return path;
    }

    match name.rfind("-idx") {
        Some(i) => {
            let dotted = format!("{}.{}", &name[..i], &name[i + 1..]);
            let alt = dir.join(dotted);
            if alt.exists() { alt } else { path }
        }
        None => path,
    }
}

impl DataSource {
    /// Creates a `DataSource` from splits already in memory.
    pub fn from_splits(train: SplitData, test: SplitData) -> Self {
        Self {
            train: Arc::new(train),
            test: Arc::new(test),
        }
    }

    /// Reads the four MNIST IDX files from `dir`.
    ///
    /// # Returns
    /// The loaded splits or an error if a file is missing or malformed.
    pub fn from_mnist_dir(dir: &Path) -> Result<Self, DataErr> {
        let read_split = |[images, labels]: [&str; 2]| -> Result<SplitData, DataErr> {
            let images = idx::read_images(&locate(dir, images))?;
            let labels = idx::read_labels(&locate(dir, labels))?;
            SplitData::new(images, labels)
        };

        let train = read_split(TRAIN_FILES)?;
        let test = read_split(TEST_FILES)?;
        info!(
            "loaded {} training and {} test examples from {}",
            train.len(),
            test.len(),
            dir.display()
        );

        Ok(Self::from_splits(train, test))
    }

    /// Returns the examples of `split`.
    pub fn split(&self, split: Split) -> Arc<SplitData> {
        match split {
            Split::Train => Arc::clone(&self.train),
            Split::Test => Arc::clone(&self.test),
        }
    }

    /// Returns the amount of examples of `split`.
    pub fn len(&self, split: Split) -> usize {
        match split {
            Split::Train => self.train.len(),
            Split::Test => self.test.len(),
        }
    }
}
