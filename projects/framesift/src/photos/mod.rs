// Color / black & white photo classification and sorting

pub mod batch;
pub mod classifier;

pub use batch::{classify_one, sort_batch, ImageInput, SortedBatch, Verdict};
pub use classifier::ColorClassifier;
