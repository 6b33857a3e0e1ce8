//! Offline training: dataset loading, stratified splitting and the trainer
//! that ties them to the pipeline and its artifact.
pub mod dataset;
pub mod split;
pub mod trainer;

pub use dataset::{
    clean, load_dataset, load_table, Cell, ColumnMapping, LabeledDataset, LabeledExample, Table,
};
pub use split::{stratified_split, Split};
pub use trainer::{Evaluated, Trainer, TrainingReport};
