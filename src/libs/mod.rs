pub mod dataset;
pub mod entity;
pub mod error;
pub mod io;
pub mod linking;
pub mod scoring;
pub mod strain;

pub use dataset::Dataset;
pub use entity::{Bgc, Entity, EntityKind, Gcf, MolecularFamily, Spectrum};
pub use error::LinkError;
pub use io::DatasetLoader;
pub use strain::{Strain, StrainCollection};
