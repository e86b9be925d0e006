mod model;
mod repository;

pub use model::ExclusionRowDB;
pub use repository::ExclusionRepository;
