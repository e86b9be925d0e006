mod model;
mod repository;

pub use model::CooldownRowDB;
pub use repository::CooldownRepository;
