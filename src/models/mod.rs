pub mod enums;
pub mod filters;
mod clinical;
mod facility;
mod meeting;
mod patient;
mod staff;

pub use clinical::*;
pub use facility::*;
pub use filters::*;
pub use meeting::*;
pub use patient::*;
pub use staff::*;
