mod color;
mod error;
mod ink;
mod press;
mod recipe;

pub use color::*;
pub use error::ColorError;
pub use ink::*;
pub use press::*;
pub use recipe::*;
