mod candidate;
mod image;
mod result;
mod transcript;

pub use candidate::*;
pub use self::image::*;
pub use result::*;
pub use transcript::*;
