pub mod dog;
pub mod gaussian;
pub mod octave;

pub use dog::{Dog, DogSpace};
pub use octave::{Octave, ScaleSpace};
