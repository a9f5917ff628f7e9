mod activation;
mod linear;
mod sequential;

pub use activation::{Activation, ActivationKind};
pub use linear::Linear;
pub use sequential::Sequential;
