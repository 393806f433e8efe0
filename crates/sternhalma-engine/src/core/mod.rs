pub use self::{board::*, coord::*, layout::*, moves::*};

pub(crate) mod board;
pub(crate) mod coord;
pub(crate) mod layout;
pub(crate) mod moves;
