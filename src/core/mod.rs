// Domain-layer modules and shared errors/models
pub mod classifier {
    pub use crate::classifier::*;
}

pub mod star_rating {
    pub use crate::star_rating::*;
}

pub mod aggregator {
    pub use crate::aggregator::*;
}

pub mod resolver {
    pub use crate::resolver::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
