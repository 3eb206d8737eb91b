pub mod club;
pub mod comment;
pub mod membership;
pub mod pagination;
pub mod post;
pub mod user;

pub use club::*;
pub use comment::*;
pub use membership::*;
pub use pagination::*;
pub use post::*;
pub use user::*;
