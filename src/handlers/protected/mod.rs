// Endpoints behind `require_identity`. Every handler receives the caller's
// `Identity` and only ever touches rows owned by it.

pub mod category;
pub mod product;
pub mod profile;
