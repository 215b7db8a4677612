// Endpoints reachable without credentials: signup and token acquisition

pub mod user;
