mod distillations;
mod handlers;
mod metrics;
mod queue;
mod routes;

pub use routes::create_router;
