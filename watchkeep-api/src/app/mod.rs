mod error;
mod handlers;
mod middleware;
mod params;
mod rate_limit;
mod router;
mod state;
mod views;

#[cfg(test)]
mod tests;

pub use error::ApiError;
pub use rate_limit::RateLimiter;
pub use router::app_router;
pub use state::AppState;
